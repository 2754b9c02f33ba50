//! Bounded text buffer that every explanation is written into.
//!
//! A [`StringBuffer`] never grows past the maximum given at construction,
//! anything beyond it is dropped silently (always on a char boundary).
//! Supplementary remarks go into a chained footnotes buffer, each one
//! introduced by `"; "`, and are appended after the main text when the
//! explanation is assembled.

use std::fmt::{self, Write};

/// Size used by the allocating convenience helpers.
pub const MESSAGE_MAX: usize = 4096;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringBuffer {
    text: String,
    maximum: usize,
    footnotes: Option<Box<StringBuffer>>,
}

impl Default for StringBuffer {
    fn default() -> Self {
        StringBuffer::new(MESSAGE_MAX)
    }
}

impl StringBuffer {
    pub fn new(maximum: usize) -> Self {
        StringBuffer {
            text: String::with_capacity(maximum.min(MESSAGE_MAX)),
            maximum,
            footnotes: None,
        }
    }

    pub fn position(&self) -> usize {
        self.text.len()
    }

    pub fn maximum(&self) -> usize {
        self.maximum
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.text.len() >= self.maximum
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn puts(&mut self, text: &str) {
        let room = self.maximum.saturating_sub(self.text.len());
        if text.len() <= room {
            self.text.push_str(text);
            return;
        }
        let mut end = room;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        self.text.push_str(&text[..end]);
    }

    pub fn putc(&mut self, c: char) {
        let mut encoded = [0u8; 4];
        self.puts(c.encode_utf8(&mut encoded));
    }

    pub fn printf(&mut self, args: fmt::Arguments<'_>) {
        // write_str below never fails
        let _ = self.write_fmt(args);
    }

    /// Appends `text` as a C string literal, double quotes included.
    pub fn puts_quoted(&mut self, text: &str) {
        self.putc('"');
        for c in text.chars() {
            self.put_escaped(c, '"');
        }
        self.putc('"');
    }

    /// Like [`puts_quoted`](Self::puts_quoted), but looks at no more than
    /// `n` characters of `text`.
    pub fn puts_quoted_n(&mut self, text: &str, n: usize) {
        self.putc('"');
        for c in text.chars().take(n) {
            self.put_escaped(c, '"');
        }
        self.putc('"');
    }

    /// Appends `c` as a C character literal.
    pub fn putc_quoted(&mut self, c: char) {
        self.putc('\'');
        self.put_escaped(c, '\'');
        self.putc('\'');
    }

    fn put_escaped(&mut self, c: char, delimiter: char) {
        match c {
            '\\' => self.puts("\\\\"),
            '\n' => self.puts("\\n"),
            '\t' => self.puts("\\t"),
            '\r' => self.puts("\\r"),
            '\x07' => self.puts("\\a"),
            '\x08' => self.puts("\\b"),
            '\x0b' => self.puts("\\v"),
            '\x0c' => self.puts("\\f"),
            c if c == delimiter => {
                self.putc('\\');
                self.putc(c);
            }
            c if c.is_control() => self.printf(format_args!("\\{:03o}", c as u32)),
            c => self.putc(c),
        }
    }

    /// Appends `text` quoted so that a POSIX shell reads it back as one word.
    pub fn puts_shell_quoted(&mut self, text: &str) {
        if text.is_empty() {
            self.puts("''");
            return;
        }
        if text.chars().all(is_shell_safe) {
            self.puts(text);
            return;
        }
        if !text.contains('\'') {
            self.putc('\'');
            self.puts(text);
            self.putc('\'');
            return;
        }
        self.putc('"');
        for c in text.chars() {
            if matches!(c, '"' | '\\' | '`' | '$') {
                self.putc('\\');
            }
            self.putc(c);
        }
        self.putc('"');
    }

    /// Appends a path component, inserting a single `/` separator if needed.
    pub fn path_join(&mut self, component: &str) {
        let component = if self.text.is_empty() {
            component
        } else {
            if !self.text.ends_with('/') {
                self.putc('/');
            }
            component.trim_start_matches('/')
        };
        self.puts(component);
    }

    pub fn truncate(&mut self, position: usize) {
        if position >= self.text.len() {
            return;
        }
        let mut end = position;
        while !self.text.is_char_boundary(end) {
            end -= 1;
        }
        self.text.truncate(end);
    }

    pub fn rewind(&mut self) {
        self.text.clear();
        self.footnotes = None;
    }

    /// Appends the text of `other`, and its footnotes to ours.
    pub fn copy_from(&mut self, other: &StringBuffer) {
        self.puts(other.as_str());
        if let Some(notes) = other.footnotes() {
            let maximum = self.maximum;
            self.footnotes
                .get_or_insert_with(|| Box::new(StringBuffer::new(maximum)))
                .puts(notes);
        }
    }

    /// Starts a new footnote and returns the buffer to write it into.
    pub fn footnote(&mut self) -> &mut StringBuffer {
        let maximum = self.maximum;
        let footnotes = self
            .footnotes
            .get_or_insert_with(|| Box::new(StringBuffer::new(maximum)));
        footnotes.puts("; ");
        footnotes
    }

    pub fn footnotes(&self) -> Option<&str> {
        self.footnotes.as_deref().map(StringBuffer::as_str)
    }

    pub fn take_footnotes(&mut self) -> Option<StringBuffer> {
        self.footnotes.take().map(|footnotes| *footnotes)
    }
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '@' | '+' | '=' | ',' | '%' | '^')
}

impl Write for StringBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.puts(s);
        Ok(())
    }
}

impl fmt::Display for StringBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_silently_at_maximum() {
        let mut sb = StringBuffer::new(8);
        sb.puts("hello");
        sb.puts(", world");
        assert_eq!(sb.as_str(), "hello, w");
        assert!(sb.is_full());
        sb.putc('x');
        write!(sb, "{}", 12345).unwrap();
        assert_eq!(sb.position(), 8);
    }

    #[test]
    fn position_never_exceeds_maximum() {
        for maximum in 0..24 {
            let mut sb = StringBuffer::new(maximum);
            sb.puts("abc");
            sb.puts_quoted("quote\"d\n");
            sb.printf(format_args!("{:>10}", 7));
            sb.puts_shell_quoted("it's");
            sb.path_join("dir");
            assert!(sb.position() <= sb.maximum(), "maximum {maximum}");
        }
    }

    #[test]
    fn truncation_keeps_utf8_intact() {
        let mut sb = StringBuffer::new(4);
        sb.puts("aé€");
        assert_eq!(sb.as_str(), "aé");
        sb.truncate(2);
        assert_eq!(sb.as_str(), "a");
    }

    #[test]
    fn quoting_escapes_like_c() {
        let mut sb = StringBuffer::default();
        sb.puts_quoted("a\"b\\c\n\x01");
        assert_eq!(sb.as_str(), r#""a\"b\\c\n\001""#);
        sb.rewind();
        sb.putc_quoted('\'');
        assert_eq!(sb.as_str(), r"'\''");
        sb.rewind();
        sb.puts_quoted_n("abcdef", 3);
        assert_eq!(sb.as_str(), "\"abc\"");
    }

    #[test]
    fn shell_quoting() {
        let cases = [
            ("plain-word", "plain-word"),
            ("", "''"),
            ("two words", "'two words'"),
            ("it's $HOME", "\"it's \\$HOME\""),
        ];
        for (input, expected) in cases {
            let mut sb = StringBuffer::default();
            sb.puts_shell_quoted(input);
            assert_eq!(sb.as_str(), expected);
        }
    }

    #[test]
    fn path_join_inserts_one_slash() {
        let mut sb = StringBuffer::default();
        sb.path_join("/");
        sb.path_join("usr");
        sb.path_join("/bin");
        assert_eq!(sb.as_str(), "/usr/bin");
    }

    #[test]
    fn footnotes_are_chained_with_separator() {
        let mut sb = StringBuffer::new(64);
        sb.puts("main");
        sb.footnote().puts("first");
        write!(sb.footnote(), "second {}", 2).unwrap();
        assert_eq!(sb.as_str(), "main");
        assert_eq!(sb.footnotes(), Some("; first; second 2"));
        let footnotes = sb.take_footnotes().unwrap();
        assert_eq!(footnotes.maximum(), 64);
        assert!(sb.footnotes().is_none());
    }
}
