use crate::{
    colors::{CALL_COLOR, ERRNO_COLOR, FOOTNOTE_COLOR, GENERAL_TEXT_COLOR},
    options::options,
};
use colored::Colorize;
use std::{
    env,
    io::{self, BufWriter, Write},
};

const DEFAULT_WIDTH: usize = 75;

/// `COLUMNS`, else the width of the terminal on stderr, else 75.
pub fn terminal_width() -> usize {
    if let Some(columns) = env::var("COLUMNS").ok().and_then(|text| text.trim().parse::<usize>().ok()) {
        if columns > 0 {
            return columns;
        }
    }
    match rustix::termios::tcgetwinsize(io::stderr()) {
        Ok(size) if size.ws_col > 0 => usize::from(size.ws_col),
        _ => DEFAULT_WIDTH,
    }
}

/// Splits `text` into lines no wider than `width` (a single long word
/// overflows), continuation lines starting with `indent` spaces. Each word
/// comes with its byte offset into `text`.
fn layout(text: &str, width: usize, indent: usize) -> Vec<Vec<(usize, &str)>> {
    let width = width.max(indent + 1);
    let mut lines = Vec::new();
    let mut line: Vec<(usize, &str)> = Vec::new();
    let mut used = 0;
    for (offset, word) in words(text) {
        let room = if lines.is_empty() { width } else { width - indent };
        let needed = word.chars().count() + usize::from(!line.is_empty());
        if !line.is_empty() && used + needed > room {
            lines.push(std::mem::take(&mut line));
            used = 0;
        }
        used += word.chars().count() + usize::from(!line.is_empty());
        line.push((offset, word));
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split(' ')
        .scan(0, |offset, word| {
            let start = *offset;
            *offset += word.len() + 1;
            Some((start, word))
        })
        .filter(|(_, word)| !word.is_empty())
}

/// `text` wrapped to `width` columns.
pub fn wrap(text: &str, width: usize, indent: usize) -> Vec<String> {
    layout(text, width, indent)
        .into_iter()
        .enumerate()
        .map(|(index, line)| {
            let mut out = if index > 0 { " ".repeat(indent) } else { String::new() };
            let words: Vec<&str> = line.into_iter().map(|(_, word)| word).collect();
            out.push_str(&words.join(" "));
            out
        })
        .collect()
}

/// Writes `text` wrapped to the terminal width, with the hanging indent.
pub fn wrap_and_print(out: &mut dyn Write, text: &str) -> io::Result<()> {
    print_plain(out, text, terminal_width())
}

pub fn print_plain(out: &mut dyn Write, text: &str, width: usize) -> io::Result<()> {
    for line in wrap(text, width, options().hanging_indent(width)) {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Part {
    Call,
    Errno,
    Diagnosis,
    Footnotes,
}

/// Where each part of an assembled message starts.
struct Parts {
    errno: usize,
    diagnosis: usize,
    footnotes: usize,
}

impl Parts {
    fn of(text: &str) -> Parts {
        let errno = text.find(" failed, ").map_or(text.len(), |at| at + 1);
        let diagnosis = text[errno..].find(" because ").map_or(text.len(), |at| errno + at + 1);
        let footnotes = text[diagnosis..].find("; ").map_or(text.len(), |at| diagnosis + at + 1);
        Parts { errno, diagnosis, footnotes }
    }

    fn part(&self, offset: usize) -> Part {
        if offset < self.errno {
            Part::Call
        } else if offset < self.diagnosis {
            Part::Errno
        } else if offset < self.footnotes {
            Part::Diagnosis
        } else {
            Part::Footnotes
        }
    }
}

/// Like [`wrap_and_print`], colouring the parts of an assembled message.
pub fn print_colored(out: &mut dyn Write, text: &str, width: usize) -> io::Result<()> {
    let indent = options().hanging_indent(width);
    let parts = Parts::of(text);
    for (index, line) in layout(text, width, indent).into_iter().enumerate() {
        if index > 0 {
            write!(out, "{}", " ".repeat(indent))?;
        }
        for (position, (offset, word)) in line.into_iter().enumerate() {
            if position > 0 {
                write!(out, " ")?;
            }
            let colored = match parts.part(offset) {
                Part::Call => word.custom_color(*CALL_COLOR),
                Part::Errno => word.custom_color(*ERRNO_COLOR),
                Part::Diagnosis => word.custom_color(*GENERAL_TEXT_COLOR),
                Part::Footnotes => word.custom_color(*FOOTNOTE_COLOR),
            };
            write!(out, "{colored}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Prints a failure report on stderr.
pub fn report(text: &str) {
    let stderr = io::stderr();
    let mut writer = BufWriter::new(stderr.lock());
    // nowhere left to report a failure to write stderr
    let _ = wrap_and_print(&mut writer, text).and_then(|()| writer.flush());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_at_spaces_with_hanging_indent() {
        let lines = wrap("aaa bbb ccc ddd eee", 8, 2);
        assert_eq!(lines, vec!["aaa bbb", "  ccc", "  ddd", "  eee"]);
    }

    #[test]
    fn long_words_overflow_rather_than_split() {
        let lines = wrap("short averyveryverylongword end", 10, 0);
        assert_eq!(lines, vec!["short", "averyveryverylongword", "end"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap("", 40, 0), vec![String::new()]);
    }

    #[test]
    fn message_parts() {
        let text = "close(fildes = 9) failed, Bad file descriptor (9, EBADF) because fildes is bad; note";
        let parts = Parts::of(text);
        assert_eq!(parts.part(0), Part::Call);
        assert_eq!(parts.part(text.find("failed").unwrap()), Part::Errno);
        assert_eq!(parts.part(text.find("fildes is").unwrap()), Part::Diagnosis);
        assert_eq!(parts.part(text.find("note").unwrap()), Part::Footnotes);
    }
}
