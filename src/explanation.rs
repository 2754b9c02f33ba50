use crate::{
    errno_info,
    string_buffer::{StringBuffer, MESSAGE_MAX},
};

/// Whether an explainer found a specific cause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    Explained,
    Undetermined,
}

#[derive(Debug)]
pub struct Explanation {
    pub errnum: i32,
    pub system_call: StringBuffer,
    pub explanation: StringBuffer,
}

impl Explanation {
    pub fn new(errnum: i32) -> Self {
        Explanation::with_maximum(errnum, MESSAGE_MAX)
    }

    pub fn with_maximum(errnum: i32, maximum: usize) -> Self {
        Explanation {
            errnum,
            system_call: StringBuffer::new(maximum),
            explanation: StringBuffer::new(maximum),
        }
    }

    /// Writes the whole message into `out`, shortening the diagnosis so the
    /// footnotes still fit.
    pub fn assemble(mut self, out: &mut StringBuffer) {
        out.puts(self.system_call.as_str());
        if self.errnum == 0 {
            out.puts(": success");
            return;
        }
        out.puts(" failed, ");
        errno_info::write_strerror(out, self.errnum);

        let footnotes = self.explanation.take_footnotes();
        if self.explanation.is_empty() {
            return;
        }
        let footnotes = footnotes.map(StringBuffer::into_string).unwrap_or_default();
        let room = out
            .maximum()
            .saturating_sub(out.position() + " because ".len() + footnotes.len());
        self.explanation.truncate(room);
        out.puts(" because ");
        out.puts(self.explanation.as_str());
        out.puts(&footnotes);
    }

    pub fn into_message(self) -> String {
        let mut out = StringBuffer::new(self.system_call.maximum());
        self.assemble(&mut out);
        out.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::libc;

    fn explanation(errnum: i32, call: &str, diagnosis: &str) -> Explanation {
        let mut ex = Explanation::new(errnum);
        ex.system_call.puts(call);
        ex.explanation.puts(diagnosis);
        ex
    }

    #[test]
    fn success() {
        assert_eq!(explanation(0, "close(fildes = 3)", "").into_message(), "close(fildes = 3): success");
    }

    #[test]
    fn failure_with_diagnosis_and_footnote() {
        let mut ex = explanation(libc::EBADF, "close(fildes = 42)", "the fildes argument does not refer to an open file");
        ex.explanation.footnote().puts("extra");
        let message = ex.into_message();
        assert!(message.starts_with("close(fildes = 42) failed, Bad file descriptor (9, EBADF) because the fildes"));
        assert!(message.ends_with("; extra"));
    }

    #[test]
    fn empty_diagnosis_stops_after_strerror() {
        let message = explanation(libc::EIO, "read()", "").into_message();
        assert!(message.ends_with("(5, EIO)"), "{message}");
    }

    #[test]
    fn long_diagnosis_leaves_room_for_footnotes() {
        let mut ex = Explanation::with_maximum(libc::ENOENT, 120);
        ex.system_call.puts("stat()");
        ex.explanation.puts(&"x".repeat(500));
        ex.explanation.footnote().puts("tail");
        let message = ex.into_message();
        assert!(message.len() <= 120);
        assert!(message.ends_with("; tail"), "{message}");
    }
}
