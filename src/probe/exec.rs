use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

const HASH_BANG_MAX: usize = 512;

/// The interpreter named on a `#!` first line, with its optional argument.
pub fn hash_bang(path: &Path) -> Option<(PathBuf, Option<String>)> {
    let mut head = Vec::with_capacity(HASH_BANG_MAX);
    File::open(path)
        .ok()?
        .take(HASH_BANG_MAX as u64)
        .read_to_end(&mut head)
        .ok()?;
    parse_hash_bang(&head)
}

pub fn parse_hash_bang(head: &[u8]) -> Option<(PathBuf, Option<String>)> {
    let rest = head.strip_prefix(b"#!")?;
    let line = rest.split(|b| *b == b'\n').next()?;
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    let (interpreter, argument) = match line.split_once([' ', '\t']) {
        Some((interpreter, argument)) => (interpreter, Some(argument.trim().to_owned())),
        None => (line, None),
    };
    if interpreter.is_empty() {
        return None;
    }
    Some((PathBuf::from(interpreter), argument.filter(|a| !a.is_empty())))
}

/// What file(1) makes of `path`, e.g. "ELF 32-bit LSB executable".
pub fn describe_file(path: &Path) -> Option<String> {
    let output = Command::new("file")
        .arg("-b")
        .arg("--")
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        tracing::debug!(status = %output.status, "file(1) failed");
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpreter_lines() {
        assert_eq!(
            parse_hash_bang(b"#!/bin/sh\necho hi\n"),
            Some((PathBuf::from("/bin/sh"), None))
        );
        assert_eq!(
            parse_hash_bang(b"#! /usr/bin/env python3\n"),
            Some((PathBuf::from("/usr/bin/env"), Some("python3".to_owned())))
        );
        assert_eq!(parse_hash_bang(b"\x7fELF"), None);
        assert_eq!(parse_hash_bang(b"#!\n"), None);
    }

    #[test]
    fn script_on_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("run");
        std::fs::write(&script, "#!/no/such/interpreter -x\n").unwrap();
        let (interpreter, argument) = hash_bang(&script).unwrap();
        assert_eq!(interpreter, PathBuf::from("/no/such/interpreter"));
        assert_eq!(argument.as_deref(), Some("-x"));
    }
}
