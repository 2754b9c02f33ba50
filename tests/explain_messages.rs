use explain::{
    calls::process::explain_execvp_search,
    explain_errno, explain_errno_into,
    string_buffer::StringBuffer,
    Call,
};
use nix::{libc, unistd::geteuid};
use std::{fs, os::unix::fs::PermissionsExt, path::Path};
use tempfile::TempDir;

#[test]
fn missing_directory_is_named() {
    let call = Call::Open { pathname: Path::new("no-such-dir/some-file"), flags: libc::O_RDONLY, mode: 0 };
    let message = explain_errno(&call, libc::ENOENT);
    assert!(
        message.starts_with("open(pathname = \"no-such-dir/some-file\", flags = O_RDONLY) failed, "),
        "{message}"
    );
    assert!(message.contains("(2, ENOENT) because "), "{message}");
    assert!(message.contains("\"no-such-dir\""), "{message}");
}

#[test]
fn closing_a_negative_descriptor() {
    let message = explain_errno(&Call::Close { fildes: -1 }, libc::EBADF);
    assert_eq!(
        message,
        "close(fildes = -1) failed, Bad file descriptor (9, EBADF) because fildes does not refer to an \
         open file descriptor, file descriptors are never negative"
    );
}

#[test]
fn directory_already_exists() {
    let dir = TempDir::new().unwrap();
    let existing = dir.path().join("existing");
    fs::create_dir(&existing).unwrap();
    let call = Call::Mkdir { pathname: &existing, mode: 0o755 };
    let message = explain_errno(&call, libc::EEXIST);
    assert!(message.contains("there is already a directory \"existing\""), "{message}");
}

#[test]
fn unreadable_file() {
    if geteuid().is_root() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let secret = dir.path().join("secret");
    fs::write(&secret, "x").unwrap();
    // owner may not read, everybody else may
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o044)).unwrap();
    let call = Call::Open { pathname: &secret, flags: libc::O_RDONLY, mode: 0 };
    let message = explain_errno(&call, libc::EACCES);
    assert!(message.contains("does not have read permission to the \"secret\" regular file"), "{message}");
}

#[test]
fn renaming_across_a_missing_directory() {
    let dir = TempDir::new().unwrap();
    let from = dir.path().join("from");
    fs::write(&from, "x").unwrap();
    let to = dir.path().join("absent").join("to");
    let call = Call::Rename { oldpath: &from, newpath: &to };
    let message = explain_errno(&call, libc::ENOENT);
    assert!(message.contains("newpath"), "{message}");
    assert!(message.contains("\"absent\""), "{message}");
}

#[test]
fn caller_sized_buffer_is_never_overrun() {
    let call = Call::Open { pathname: Path::new("no-such-dir/some-file"), flags: libc::O_RDONLY, mode: 0 };
    for maximum in [0, 10, 50, 100, 200] {
        let mut out = StringBuffer::new(maximum);
        explain_errno_into(&mut out, &call, libc::ENOENT);
        assert!(out.position() <= maximum, "{maximum}: {}", out.as_str());
    }
}

#[test]
fn command_search_listing() {
    let mut sb = StringBuffer::default();
    explain_execvp_search(&mut sb, libc::ENOENT, "no-such-command-here", &[], ".:/bin:/usr/bin");
    let text = sb.into_string();
    assert!(text.contains("(\".\", \"/bin\", \"/usr/bin\")"), "{text}");
}

#[test]
fn signals_and_processes() {
    let call = Call::Kill { pid: 999_999_999, sig: libc::SIGKILL };
    let message = explain_errno(&call, libc::ESRCH);
    assert!(message.starts_with("kill(pid = 999999999, sig = SIGKILL) failed"), "{message}");
    assert!(message.ends_with("the pid argument does not refer to an existing process"), "{message}");
}
