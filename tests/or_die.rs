use explain::wrappers::{close_or_die, open_or_die};
use nix::{
    libc,
    sys::wait::{waitpid, WaitStatus},
    unistd::{dup2, fork, pipe, ForkResult},
};
use std::{
    fs::File,
    io::Read,
    os::fd::AsRawFd,
    path::Path,
};

/// Runs `body` in a forked child with its stderr going into a pipe, and
/// returns the exit status and whatever the child wrote to stderr.
fn in_child(body: fn()) -> (i32, String) {
    let (reader, writer) = pipe().unwrap();
    match unsafe { fork() }.unwrap() {
        ForkResult::Child => {
            drop(reader);
            dup2(writer.as_raw_fd(), libc::STDERR_FILENO).unwrap();
            drop(writer);
            body();
            unsafe { libc::_exit(0) }
        }
        ForkResult::Parent { child } => {
            drop(writer);
            let mut stderr = String::new();
            File::from(reader).read_to_string(&mut stderr).unwrap();
            let status = match waitpid(child, None).unwrap() {
                WaitStatus::Exited(_, code) => code,
                other => panic!("child did not exit: {other:?}"),
            };
            (status, stderr.split_whitespace().collect::<Vec<_>>().join(" "))
        }
    }
}

// one test, so that the fork happens while no other test thread runs
#[test]
fn or_die_reports_and_exits_only_on_failure() {
    let (status, stderr) = in_child(|| close_or_die(-1));
    assert_eq!(status, 1);
    assert!(stderr.contains("close(fildes = -1) failed, Bad file descriptor"), "{stderr}");
    assert!(stderr.contains("file descriptors are never negative"), "{stderr}");

    let (status, stderr) = in_child(|| {
        let fd = open_or_die(Path::new("/dev/null"), libc::O_RDONLY, 0);
        close_or_die(fd);
    });
    assert_eq!(status, 0);
    assert_eq!(stderr, "");

    let (status, stderr) = in_child(|| {
        open_or_die(Path::new("/nonexistent-dir/file"), libc::O_RDONLY, 0);
    });
    assert_eq!(status, 1);
    assert!(stderr.contains("\"nonexistent-dir\""), "{stderr}");
}
