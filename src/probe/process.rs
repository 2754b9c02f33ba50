use super::absorb;
use crate::platform::platform;
use procfs::process::{all_processes, FDTarget, Process};
use std::{
    env,
    path::{Path, PathBuf},
};

pub fn process_name(pid: i32) -> Option<String> {
    let process = Process::new(pid).ok()?;
    process.stat().ok().map(|stat| stat.comm)
}

pub fn exists(pid: i32) -> bool {
    pid > 0 && Process::new(pid).is_ok()
}

pub fn parent_of(pid: i32) -> Option<i32> {
    Process::new(pid).ok()?.stat().ok().map(|stat| stat.ppid)
}

/// Real, effective and saved uids.
pub fn uids(pid: i32) -> Option<(u32, u32, u32)> {
    let status = Process::new(pid).ok()?.status().ok()?;
    Some((status.ruid, status.euid, status.suid))
}

/// Processes other than this one that have `path` open, or are running it.
pub fn processes_using(path: &Path) -> Vec<(i32, String)> {
    if !platform().has_proc {
        return Vec::new();
    }
    let Ok(path) = path.canonicalize() else {
        return Vec::new();
    };
    let me = std::process::id() as i32;
    let Some(processes) = absorb("all processes", all_processes()) else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for process in processes.flatten() {
        if process.pid() == me {
            continue;
        }
        let running = process.exe().is_ok_and(|exe| exe == path);
        let open = running
            || process.fd().is_ok_and(|fds| {
                fds.flatten()
                    .any(|info| matches!(&info.target, FDTarget::Path(target) if *target == path))
            });
        if open {
            let name = process.stat().map(|stat| stat.comm).unwrap_or_default();
            found.push((process.pid(), name));
        }
    }
    found
}

/// The process holding the socket with this inode, other than us.
pub fn socket_owner(inode: u64) -> Option<(i32, String)> {
    if !platform().has_proc {
        return None;
    }
    let me = std::process::id() as i32;
    let processes = absorb("all processes", all_processes())?;
    processes.flatten().filter(|process| process.pid() != me).find_map(|process| {
        let holds = process.fd().is_ok_and(|fds| {
            fds.flatten()
                .any(|info| matches!(info.target, FDTarget::Socket(held) if held == inode))
        });
        holds.then(|| {
            let name = process.stat().map(|stat| stat.comm).unwrap_or_default();
            (process.pid(), name)
        })
    })
}

/// How many processes belong to `uid`, for RLIMIT_NPROC narration.
pub fn user_process_count(uid: u32) -> Option<usize> {
    if !platform().has_proc {
        return None;
    }
    let processes = absorb("all processes", all_processes())?;
    Some(
        processes
            .flatten()
            .filter(|process| process.uid().is_ok_and(|owner| owner == uid))
            .count(),
    )
}

/// Our own virtual memory size, in bytes.
pub fn virtual_size() -> Option<u64> {
    if !platform().has_proc {
        return None;
    }
    let stat = absorb("self stat", Process::myself().and_then(|me| me.stat()))?;
    Some(stat.vsize)
}

/// The working directory relative paths are resolved against.
pub fn current_directory() -> Option<PathBuf> {
    absorb("getcwd", env::current_dir())
}

/// Whether a relative path could be misread, because the parent (usually the
/// shell the user typed it into) sits in another directory, or its
/// directory cannot be told.
pub fn current_directory_confusing() -> bool {
    let Some(ours) = current_directory() else {
        return true;
    };
    let theirs = Process::new(nix::unistd::getppid().as_raw()).and_then(|parent| parent.cwd());
    theirs.map_or(true, |theirs| theirs != ours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn this_process_is_visible() {
        let me = std::process::id() as i32;
        assert!(exists(me));
        assert!(process_name(me).is_some());
        assert_eq!(parent_of(me), Some(nix::unistd::getppid().as_raw()));
        let (_, euid, _) = uids(me).unwrap();
        assert_eq!(euid, nix::unistd::geteuid().as_raw());
    }

    #[test]
    fn no_process_zero() {
        assert!(!exists(0));
        assert!(!exists(-5));
    }

    #[test]
    fn unused_file_has_no_users() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("lonely");
        std::fs::write(&path, b"x").unwrap();
        assert!(processes_using(&path).is_empty());
    }

    #[test]
    fn own_processes_are_counted() {
        let count = user_process_count(nix::unistd::getuid().as_raw()).unwrap();
        assert!(count >= 1);
    }
}
