use super::{common, generic::explain_generic};
use crate::{
    probe::{fildes, medium, mount},
    string_buffer::StringBuffer,
};
use nix::{fcntl::OFlag, libc};
use std::os::fd::RawFd;

/// How the call meant to use the descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Any,
    Read,
    Write,
}

/// Explains `errnum` for a call made on the open descriptor `fd`.
pub fn explain_fildes(
    sb: &mut StringBuffer,
    errnum: i32,
    syscall_name: &str,
    fd: RawFd,
    caption: &str,
    access: Access,
) {
    match errnum {
        libc::EBADF => explain_ebadf(sb, fd, caption, access),
        libc::EINTR => common::eintr(sb, syscall_name),
        libc::EIO => common::eio(sb),
        libc::EAGAIN => common::ewouldblock(sb, syscall_name),
        libc::ENOSPC => match fildes::fstat(fd) {
            Some(st) => common::enospc_dev(sb, st.st_dev),
            None => common::enospc(sb, None),
        },
        libc::EFBIG => common::efbig(sb),
        libc::EISDIR => common::eisdir(sb, caption),
        libc::EROFS => {
            sb.printf(format_args!(
                "{caption} refers to a file on a read-only file system"
            ));
            if let Some(st) = fildes::fstat(fd) {
                mount::write_mount_point_dev(sb, st.st_dev);
            }
        }
        libc::EINVAL => explain_einval(sb, fd, caption, access),
        libc::ENOMEDIUM => medium::explain_enomedium_fildes(sb, fd),
        _ => explain_generic(sb, errnum, syscall_name),
    }
}

/// EBADF: either nothing is open at `fd`, or it is open the wrong way.
pub fn explain_ebadf(sb: &mut StringBuffer, fd: RawFd, caption: &str, access: Access) {
    let Some(flags) = fildes::open_flags(fd) else {
        sb.printf(format_args!(
            "{caption} does not refer to an open file descriptor"
        ));
        if fd < 0 {
            sb.puts(", file descriptors are never negative");
        } else if let Some(max) = fildes::open_max() {
            if fd as u64 >= max {
                sb.printf(format_args!(
                    ", file descriptors are always less than RLIMIT_NOFILE ({max})"
                ));
            }
        }
        return;
    };
    let mode = flags.bits() & libc::O_ACCMODE;
    match access {
        Access::Read if mode == libc::O_WRONLY => sb.printf(format_args!(
            "{caption} refers to a file descriptor that is not open for reading, it was opened write only"
        )),
        Access::Write if mode == libc::O_RDONLY => sb.printf(format_args!(
            "{caption} refers to a file descriptor that is not open for writing, it was opened read only"
        )),
        _ if flags.contains(OFlag::O_PATH) => sb.printf(format_args!(
            "{caption} was opened with O_PATH, it can only be used to refer to a location in the file system"
        )),
        _ => sb.printf(format_args!(
            "{caption} does not refer to a file descriptor suitable for this operation"
        )),
    }
}

fn explain_einval(sb: &mut StringBuffer, fd: RawFd, caption: &str, access: Access) {
    let unsuitable = match access {
        Access::Read => "reading",
        Access::Write => "writing",
        Access::Any => "this operation",
    };
    sb.printf(format_args!(
        "{caption} is attached to an object which is unsuitable for {unsuitable}"
    ));
    if let Some(st) = fildes::fstat(fd) {
        sb.puts(", it is a ");
        crate::probe::device::write_file_type(sb, &st);
    }
}

/// ENOTSOCK, naming what the descriptor is instead.
pub fn explain_enotsock(sb: &mut StringBuffer, fd: RawFd, caption: &str) {
    match fildes::fstat(fd) {
        Some(st) => {
            sb.printf(format_args!("{caption} refers to a "));
            crate::probe::device::write_file_type(sb, &st);
            sb.puts(", not to a socket");
        }
        None => explain_ebadf(sb, fd, caption, Access::Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs::File, os::fd::AsRawFd};
    use tempfile::TempDir;

    fn fildes_text(errnum: i32, fd: RawFd, access: Access) -> String {
        let mut sb = StringBuffer::default();
        explain_fildes(&mut sb, errnum, "read", fd, "fildes", access);
        sb.into_string()
    }

    #[test]
    fn closed_descriptor() {
        let text = fildes_text(libc::EBADF, 987_654, Access::Any);
        assert!(text.starts_with("fildes does not refer to an open file descriptor"), "{text}");
        assert!(fildes_text(libc::EBADF, -1, Access::Read).ends_with("file descriptors are never negative"));
    }

    #[test]
    fn read_only_descriptor_written_to() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, "x").unwrap();
        let file = File::open(&path).unwrap();
        let text = fildes_text(libc::EBADF, file.as_raw_fd(), Access::Write);
        assert!(text.contains("not open for writing"), "{text}");
    }

    #[test]
    fn regular_file_is_not_a_socket() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        std::fs::write(&path, "").unwrap();
        let file = File::open(&path).unwrap();
        let mut sb = StringBuffer::default();
        explain_enotsock(&mut sb, file.as_raw_fd(), "fildes");
        assert_eq!(sb.as_str(), "fildes refers to a regular file, not to a socket");
    }
}
