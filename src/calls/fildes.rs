use super::{Args, Call};
use crate::{
    capability::Capability,
    causes::{
        common,
        fildes::{explain_ebadf, explain_fildes, Access},
    },
    flags,
    identity::Identity,
    permission::{explain_search_permission, have_inode_permission, have_search_permission},
    probe::{device::write_file_type, fildes},
    render,
    string_buffer::StringBuffer,
    types::FileType,
};
use nix::{
    fcntl::OFlag,
    libc,
    sys::signal::{SigSet, Signal},
    unistd::{getpgrp, lseek, Whence},
};
use std::{
    io::IsTerminal,
    os::fd::{BorrowedFd, RawFd},
};

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match *call {
        Call::Read { fildes, data, data_size } | Call::Write { fildes, data, data_size } => {
            render::fildes(args.arg("fildes"), fildes);
            render::pointer(args.arg("data"), data);
            args.arg("data_size").printf(format_args!("{data_size}"));
        }
        Call::Close { fildes }
        | Call::Dup { fildes }
        | Call::Fstat { fildes }
        | Call::Fsync { fildes }
        | Call::Fchdir { fildes } => render::fildes(args.arg("fildes"), fildes),
        Call::Dup2 { oldfd, newfd } => {
            render::fildes(args.arg("oldfd"), oldfd);
            render::fildes(args.arg("newfd"), newfd);
        }
        Call::Lseek { fildes, offset, whence } => {
            render::fildes(args.arg("fildes"), fildes);
            args.arg("offset").printf(format_args!("{offset}"));
            flags::write_enum(args.arg("whence"), whence, flags::LSEEK_WHENCE);
        }
        Call::Ftruncate { fildes, length } => {
            render::fildes(args.arg("fildes"), fildes);
            args.arg("length").printf(format_args!("{length}"));
        }
        Call::Fchmod { fildes, mode } => {
            render::fildes(args.arg("fildes"), fildes);
            render::permission_mode(args.arg("mode"), mode);
        }
        Call::Pipe { fildes } => render::pointer(args.arg("fildes"), fildes),
        _ => {}
    }
    args.finish();
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    let name = call.name();
    match *call {
        Call::Read { fildes, .. } => explain_read(sb, errnum, fildes),
        Call::Write { fildes, .. } => explain_write(sb, errnum, fildes),
        Call::Close { fildes } | Call::Fsync { fildes } | Call::Dup { fildes } => match errnum {
            libc::EINVAL | libc::EROFS if name == "fsync" => {
                sb.puts("fildes is bound to a special file which does not support synchronization");
                write_kind(sb, fildes);
            }
            _ => explain_fildes(sb, errnum, name, fildes, "fildes", Access::Any),
        },
        Call::Dup2 { oldfd, newfd } => explain_dup2(sb, errnum, oldfd, newfd),
        Call::Lseek { fildes, offset, whence } => explain_lseek(sb, errnum, fildes, offset, whence),
        Call::Fstat { fildes } => match errnum {
            libc::EOVERFLOW => sb.puts(
                "the file size, inode number, or number of blocks cannot be represented in the stat structure",
            ),
            _ => explain_fildes(sb, errnum, name, fildes, "fildes", Access::Any),
        },
        Call::Ftruncate { fildes, length } => explain_ftruncate(sb, errnum, fildes, length),
        Call::Fchmod { fildes, .. } => explain_fchmod(sb, errnum, fildes),
        Call::Fchdir { fildes } => explain_fchdir(sb, errnum, fildes),
        Call::Pipe { .. } => match errnum {
            libc::EFAULT => common::efault(sb, "fildes"),
            libc::EINVAL => sb.puts("the flags argument is invalid"),
            _ => crate::causes::generic::explain_generic(sb, errnum, name),
        },
        _ => {}
    }
}

fn write_kind(sb: &mut StringBuffer, fd: RawFd) {
    if let Some(st) = fildes::fstat(fd) {
        sb.puts(", it is a ");
        write_file_type(sb, &st);
    }
}

fn is_direct(fd: RawFd) -> bool {
    fildes::open_flags(fd).is_some_and(|flags| flags.contains(OFlag::O_DIRECT))
}

// Reads from the controlling terminal stop a background job.
fn background_tty_read(fd: RawFd) -> bool {
    if !fildes::is_open(fd) {
        return false;
    }
    // fcntl just reported it open
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    if !borrowed.is_terminal() {
        return false;
    }
    let foreground = unsafe { libc::tcgetpgrp(fd) };
    foreground >= 0 && foreground != getpgrp().as_raw()
}

fn explain_read(sb: &mut StringBuffer, errnum: i32, fd: RawFd) {
    match errnum {
        libc::EFAULT => common::efault(sb, "data"),
        libc::EINVAL if is_direct(fd) => sb.puts(
            "the file was opened with the O_DIRECT flag, and either the address specified in data, the value specified in data_size, or the current file offset is not suitably aligned",
        ),
        libc::EISDIR => sb.puts("fildes refers to a directory, and you must use getdents(2) to read directories"),
        libc::EIO if background_tty_read(fd) => sb.puts(
            "the process is in a background process group and tried to read from its controlling terminal",
        ),
        libc::EOVERFLOW => sb.puts("the file offset is beyond the maximum a file of this kind may be read at"),
        _ => explain_fildes(sb, errnum, "read", fd, "fildes", Access::Read),
    }
}

fn explain_write(sb: &mut StringBuffer, errnum: i32, fd: RawFd) {
    match errnum {
        libc::EFAULT => common::efault(sb, "data"),
        libc::EINVAL if is_direct(fd) => sb.puts(
            "the file was opened with the O_DIRECT flag, and either the address specified in data, the value specified in data_size, or the current file offset is not suitably aligned",
        ),
        libc::EPIPE => {
            sb.puts("fildes is connected to a pipe or socket whose reading end is closed, when this happens the writing process will also receive a SIGPIPE signal");
            sigpipe_note(sb);
        }
        _ => explain_fildes(sb, errnum, "write", fd, "fildes", Access::Write),
    }
}

/// Says why the process is still alive to see EPIPE.
fn sigpipe_note(sb: &mut StringBuffer) {
    if SigSet::thread_get_mask().is_ok_and(|mask| mask.contains(Signal::SIGPIPE)) {
        sb.footnote().puts("note that this process is blocking the SIGPIPE signal");
        return;
    }
    let mut action: libc::sigaction = unsafe { std::mem::zeroed() };
    // a null new action only reads the current one
    if unsafe { libc::sigaction(libc::SIGPIPE, std::ptr::null(), &mut action) } != 0 {
        sb.footnote().puts("note that this process catches, blocks or ignores the SIGPIPE signal");
        return;
    }
    match action.sa_sigaction {
        libc::SIG_DFL => {}
        libc::SIG_IGN => sb.footnote().puts("note that this process is ignoring the SIGPIPE signal"),
        _ => sb.footnote().puts("note that this process is catching the SIGPIPE signal"),
    }
}

fn explain_dup2(sb: &mut StringBuffer, errnum: i32, oldfd: RawFd, newfd: RawFd) {
    match errnum {
        libc::EBADF if !fildes::is_open(oldfd) => explain_ebadf(sb, oldfd, "oldfd", Access::Any),
        libc::EBADF => {
            sb.printf(format_args!("newfd ({newfd}) is out of the allowed range for file descriptors"));
            if let Some(max) = fildes::open_max() {
                sb.printf(format_args!(" (0..{max})"));
            }
        }
        libc::EBUSY => sb.puts(
            "newfd was in the middle of being opened by another thread, a race condition with open(2) or dup(2)",
        ),
        _ => explain_fildes(sb, errnum, "dup2", oldfd, "oldfd", Access::Any),
    }
}

fn explain_lseek(sb: &mut StringBuffer, errnum: i32, fd: RawFd, offset: i64, whence: i32) {
    match errnum {
        libc::EINVAL => {
            let anchor = match whence {
                libc::SEEK_SET => Some(0),
                libc::SEEK_CUR => lseek(fd, 0, Whence::SeekCur).ok(),
                libc::SEEK_END => fildes::fstat(fd).map(|st| st.st_size),
                libc::SEEK_DATA | libc::SEEK_HOLE if offset < 0 => {
                    sb.printf(format_args!("offset is negative ({offset})"));
                    return;
                }
                libc::SEEK_DATA | libc::SEEK_HOLE => None,
                _ => {
                    sb.puts("whence is not one of SEEK_SET, SEEK_CUR, SEEK_END, SEEK_DATA, SEEK_HOLE");
                    return;
                }
            };
            let destination = match anchor.map(|anchor| anchor.checked_add(offset)) {
                Some(None) => {
                    sb.puts("the resulting file offset cannot be represented in an off_t");
                    return;
                }
                Some(destination) => destination,
                None => None,
            };
            match destination {
                Some(destination) if destination < 0 => {
                    sb.printf(format_args!("the resulting file offset would be negative ({destination})"))
                }
                Some(destination) => sb.printf(format_args!(
                    "the resulting offset would be beyond the end of a seekable device ({destination})"
                )),
                None => sb.puts("the resulting file offset would be negative, or beyond the end of a seekable device"),
            }
        }
        libc::ENXIO if whence == libc::SEEK_HOLE => sb.puts("there is no hole extent beyond the current file position"),
        libc::ENXIO if whence == libc::SEEK_DATA => sb.puts("there is no data extent beyond the current file position"),
        libc::EOVERFLOW => sb.puts("the resulting file offset cannot be represented in an off_t"),
        libc::ESPIPE => match fildes::fstat(fd) {
            Some(st) => {
                sb.puts("fildes is associated with a ");
                write_file_type(sb, &st);
                sb.puts(", and it is not possible to seek on this kind of file");
            }
            None => sb.puts("fildes is associated with a pipe, socket, or FIFO"),
        },
        _ => explain_fildes(sb, errnum, "lseek", fd, "fildes", Access::Any),
    }
}

fn explain_ftruncate(sb: &mut StringBuffer, errnum: i32, fd: RawFd, length: i64) {
    match errnum {
        libc::EINVAL if length < 0 => sb.printf(format_args!("length is negative ({length})")),
        libc::EINVAL => match fildes::fstat(fd) {
            Some(st) if FileType::from_mode(st.st_mode) != FileType::Regular => {
                sb.puts("fildes refers to a ");
                write_file_type(sb, &st);
                sb.puts(", it is only possible to truncate a regular file");
            }
            _ => explain_ebadf(sb, fd, "fildes", Access::Write),
        },
        libc::EPERM => sb.puts("the underlying file system does not support extending a file beyond its current size, or the file is append only or immutable"),
        libc::EBADF => explain_ebadf(sb, fd, "fildes", Access::Write),
        _ => explain_fildes(sb, errnum, "ftruncate", fd, "fildes", Access::Write),
    }
}

fn explain_fchmod(sb: &mut StringBuffer, errnum: i32, fd: RawFd) {
    let id = Identity::current();
    match (errnum, fildes::fstat(fd)) {
        (libc::EPERM, Some(st)) if !have_inode_permission(&st, &id) => {
            sb.puts("the effective UID of the process ");
            render::uid(sb, id.uid);
            sb.puts(" does not match the owner of the file ");
            render::uid(sb, st.st_uid);
            common::capability_note(sb, Capability::Fowner);
        }
        (libc::EPERM, _) => sb.puts("the file is marked immutable or append-only"),
        _ => explain_fildes(sb, errnum, "fchmod", fd, "fildes", Access::Any),
    }
}

fn explain_fchdir(sb: &mut StringBuffer, errnum: i32, fd: RawFd) {
    let id = Identity::current();
    match (errnum, fildes::fstat(fd)) {
        (libc::ENOTDIR, Some(st)) => {
            sb.puts("fildes refers to a ");
            write_file_type(sb, &st);
            sb.puts(", not to a directory");
        }
        (libc::EACCES, Some(st)) if !have_search_permission(&st, &id) => {
            sb.puts("the process does not have search permission to the directory");
            explain_search_permission(sb, &st, &id);
        }
        _ => explain_fildes(sb, errnum, "fchdir", fd, "fildes", Access::Any),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;
    use std::{
        fs::{self, File},
        os::fd::AsRawFd,
    };
    use tempfile::TempDir;

    #[test]
    fn read_renders_the_descriptor_target() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("target");
        fs::write(&path, "").unwrap();
        let file = File::open(&path).unwrap();
        let call = Call::Read { fildes: file.as_raw_fd(), data: 0, data_size: 10 };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        let canonical = fs::canonicalize(&path).unwrap();
        assert_eq!(
            sb.as_str(),
            format!("read(fildes = {} \"{}\", data = NULL, data_size = 10)", file.as_raw_fd(), canonical.display())
        );
    }

    #[test]
    fn write_to_a_read_only_descriptor() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ro");
        fs::write(&path, "").unwrap();
        let file = File::open(&path).unwrap();
        let call = Call::Write { fildes: file.as_raw_fd(), data: 0x1000, data_size: 1 };
        let message = explain_errno(&call, libc::EBADF);
        assert!(message.contains("not open for writing"), "{message}");
    }

    #[test]
    fn negative_seek() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seek");
        fs::write(&path, "0123456789").unwrap();
        let file = File::open(&path).unwrap();
        let call = Call::Lseek { fildes: file.as_raw_fd(), offset: -20, whence: libc::SEEK_END };
        let message = explain_errno(&call, libc::EINVAL);
        assert!(message.ends_with("the resulting file offset would be negative (-10)"), "{message}");
    }

    #[test]
    fn seek_past_the_largest_offset() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seek");
        fs::write(&path, "0123456789").unwrap();
        let file = File::open(&path).unwrap();
        let call = Call::Lseek { fildes: file.as_raw_fd(), offset: i64::MAX, whence: libc::SEEK_END };
        let message = explain_errno(&call, libc::EINVAL);
        assert!(message.ends_with("the resulting file offset cannot be represented in an off_t"), "{message}");
    }

    #[test]
    fn lseek_renders_whence() {
        let call = Call::Lseek { fildes: -1, offset: 0, whence: libc::SEEK_CUR };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        assert_eq!(sb.as_str(), "lseek(fildes = -1, offset = 0, whence = SEEK_CUR)");
    }

    #[test]
    fn fchdir_on_a_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, "").unwrap();
        let file = File::open(&path).unwrap();
        let message = explain_errno(&Call::Fchdir { fildes: file.as_raw_fd() }, libc::ENOTDIR);
        assert!(message.ends_with("fildes refers to a regular file, not to a directory"), "{message}");
    }
}
