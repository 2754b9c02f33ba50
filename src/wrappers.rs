use crate::{
    calls::{explain_errno_into, Call},
    options::options,
    sockaddr::SocketAddress,
    string_buffer::StringBuffer,
    writer,
};
use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    libc,
    sys::{
        socket::{self, SockaddrStorage},
        stat::{self, FileStat, Mode},
    },
    unistd::{self, AccessFlags, ForkResult, Whence},
};
use std::{
    convert::Infallible,
    ffi::CString,
    io,
    os::{
        fd::{FromRawFd, OwnedFd, RawFd},
        unix::{ffi::OsStrExt, fs::PermissionsExt},
    },
    path::Path,
    process,
    sync::LazyLock,
};

static PROGRAM_NAME: LazyLock<String> = LazyLock::new(|| {
    std::env::args_os()
        .next()
        .as_deref()
        .map(Path::new)
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
});

/// Prints the explanation of `call` failing with `errno`.
pub fn report(call: &Call, errno: Errno) {
    let mut text = StringBuffer::default();
    if options().program_name && !PROGRAM_NAME.is_empty() {
        text.puts(&PROGRAM_NAME);
        text.puts(": ");
    }
    explain_errno_into(&mut text, call, errno as i32);
    writer::report(text.as_str());
}

fn on_error<'a, T>(result: nix::Result<T>, call: impl FnOnce() -> Call<'a>) -> nix::Result<T> {
    result.inspect_err(|errno| report(&call(), *errno))
}

fn or_die<T>(result: nix::Result<T>) -> T {
    result.unwrap_or_else(|_| process::exit(1))
}

fn from_io(error: io::Error) -> Errno {
    Errno::from_raw(error.raw_os_error().unwrap_or(libc::EIO))
}

macro_rules! or_die {
    ($name:ident => $on_error:ident($($arg:ident: $ty:ty),*) -> $ret:ty) => {
        pub fn $name($($arg: $ty),*) -> $ret {
            or_die($on_error($($arg),*))
        }
    };
}

pub fn open_on_error(pathname: &Path, flags: i32, mode: u32) -> nix::Result<RawFd> {
    let result = fcntl::open(pathname, OFlag::from_bits_retain(flags), Mode::from_bits_truncate(mode));
    on_error(result, || Call::Open { pathname, flags, mode })
}
or_die!(open_or_die => open_on_error(pathname: &Path, flags: i32, mode: u32) -> RawFd);

pub fn openat_on_error(dirfd: RawFd, pathname: &Path, flags: i32, mode: u32) -> nix::Result<RawFd> {
    let result = CString::new(pathname.as_os_str().as_bytes())
        .map_err(|_| Errno::EINVAL)
        .and_then(|c_path| {
            Errno::result(unsafe { libc::openat(dirfd, c_path.as_ptr(), flags, mode as libc::c_uint) })
        });
    on_error(result, || Call::Openat { dirfd, pathname, flags, mode })
}
or_die!(openat_or_die => openat_on_error(dirfd: RawFd, pathname: &Path, flags: i32, mode: u32) -> RawFd);

pub fn close_on_error(fildes: RawFd) -> nix::Result<()> {
    on_error(unistd::close(fildes), || Call::Close { fildes })
}
or_die!(close_or_die => close_on_error(fildes: RawFd) -> ());

pub fn read_on_error(fildes: RawFd, data: &mut [u8]) -> nix::Result<usize> {
    let (address, data_size) = (data.as_ptr() as usize, data.len());
    on_error(unistd::read(fildes, data), || Call::Read { fildes, data: address, data_size })
}
or_die!(read_or_die => read_on_error(fildes: RawFd, data: &mut [u8]) -> usize);

pub fn write_on_error(fildes: RawFd, data: &[u8]) -> nix::Result<usize> {
    let result = Errno::result(unsafe { libc::write(fildes, data.as_ptr().cast(), data.len()) });
    on_error(result.map(|written| written as usize), || Call::Write {
        fildes,
        data: data.as_ptr() as usize,
        data_size: data.len(),
    })
}
or_die!(write_or_die => write_on_error(fildes: RawFd, data: &[u8]) -> usize);

pub fn lseek_on_error(fildes: RawFd, offset: i64, whence: i32) -> nix::Result<i64> {
    let result = match whence {
        libc::SEEK_SET => Ok(Whence::SeekSet),
        libc::SEEK_CUR => Ok(Whence::SeekCur),
        libc::SEEK_END => Ok(Whence::SeekEnd),
        libc::SEEK_DATA => Ok(Whence::SeekData),
        libc::SEEK_HOLE => Ok(Whence::SeekHole),
        _ => Err(Errno::EINVAL),
    }
    .and_then(|whence| unistd::lseek(fildes, offset, whence));
    on_error(result, || Call::Lseek { fildes, offset, whence })
}
or_die!(lseek_or_die => lseek_on_error(fildes: RawFd, offset: i64, whence: i32) -> i64);

pub fn dup_on_error(fildes: RawFd) -> nix::Result<RawFd> {
    on_error(unistd::dup(fildes), || Call::Dup { fildes })
}
or_die!(dup_or_die => dup_on_error(fildes: RawFd) -> RawFd);

pub fn dup2_on_error(oldfd: RawFd, newfd: RawFd) -> nix::Result<RawFd> {
    on_error(unistd::dup2(oldfd, newfd), || Call::Dup2 { oldfd, newfd })
}
or_die!(dup2_or_die => dup2_on_error(oldfd: RawFd, newfd: RawFd) -> RawFd);

pub fn pipe_on_error() -> nix::Result<(OwnedFd, OwnedFd)> {
    let mut fds = [-1 as libc::c_int; 2];
    let address = fds.as_ptr() as usize;
    let result = Errno::result(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) })
        // pipe2 succeeded, so both descriptors are open and ours
        .map(|_| unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) });
    on_error(result, || Call::Pipe { fildes: address })
}
or_die!(pipe_or_die => pipe_on_error() -> (OwnedFd, OwnedFd));

pub fn fsync_on_error(fildes: RawFd) -> nix::Result<()> {
    on_error(unistd::fsync(fildes), || Call::Fsync { fildes })
}
or_die!(fsync_or_die => fsync_on_error(fildes: RawFd) -> ());

pub fn ftruncate_on_error(fildes: RawFd, length: i64) -> nix::Result<()> {
    let result = Errno::result(unsafe { libc::ftruncate(fildes, length) }).map(drop);
    on_error(result, || Call::Ftruncate { fildes, length })
}
or_die!(ftruncate_or_die => ftruncate_on_error(fildes: RawFd, length: i64) -> ());

pub fn mkdir_on_error(pathname: &Path, mode: u32) -> nix::Result<()> {
    let result = unistd::mkdir(pathname, Mode::from_bits_truncate(mode));
    on_error(result, || Call::Mkdir { pathname, mode })
}
or_die!(mkdir_or_die => mkdir_on_error(pathname: &Path, mode: u32) -> ());

pub fn rmdir_on_error(pathname: &Path) -> nix::Result<()> {
    let result = std::fs::remove_dir(pathname).map_err(from_io);
    on_error(result, || Call::Rmdir { pathname })
}
or_die!(rmdir_or_die => rmdir_on_error(pathname: &Path) -> ());

pub fn unlink_on_error(pathname: &Path) -> nix::Result<()> {
    on_error(unistd::unlink(pathname), || Call::Unlink { pathname })
}
or_die!(unlink_or_die => unlink_on_error(pathname: &Path) -> ());

pub fn rename_on_error(oldpath: &Path, newpath: &Path) -> nix::Result<()> {
    let result = std::fs::rename(oldpath, newpath).map_err(from_io);
    on_error(result, || Call::Rename { oldpath, newpath })
}
or_die!(rename_or_die => rename_on_error(oldpath: &Path, newpath: &Path) -> ());

pub fn chdir_on_error(pathname: &Path) -> nix::Result<()> {
    on_error(unistd::chdir(pathname), || Call::Chdir { pathname })
}
or_die!(chdir_or_die => chdir_on_error(pathname: &Path) -> ());

pub fn chmod_on_error(pathname: &Path, mode: u32) -> nix::Result<()> {
    let result = std::fs::set_permissions(pathname, std::fs::Permissions::from_mode(mode)).map_err(from_io);
    on_error(result, || Call::Chmod { pathname, mode })
}
or_die!(chmod_or_die => chmod_on_error(pathname: &Path, mode: u32) -> ());

pub fn access_on_error(pathname: &Path, mode: i32) -> nix::Result<()> {
    let result = unistd::access(pathname, AccessFlags::from_bits_retain(mode));
    on_error(result, || Call::Access { pathname, mode })
}
or_die!(access_or_die => access_on_error(pathname: &Path, mode: i32) -> ());

pub fn stat_on_error(pathname: &Path) -> nix::Result<FileStat> {
    on_error(stat::stat(pathname), || Call::Stat { pathname })
}
or_die!(stat_or_die => stat_on_error(pathname: &Path) -> FileStat);

/// # Safety
///
/// As for [`nix::unistd::fork`]: in a multithreaded program the child may
/// only call async-signal-safe functions.
pub unsafe fn fork_on_error() -> nix::Result<ForkResult> {
    on_error(unsafe { unistd::fork() }, || Call::Fork)
}

/// # Safety
///
/// See [`fork_on_error`].
pub unsafe fn fork_or_die() -> ForkResult {
    or_die(unsafe { fork_on_error() })
}

pub fn kill_on_error(pid: i32, sig: i32) -> nix::Result<()> {
    let result = Errno::result(unsafe { libc::kill(pid, sig) }).map(drop);
    on_error(result, || Call::Kill { pid, sig })
}
or_die!(kill_or_die => kill_on_error(pid: i32, sig: i32) -> ());

pub fn socket_on_error(domain: i32, kind: i32, protocol: i32) -> nix::Result<OwnedFd> {
    let result = Errno::result(unsafe { libc::socket(domain, kind, protocol) })
        // a fresh descriptor nobody else owns
        .map(|fd| unsafe { OwnedFd::from_raw_fd(fd) });
    on_error(result, || Call::Socket { domain, kind, protocol })
}
or_die!(socket_or_die => socket_on_error(domain: i32, kind: i32, protocol: i32) -> OwnedFd);

fn storage(address: &SocketAddress) -> nix::Result<SockaddrStorage> {
    address.to_storage().ok_or(Errno::EAFNOSUPPORT)
}

pub fn bind_on_error(fildes: RawFd, address: &SocketAddress) -> nix::Result<()> {
    let result = storage(address).and_then(|storage| socket::bind(fildes, &storage));
    on_error(result, || Call::Bind { fildes, address: address.clone() })
}
or_die!(bind_or_die => bind_on_error(fildes: RawFd, address: &SocketAddress) -> ());

pub fn connect_on_error(fildes: RawFd, address: &SocketAddress) -> nix::Result<()> {
    let result = storage(address).and_then(|storage| socket::connect(fildes, &storage));
    on_error(result, || Call::Connect { fildes, address: address.clone() })
}
or_die!(connect_or_die => connect_on_error(fildes: RawFd, address: &SocketAddress) -> ());

pub fn listen_on_error(fildes: RawFd, backlog: i32) -> nix::Result<()> {
    let result = Errno::result(unsafe { libc::listen(fildes, backlog) }).map(drop);
    on_error(result, || Call::Listen { fildes, backlog })
}
or_die!(listen_or_die => listen_on_error(fildes: RawFd, backlog: i32) -> ());

/// Replaces the process image, so only ever returns an error.
pub fn execvp_on_error(file: &str, argv: &[String]) -> nix::Result<Infallible> {
    let c_file = CString::new(file).map_err(|_| Errno::EINVAL);
    let c_argv: nix::Result<Vec<CString>> = argv
        .iter()
        .map(|arg| CString::new(arg.as_str()).map_err(|_| Errno::EINVAL))
        .collect();
    let result = c_file.and_then(|c_file| c_argv.and_then(|c_argv| unistd::execvp(&c_file, &c_argv)));
    on_error(result, || Call::Execvp { file, argv })
}

pub fn execvp_or_die(file: &str, argv: &[String]) -> ! {
    match execvp_on_error(file, argv) {
        Ok(never) => match never {},
        Err(_) => process::exit(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn success_passes_the_value_through() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("file");
        let fd = open_on_error(&path, libc::O_WRONLY | libc::O_CREAT, 0o600).unwrap();
        assert_eq!(write_on_error(fd, b"hello").unwrap(), 5);
        assert_eq!(lseek_on_error(fd, 0, libc::SEEK_CUR).unwrap(), 5);
        close_on_error(fd).unwrap();
        assert_eq!(stat_on_error(&path).unwrap().st_size, 5);
    }

    #[test]
    fn failure_returns_the_errno() {
        assert_eq!(close_on_error(-1), Err(Errno::EBADF));
        assert_eq!(lseek_on_error(0, 0, 99), Err(Errno::EINVAL));
        assert_eq!(rmdir_on_error(Path::new("/nonexistent-dir/x")), Err(Errno::ENOENT));
    }
}
