use super::absorb;
use nix::{
    fcntl::{fcntl, FcntlArg, OFlag},
    libc,
    sys::{
        resource::{getrlimit, Resource},
        socket::{getpeername, getsockname, getsockopt, sockopt, SockType, SockaddrStorage},
        stat::{fstat as nix_fstat, FileStat},
    },
};
use procfs::process::{FDInfo, FDTarget};
use std::os::fd::{BorrowedFd, RawFd};
use std::path::PathBuf;

use crate::sockaddr::SocketAddress;

fn own_pid() -> i32 {
    std::process::id() as i32
}

pub fn fildes_target(fd: RawFd) -> Option<FDTarget> {
    if fd < 0 {
        return None;
    }
    absorb("fd target", FDInfo::from_raw_fd(own_pid(), fd)).map(|info| info.target)
}

/// The path an open descriptor refers to, when it refers to one.
pub fn fildes_path(fd: RawFd) -> Option<PathBuf> {
    match fildes_target(fd)? {
        FDTarget::Path(path) => Some(path),
        _ => None,
    }
}

/// The text of the descriptor's `/proc/self/fd` link.
pub fn describe_fildes(fd: RawFd) -> Option<String> {
    let described = match fildes_target(fd)? {
        FDTarget::Path(path) => path.to_string_lossy().into_owned(),
        FDTarget::Socket(inode) => describe_socket(inode),
        FDTarget::Net(inode) => format!("net:[{inode}]"),
        FDTarget::Pipe(inode) => format!("pipe:[{inode}]"),
        FDTarget::AnonInode(kind) => format!("anon_inode:{kind}"),
        FDTarget::MemFD(name) => format!("memfd:{name}"),
        FDTarget::Other(kind, inode) => format!("{kind}:[{inode}]"),
    };
    Some(described)
}

// tcp and udp sockets show their local address, unix sockets their path
fn describe_socket(inode: u64) -> String {
    let tcp = procfs::net::tcp()
        .into_iter()
        .chain(procfs::net::tcp6())
        .flatten();
    for entry in tcp {
        if entry.inode == inode {
            return format!("TCP {}", entry.local_address);
        }
    }
    let udp = procfs::net::udp()
        .into_iter()
        .chain(procfs::net::udp6())
        .flatten();
    for entry in udp {
        if entry.inode == inode {
            return format!("UDP {}", entry.local_address);
        }
    }
    if let Ok(unix) = procfs::net::unix() {
        for entry in unix {
            if entry.inode == inode {
                if let Some(path) = entry.path {
                    return format!("UNIX {}", path.display());
                }
            }
        }
    }
    format!("socket:[{inode}]")
}

/// The file status flags, or `None` when `fd` is not open.
pub fn open_flags(fd: RawFd) -> Option<OFlag> {
    fcntl(fd, FcntlArg::F_GETFL).ok().map(OFlag::from_bits_retain)
}

pub fn is_open(fd: RawFd) -> bool {
    fd >= 0 && fcntl(fd, FcntlArg::F_GETFD).is_ok()
}

pub fn fstat(fd: RawFd) -> Option<FileStat> {
    absorb("fstat", nix_fstat(fd))
}

fn borrow(fd: RawFd) -> Option<BorrowedFd<'static>> {
    // only used on descriptors that fcntl just reported open
    is_open(fd).then(|| unsafe { BorrowedFd::borrow_raw(fd) })
}

pub fn is_socket(fd: RawFd) -> bool {
    fstat(fd).is_some_and(|st| st.st_mode & libc::S_IFMT == libc::S_IFSOCK)
}

pub fn socket_type(fd: RawFd) -> Option<SockType> {
    let fd = borrow(fd)?;
    absorb("SO_TYPE", getsockopt(&fd, sockopt::SockType))
}

pub fn is_listening(fd: RawFd) -> bool {
    borrow(fd)
        .and_then(|fd| absorb("SO_ACCEPTCONN", getsockopt(&fd, sockopt::AcceptConn)))
        .unwrap_or(false)
}

pub fn socket_name(fd: RawFd) -> Option<SocketAddress> {
    let storage = absorb("getsockname", getsockname::<SockaddrStorage>(fd))?;
    Some(SocketAddress::from_storage(&storage))
}

pub fn peer_name(fd: RawFd) -> Option<SocketAddress> {
    getpeername::<SockaddrStorage>(fd)
        .ok()
        .map(|storage| SocketAddress::from_storage(&storage))
}

/// The network interface a socket was bound to with `SO_BINDTODEVICE`.
pub fn bound_device(fd: RawFd) -> Option<String> {
    let fd = borrow(fd)?;
    let device = getsockopt(&fd, sockopt::BindToDevice).ok()?;
    let device = device.to_string_lossy().trim_end_matches('\0').to_owned();
    (!device.is_empty()).then_some(device)
}

/// The soft `RLIMIT_NOFILE`, the first descriptor number that can never
/// be valid.
pub fn open_max() -> Option<u64> {
    absorb("RLIMIT_NOFILE", getrlimit(Resource::RLIMIT_NOFILE)).map(|(soft, _)| soft)
}

/// Counts the descriptors this process holds open right now.
pub fn open_count() -> Option<usize> {
    let process = absorb("myself", procfs::process::Process::myself())?;
    absorb("fd count", process.fd_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::AsRawFd;

    #[test]
    fn file_targets_are_paths() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let fd = file.as_file().as_raw_fd();
        let real = std::fs::canonicalize(file.path()).unwrap();
        assert_eq!(fildes_path(fd), Some(real));
        assert!(is_open(fd));
        assert!(!is_socket(fd));
        let flags = open_flags(fd).unwrap();
        assert_eq!(flags & OFlag::O_ACCMODE, OFlag::O_RDWR);
    }

    #[test]
    fn closed_descriptors_have_no_target() {
        assert!(!is_open(9999));
        assert!(open_flags(9999).is_none());
        assert!(describe_fildes(9999).is_none());
        assert!(describe_fildes(-1).is_none());
    }

    #[test]
    fn pipes_are_described() {
        let (read_end, _write_end) = nix::unistd::pipe().unwrap();
        let described = describe_fildes(read_end.as_raw_fd()).unwrap();
        assert!(described.starts_with("pipe:["), "{described}");
    }

    #[test]
    fn listening_socket() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let fd = listener.as_raw_fd();
        assert!(is_socket(fd));
        assert!(is_listening(fd));
        assert_eq!(socket_type(fd), Some(SockType::Stream));
        let name = socket_name(fd).unwrap();
        assert_eq!(name.port(), Some(listener.local_addr().unwrap().port()));
    }

    #[test]
    fn descriptor_limit_is_known() {
        assert!(open_max().unwrap() > 2);
    }
}
