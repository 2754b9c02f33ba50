use nix::libc::{self, mode_t};
use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Socket,
    Fifo,
    CharDevice,
    BlockDevice,
    Unknown(mode_t),
}

impl FileType {
    pub fn from_mode(st_mode: mode_t) -> FileType {
        match st_mode & libc::S_IFMT {
            libc::S_IFREG => FileType::Regular,
            libc::S_IFDIR => FileType::Directory,
            libc::S_IFLNK => FileType::Symlink,
            libc::S_IFSOCK => FileType::Socket,
            libc::S_IFIFO => FileType::Fifo,
            libc::S_IFCHR => FileType::CharDevice,
            libc::S_IFBLK => FileType::BlockDevice,
            other => FileType::Unknown(other),
        }
    }

    pub fn is_device(self) -> bool {
        matches!(self, FileType::CharDevice | FileType::BlockDevice)
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Regular => write!(f, "regular file"),
            FileType::Directory => write!(f, "directory"),
            FileType::Symlink => write!(f, "symbolic link"),
            FileType::Socket => write!(f, "socket"),
            FileType::Fifo => write!(f, "named pipe"),
            FileType::CharDevice => write!(f, "character special device"),
            FileType::BlockDevice => write!(f, "block special device"),
            FileType::Unknown(mode) => write!(f, "unknown file type ({mode:#o})"),
        }
    }
}

/// Broad grouping of the supported calls, used for dispatch and listings.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub enum Family {
    Path,
    FileDescriptor,
    Network,
    Process,
    Memory,
    Environment,
}

impl Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Family::Path => write!(f, "Path"),
            Family::FileDescriptor => write!(f, "File Descriptor"),
            Family::Network => write!(f, "Network"),
            Family::Process => write!(f, "Process"),
            Family::Memory => write!(f, "Memory"),
            Family::Environment => write!(f, "Environment"),
        }
    }
}

#[allow(non_camel_case_types)]
pub enum Bytes {
    norm(u64),
    kilo(f64),
    mega(f64),
    giga(f64),
    tera(f64),
}

impl Display for Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bytes::norm(bytes) => write!(f, "{} bytes", bytes),
            Bytes::kilo(bytes) => write!(f, "{:.1}KiB", bytes),
            Bytes::mega(bytes) => write!(f, "{:.1}MiB", bytes),
            Bytes::giga(bytes) => write!(f, "{:.1}GiB", bytes),
            Bytes::tera(bytes) => write!(f, "{:.1}TiB", bytes),
        }
    }
}

impl From<u64> for Bytes {
    fn from(value: u64) -> Self {
        let value_float = value as f64;
        if value_float >= 1_099_511_627_776.0 {
            Bytes::tera(value_float / 1_099_511_627_776.0)
        } else if value_float >= 1_073_741_824.0 {
            Bytes::giga(value_float / 1_073_741_824.0)
        } else if value_float >= 1_048_576.0 {
            Bytes::mega(value_float / 1_048_576.0)
        } else if value_float >= 1_024.0 {
            Bytes::kilo(value_float / 1_024.0)
        } else {
            Bytes::norm(value)
        }
    }
}

impl From<usize> for Bytes {
    fn from(value: usize) -> Self {
        Bytes::from(value as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_types_from_mode() {
        assert_eq!(FileType::from_mode(libc::S_IFDIR | 0o755), FileType::Directory);
        assert_eq!(FileType::from_mode(libc::S_IFREG | 0o644).to_string(), "regular file");
        assert!(FileType::from_mode(libc::S_IFBLK).is_device());
    }

    #[test]
    fn human_sizes() {
        assert_eq!(Bytes::from(512u64).to_string(), "512 bytes");
        assert_eq!(Bytes::from(8u64 * 1024 * 1024).to_string(), "8.0MiB");
    }
}
