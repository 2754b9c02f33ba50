use crate::string_buffer::StringBuffer;
use nix::{
    libc,
    sys::socket::{SockaddrLike, SockaddrStorage, UnixAddr},
};
use std::{
    fmt::Display,
    net::{SocketAddr, SocketAddrV4, SocketAddrV6},
    os::unix::ffi::OsStrExt,
    path::PathBuf,
};

/// A socket address as passed to bind(2) or connect(2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SocketAddress {
    Inet(SocketAddrV4),
    Inet6(SocketAddrV6),
    Unix(PathBuf),
    Abstract(Vec<u8>),
    Unnamed,
    Other(i32),
}

impl SocketAddress {
    pub fn from_storage(storage: &SockaddrStorage) -> SocketAddress {
        if let Some(sin) = storage.as_sockaddr_in() {
            return SocketAddress::Inet(SocketAddrV4::from(*sin));
        }
        if let Some(sin6) = storage.as_sockaddr_in6() {
            return SocketAddress::Inet6(SocketAddrV6::from(*sin6));
        }
        if let Some(sun) = storage.as_unix_addr() {
            if let Some(path) = sun.path() {
                return SocketAddress::Unix(path.to_path_buf());
            }
            if let Some(name) = sun.as_abstract() {
                return SocketAddress::Abstract(name.to_vec());
            }
            return SocketAddress::Unnamed;
        }
        match storage.family() {
            Some(family) => SocketAddress::Other(family as i32),
            None => SocketAddress::Unnamed,
        }
    }

    /// `127.0.0.1:80`, `[::1]:80`, `/run/sock` or `@abstract`.
    pub fn parse(text: &str) -> Option<SocketAddress> {
        if let Some(name) = text.strip_prefix('@') {
            return Some(SocketAddress::Abstract(name.as_bytes().to_vec()));
        }
        if let Ok(address) = text.parse::<SocketAddr>() {
            return Some(match address {
                SocketAddr::V4(v4) => SocketAddress::Inet(v4),
                SocketAddr::V6(v6) => SocketAddress::Inet6(v6),
            });
        }
        if text.contains('/') {
            return Some(SocketAddress::Unix(PathBuf::from(text)));
        }
        None
    }

    pub fn family(&self) -> i32 {
        match self {
            SocketAddress::Inet(_) => libc::AF_INET,
            SocketAddress::Inet6(_) => libc::AF_INET6,
            SocketAddress::Unix(_) | SocketAddress::Abstract(_) | SocketAddress::Unnamed => libc::AF_UNIX,
            SocketAddress::Other(family) => *family,
        }
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            SocketAddress::Inet(v4) => Some(v4.port()),
            SocketAddress::Inet6(v6) => Some(v6.port()),
            _ => None,
        }
    }

    /// Field by field, the way the structure was filled in.
    pub fn write(&self, sb: &mut StringBuffer) {
        match self {
            SocketAddress::Inet(v4) => sb.printf(format_args!(
                "{{ sin_family = AF_INET, sin_port = {}, sin_addr = {} }}",
                v4.port(),
                v4.ip()
            )),
            SocketAddress::Inet6(v6) => sb.printf(format_args!(
                "{{ sin6_family = AF_INET6, sin6_port = {}, sin6_addr = {} }}",
                v6.port(),
                v6.ip()
            )),
            SocketAddress::Unix(path) => {
                sb.puts("{ sun_family = AF_UNIX, sun_path = ");
                sb.puts_quoted(&path.to_string_lossy());
                sb.puts(" }");
            }
            SocketAddress::Abstract(name) => {
                sb.puts("{ sun_family = AF_UNIX, sun_path = ");
                sb.puts_quoted(&format!("\0{}", String::from_utf8_lossy(name)));
                sb.puts(" }");
            }
            SocketAddress::Unnamed => sb.puts("{ sun_family = AF_UNIX }"),
            SocketAddress::Other(family) => sb.printf(format_args!("{{ sa_family = {family} }}")),
        }
    }

    /// The address in the form the socket calls take, when it has one.
    pub fn to_storage(&self) -> Option<SockaddrStorage> {
        match self {
            SocketAddress::Inet(v4) => Some(SockaddrStorage::from(*v4)),
            SocketAddress::Inet6(v6) => Some(SockaddrStorage::from(*v6)),
            SocketAddress::Unix(path) => storage_from(&UnixAddr::new(path.as_os_str().as_bytes()).ok()?),
            SocketAddress::Abstract(name) => storage_from(&UnixAddr::new_abstract(name).ok()?),
            SocketAddress::Unnamed | SocketAddress::Other(_) => None,
        }
    }
}

impl Display for SocketAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SocketAddress::Inet(v4) => write!(f, "{v4}"),
            SocketAddress::Inet6(v6) => write!(f, "{v6}"),
            SocketAddress::Unix(path) => write!(f, "{}", path.display()),
            SocketAddress::Abstract(name) => write!(f, "@{}", String::from_utf8_lossy(name)),
            SocketAddress::Unnamed => write!(f, "unnamed"),
            SocketAddress::Other(family) => write!(f, "address family {family}"),
        }
    }
}

fn storage_from<A: SockaddrLike>(address: &A) -> Option<SockaddrStorage> {
    unsafe { SockaddrStorage::from_raw(address.as_ptr(), Some(address.len())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forms() {
        assert_eq!(
            SocketAddress::parse("127.0.0.1:80"),
            Some(SocketAddress::Inet("127.0.0.1:80".parse().unwrap()))
        );
        assert_eq!(SocketAddress::parse("[::1]:22").unwrap().family(), libc::AF_INET6);
        assert_eq!(
            SocketAddress::parse("/run/app.sock"),
            Some(SocketAddress::Unix(PathBuf::from("/run/app.sock")))
        );
        assert_eq!(SocketAddress::parse("@hidden").unwrap().to_string(), "@hidden");
        assert_eq!(SocketAddress::parse("nonsense"), None);
    }

    #[test]
    fn written_field_by_field() {
        let mut sb = StringBuffer::default();
        SocketAddress::parse("10.0.0.1:8080").unwrap().write(&mut sb);
        assert_eq!(
            sb.as_str(),
            "{ sin_family = AF_INET, sin_port = 8080, sin_addr = 10.0.0.1 }"
        );
    }

    #[test]
    fn storage_round_trip() {
        let address = SocketAddress::parse("127.0.0.1:5000").unwrap();
        let storage = address.to_storage().unwrap();
        assert_eq!(SocketAddress::from_storage(&storage), address);
    }
}
