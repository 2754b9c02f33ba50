use super::{
    common,
    fildes::{explain_enotsock, explain_fildes, Access},
};
use crate::{
    capability::Capability,
    identity::Identity,
    probe::{fildes, process},
    sockaddr::SocketAddress,
    string_buffer::StringBuffer,
};
use nix::libc;
use procfs::net::TcpState;
use std::os::fd::RawFd;

/// Ports below this need `CAP_NET_BIND_SERVICE`.
pub const PRIVILEGED_PORT_LIMIT: u16 = 1024;

/// Explains `errnum` for a call on the socket `fd`, with the address the
/// call was given when it took one.
pub fn explain_socket(
    sb: &mut StringBuffer,
    errnum: i32,
    syscall_name: &str,
    fd: RawFd,
    address: Option<&SocketAddress>,
) {
    match errnum {
        libc::ENOTSOCK => explain_enotsock(sb, fd, "fildes"),
        libc::EADDRINUSE => explain_eaddrinuse(sb, fd, address),
        libc::EADDRNOTAVAIL => {
            sb.puts("the requested network address was not local or a nonexistent interface was requested");
            if let Some(address) = address {
                sb.printf(format_args!(" ({address})"));
            }
        }
        libc::EAFNOSUPPORT => explain_eafnosupport(sb, fd, address),
        libc::EISCONN => match fildes::peer_name(fd) {
            Some(peer) => sb.printf(format_args!("the socket is already connected to {peer}")),
            None => sb.puts("the socket is already connected to a network address"),
        },
        libc::ENOTCONN => sb.puts("the socket is not connected, and no target has been given"),
        libc::ECONNREFUSED => sb.puts(
            "the remote server is accessible but is not listening for connections to the given port, or an intervening firewall refused the connection",
        ),
        libc::EINPROGRESS => sb.puts(
            "the socket is non-blocking and the connection cannot be completed immediately",
        ),
        libc::EALREADY => sb.puts(
            "the socket is non-blocking and a previous connection attempt has not yet been completed",
        ),
        libc::ENETUNREACH | libc::EHOSTUNREACH => sb.puts(
            "network or host is unreachable, sometimes this is a routing issue, sometimes the network is physically disconnected",
        ),
        libc::ETIMEDOUT => sb.puts(
            "the connection attempt took too long, the server may be too busy to accept new connections, or an intervening firewall may be discarding your packets",
        ),
        libc::EACCES if is_privileged(address) => {
            sb.puts("the network port address is protected");
            if let Some(port) = address.and_then(SocketAddress::port) {
                sb.printf(format_args!(" ({port} < {PRIVILEGED_PORT_LIMIT})"));
            }
            common::capability_note(sb, Capability::NetBindService);
        }
        libc::EACCES | libc::EPERM => sb.puts(
            "the process tried to connect to a broadcast address without having the socket broadcast flag enabled, or the connection request failed because of a local firewall rule",
        ),
        libc::EOPNOTSUPP if syscall_name == "listen" || syscall_name == "accept" => {
            sb.printf(format_args!(
                "the socket is not of a type that supports the {syscall_name} operation"
            ));
            if let Some(kind) = fildes::socket_type(fd) {
                sb.puts(", it is ");
                crate::flags::write_socket_type(sb, kind as i32);
            }
        }
        libc::EINVAL if syscall_name == "bind" => match fildes::socket_name(fd) {
            Some(bound) if bound.port().is_some_and(|port| port != 0) => {
                sb.printf(format_args!("the socket is already bound to {bound}"))
            }
            _ => sb.puts("the socket is already bound to an address"),
        },
        libc::EINVAL if syscall_name == "accept" && !fildes::is_listening(fd) => {
            sb.puts("the socket is not listening for connections, use listen(2) first")
        }
        _ => explain_fildes(sb, errnum, syscall_name, fd, "fildes", Access::Any),
    }
}

fn is_privileged(address: Option<&SocketAddress>) -> bool {
    let port = address.and_then(SocketAddress::port);
    port.is_some_and(|port| port != 0 && port < PRIVILEGED_PORT_LIMIT)
        && !Identity::current().has(Capability::NetBindService)
}

fn explain_eaddrinuse(sb: &mut StringBuffer, fd: RawFd, address: Option<&SocketAddress>) {
    match address {
        Some(SocketAddress::Unix(path)) => {
            sb.puts("the socket file ");
            sb.puts_quoted(&path.to_string_lossy());
            sb.puts(" already exists, and it should not, when you are done with AF_UNIX sockets you must deliberately unlink(2) the socket file, it does not happen automatically");
        }
        Some(address) => {
            sb.printf(format_args!("the {address} network address is already in use"));
            if let Some((pid, name)) = address.port().and_then(port_listener) {
                sb.printf(format_args!(" by process {pid} "));
                sb.puts_quoted(&name);
            }
        }
        None => {
            sb.puts("the local address is already in use");
            if let Some(bound) = fildes::socket_name(fd) {
                sb.printf(format_args!(" ({bound})"));
            }
        }
    }
}

// procfs lists listening TCP sockets by inode, the inode names the process.
fn port_listener(port: u16) -> Option<(i32, String)> {
    let entries = procfs::net::tcp()
        .into_iter()
        .chain(procfs::net::tcp6())
        .flatten();
    let inode = entries
        .filter(|entry| entry.state == TcpState::Listen)
        .find(|entry| entry.local_address.port() == port)?
        .inode;
    process::socket_owner(inode)
}

fn explain_eafnosupport(sb: &mut StringBuffer, fd: RawFd, address: Option<&SocketAddress>) {
    let Some(address) = address else {
        sb.puts("the implementation does not support the specified address family");
        return;
    };
    sb.puts("the address family of the address given (");
    crate::flags::write_enum(sb, address.family(), crate::flags::SOCKET_DOMAINS);
    sb.puts(") does not match the socket");
    if let Some(SocketAddress::Inet(_) | SocketAddress::Inet6(_)) = fildes::socket_name(fd) {
        sb.puts(", which is an internet socket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::socket::{bind, socket, AddressFamily, SockFlag, SockType, SockaddrIn};
    use std::os::fd::AsRawFd;

    fn socket_text(errnum: i32, name: &str, fd: RawFd, address: Option<&SocketAddress>) -> String {
        let mut sb = StringBuffer::default();
        explain_socket(&mut sb, errnum, name, fd, address);
        sb.into_string()
    }

    #[test]
    fn unix_socket_file_left_behind() {
        let address = SocketAddress::parse("/tmp/left-behind.sock").unwrap();
        let text = socket_text(libc::EADDRINUSE, "bind", -1, Some(&address));
        assert!(text.starts_with("the socket file \"/tmp/left-behind.sock\" already exists"), "{text}");
    }

    #[test]
    fn already_bound_names_the_address() {
        let fd = socket(AddressFamily::Inet, SockType::Stream, SockFlag::empty(), None).unwrap();
        bind(fd.as_raw_fd(), &SockaddrIn::new(127, 0, 0, 1, 0)).unwrap();
        let text = socket_text(libc::EINVAL, "bind", fd.as_raw_fd(), None);
        assert!(text.starts_with("the socket is already bound to 127.0.0.1:"), "{text}");
    }

    #[test]
    fn bad_descriptor_falls_through_to_fildes() {
        let text = socket_text(libc::EBADF, "listen", 876_543, None);
        assert!(text.starts_with("fildes does not refer to an open file descriptor"), "{text}");
    }
}
