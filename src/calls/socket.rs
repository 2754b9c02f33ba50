use super::{Args, Call};
use crate::{
    capability::Capability,
    causes::{common, generic::explain_generic, path::explain_path, socket::explain_socket},
    flags,
    path_resolution::FinalComponent,
    render,
    sockaddr::SocketAddress,
    string_buffer::StringBuffer,
    types::FileType,
};
use nix::{libc, sys::socket::SockaddrLike};
use std::os::fd::RawFd;

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match call {
        Call::Socket { domain, kind, protocol } => {
            flags::write_enum(args.arg("domain"), *domain, flags::SOCKET_DOMAINS);
            flags::write_socket_type(args.arg("type"), *kind);
            flags::write_enum(args.arg("protocol"), *protocol, flags::PROTOCOLS);
        }
        Call::Bind { fildes, address } | Call::Connect { fildes, address } => {
            render::fildes(args.arg("fildes"), *fildes);
            let caption = if matches!(call, Call::Bind { .. }) { "sock_addr" } else { "serv_addr" };
            address.write(args.arg(caption));
            if let Some(storage) = address.to_storage() {
                args.arg(&format!("{caption}_size")).printf(format_args!("{}", storage.len()));
            }
        }
        Call::Listen { fildes, backlog } => {
            render::fildes(args.arg("fildes"), *fildes);
            args.arg("backlog").printf(format_args!("{backlog}"));
        }
        Call::Accept { fildes } => render::fildes(args.arg("fildes"), *fildes),
        _ => {}
    }
    args.finish();
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    match call {
        Call::Socket { domain, kind, protocol } => explain_socket_call(sb, errnum, *domain, *kind, *protocol),
        Call::Bind { fildes, address } => explain_bind(sb, errnum, *fildes, address),
        Call::Connect { fildes, address } => explain_connect(sb, errnum, *fildes, address),
        Call::Listen { fildes, .. } => match errnum {
            libc::EADDRINUSE => sb.puts("another socket is already listening on the same port"),
            _ => explain_socket(sb, errnum, "listen", *fildes, None),
        },
        Call::Accept { fildes } => match errnum {
            libc::ECONNABORTED => sb.puts("a connection has been aborted"),
            libc::EPERM => sb.puts("firewall rules forbid the connection"),
            libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM => {
                explain_generic(sb, errnum, "accept")
            }
            _ => explain_socket(sb, errnum, "accept", *fildes, None),
        },
        _ => {}
    }
}

fn explain_socket_call(sb: &mut StringBuffer, errnum: i32, domain: i32, kind: i32, protocol: i32) {
    match errnum {
        libc::EACCES => {
            sb.puts("permission to create a socket of the specified type and/or protocol is denied");
            if kind & !(libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC) == libc::SOCK_RAW {
                common::capability_note(sb, Capability::NetRaw);
            }
        }
        libc::EAFNOSUPPORT => {
            sb.puts("the implementation does not support the specified address family (");
            flags::write_enum(sb, domain, flags::SOCKET_DOMAINS);
            sb.putc(')');
        }
        libc::EINVAL => {
            sb.puts("unknown protocol, or protocol family not available, or invalid flags in type");
        }
        libc::EPROTONOSUPPORT => {
            sb.puts("the protocol type or the specified protocol (");
            flags::write_enum(sb, protocol, flags::PROTOCOLS);
            sb.puts(") is not supported within this domain");
        }
        libc::ESOCKTNOSUPPORT | libc::EPROTOTYPE => {
            sb.puts("the socket type (");
            flags::write_socket_type(sb, kind);
            sb.puts(") is not supported by the protocol");
        }
        _ => explain_generic(sb, errnum, "socket"),
    }
}

// AF_UNIX sockets live in the file system, so path errors name the path.
fn unix_path_errno(errnum: i32) -> bool {
    matches!(
        errnum,
        libc::ENOENT | libc::ENOTDIR | libc::ELOOP | libc::ENAMETOOLONG | libc::EROFS | libc::EACCES
    )
}

fn explain_bind(sb: &mut StringBuffer, errnum: i32, fd: RawFd, address: &SocketAddress) {
    if let SocketAddress::Unix(path) = address {
        if unix_path_errno(errnum) {
            let fc = FinalComponent {
                must_exist: false,
                must_not_exist: true,
                want_to_create: true,
                file_type: FileType::Socket,
                ..FinalComponent::default()
            };
            explain_path(sb, errnum, "bind", path, "sock_addr->sun_path", &fc);
            return;
        }
    }
    explain_socket(sb, errnum, "bind", fd, Some(address));
}

fn explain_connect(sb: &mut StringBuffer, errnum: i32, fd: RawFd, address: &SocketAddress) {
    if let SocketAddress::Unix(path) = address {
        if unix_path_errno(errnum) {
            let fc = FinalComponent {
                want_to_write: true,
                file_type: FileType::Socket,
                must_be_a: Some(FileType::Socket),
                ..FinalComponent::default()
            };
            explain_path(sb, errnum, "connect", path, "serv_addr->sun_path", &fc);
            return;
        }
    }
    match errnum {
        libc::EAGAIN => {
            sb.puts("no more free local ports or insufficient entries in the routing cache");
            sb.footnote().puts(
                "see the net.ipv4.ip_local_port_range sysctl in ip(7) for how to increase the number of local ports",
            );
        }
        _ => explain_socket(sb, errnum, "connect", fd, Some(address)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;

    #[test]
    fn socket_arguments_by_name() {
        let call = Call::Socket { domain: libc::AF_INET, kind: libc::SOCK_STREAM | libc::SOCK_CLOEXEC, protocol: 0 };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        assert_eq!(sb.as_str(), "socket(domain = AF_INET, type = SOCK_STREAM | SOCK_CLOEXEC, protocol = 0)");
    }

    #[test]
    fn connect_refused() {
        let call = Call::Connect { fildes: -1, address: SocketAddress::parse("127.0.0.1:9").unwrap() };
        let message = explain_errno(&call, libc::ECONNREFUSED);
        assert!(message.starts_with("connect(fildes = -1, serv_addr = { sin_family = AF_INET, sin_port = 9, sin_addr = 127.0.0.1 }, serv_addr_size = 16) failed"), "{message}");
        assert!(message.contains("is not listening for connections"), "{message}");
    }

    #[test]
    fn unix_socket_in_missing_directory() {
        let call = Call::Bind { fildes: -1, address: SocketAddress::parse("/nonexistent-dir/app.sock").unwrap() };
        let message = explain_errno(&call, libc::ENOENT);
        assert!(message.contains("\"nonexistent-dir\" directory"), "{message}");
    }
}
