use crate::string_buffer::StringBuffer;
use nix::libc;

pub type Table = &'static [(i32, &'static str)];

// multi bit values come before the single bits they contain
pub static OPEN_FLAGS: Table = &[
    (libc::O_TMPFILE, "O_TMPFILE"),
    (libc::O_SYNC, "O_SYNC"),
    (libc::O_CREAT, "O_CREAT"),
    (libc::O_EXCL, "O_EXCL"),
    (libc::O_NOCTTY, "O_NOCTTY"),
    (libc::O_TRUNC, "O_TRUNC"),
    (libc::O_APPEND, "O_APPEND"),
    (libc::O_NONBLOCK, "O_NONBLOCK"),
    (libc::O_DSYNC, "O_DSYNC"),
    (libc::O_ASYNC, "O_ASYNC"),
    (libc::O_DIRECT, "O_DIRECT"),
    (libc::O_LARGEFILE, "O_LARGEFILE"),
    (libc::O_DIRECTORY, "O_DIRECTORY"),
    (libc::O_NOFOLLOW, "O_NOFOLLOW"),
    (libc::O_NOATIME, "O_NOATIME"),
    (libc::O_CLOEXEC, "O_CLOEXEC"),
    (libc::O_PATH, "O_PATH"),
];

pub static ACCESS_MODES: Table = &[
    (libc::O_RDONLY, "O_RDONLY"),
    (libc::O_WRONLY, "O_WRONLY"),
    (libc::O_RDWR, "O_RDWR"),
];

pub static ACCESS_CHECKS: Table = &[
    (libc::R_OK, "R_OK"),
    (libc::W_OK, "W_OK"),
    (libc::X_OK, "X_OK"),
];

pub static MMAP_PROT: Table = &[
    (libc::PROT_READ, "PROT_READ"),
    (libc::PROT_WRITE, "PROT_WRITE"),
    (libc::PROT_EXEC, "PROT_EXEC"),
];

pub static MMAP_FLAGS: Table = &[
    (0x03, "MAP_SHARED_VALIDATE"),
    (libc::MAP_SHARED, "MAP_SHARED"),
    (libc::MAP_PRIVATE, "MAP_PRIVATE"),
    (libc::MAP_FIXED, "MAP_FIXED"),
    (libc::MAP_ANONYMOUS, "MAP_ANONYMOUS"),
    (libc::MAP_GROWSDOWN, "MAP_GROWSDOWN"),
    (libc::MAP_DENYWRITE, "MAP_DENYWRITE"),
    (libc::MAP_EXECUTABLE, "MAP_EXECUTABLE"),
    (libc::MAP_LOCKED, "MAP_LOCKED"),
    (libc::MAP_NORESERVE, "MAP_NORESERVE"),
    (libc::MAP_POPULATE, "MAP_POPULATE"),
    (libc::MAP_NONBLOCK, "MAP_NONBLOCK"),
    (libc::MAP_STACK, "MAP_STACK"),
    (libc::MAP_HUGETLB, "MAP_HUGETLB"),
    (0x100000, "MAP_FIXED_NOREPLACE"),
];

pub static SOCKET_DOMAINS: Table = &[
    (libc::AF_UNSPEC, "AF_UNSPEC"),
    (libc::AF_UNIX, "AF_UNIX"),
    (libc::AF_INET, "AF_INET"),
    (libc::AF_INET6, "AF_INET6"),
    (libc::AF_NETLINK, "AF_NETLINK"),
    (libc::AF_PACKET, "AF_PACKET"),
];

pub static SOCKET_TYPES: Table = &[
    (libc::SOCK_STREAM, "SOCK_STREAM"),
    (libc::SOCK_DGRAM, "SOCK_DGRAM"),
    (libc::SOCK_RAW, "SOCK_RAW"),
    (libc::SOCK_RDM, "SOCK_RDM"),
    (libc::SOCK_SEQPACKET, "SOCK_SEQPACKET"),
];

pub static SOCKET_TYPE_FLAGS: Table = &[
    (libc::SOCK_NONBLOCK, "SOCK_NONBLOCK"),
    (libc::SOCK_CLOEXEC, "SOCK_CLOEXEC"),
];

pub static PROTOCOLS: Table = &[
    (libc::IPPROTO_ICMP, "IPPROTO_ICMP"),
    (libc::IPPROTO_TCP, "IPPROTO_TCP"),
    (libc::IPPROTO_UDP, "IPPROTO_UDP"),
    (libc::IPPROTO_ICMPV6, "IPPROTO_ICMPV6"),
    (libc::IPPROTO_RAW, "IPPROTO_RAW"),
];

pub static LSEEK_WHENCE: Table = &[
    (libc::SEEK_SET, "SEEK_SET"),
    (libc::SEEK_CUR, "SEEK_CUR"),
    (libc::SEEK_END, "SEEK_END"),
    (libc::SEEK_DATA, "SEEK_DATA"),
    (libc::SEEK_HOLE, "SEEK_HOLE"),
];

pub static WAIT_OPTIONS: Table = &[
    (libc::WNOHANG, "WNOHANG"),
    (libc::WUNTRACED, "WUNTRACED"),
    (libc::WCONTINUED, "WCONTINUED"),
];

/// Writes `value` as `A | B | 0x40`, `zero` when no bit is set.
pub fn write_flags(sb: &mut StringBuffer, value: i32, table: Table, zero: &str) {
    if value == 0 {
        sb.puts(zero);
        return;
    }
    let mut remaining = value;
    let mut first = true;
    for &(bits, name) in table {
        if bits != 0 && remaining & bits == bits {
            if !first {
                sb.puts(" | ");
            }
            sb.puts(name);
            remaining &= !bits;
            first = false;
        }
    }
    if remaining != 0 {
        if !first {
            sb.puts(" | ");
        }
        sb.printf(format_args!("{remaining:#x}"));
    }
}

/// Writes the name of an enumerated value, or the number if it has none.
pub fn write_enum(sb: &mut StringBuffer, value: i32, table: Table) {
    match table.iter().find(|(known, _)| *known == value) {
        Some((_, name)) => sb.puts(name),
        None => sb.printf(format_args!("{value}")),
    }
}

pub fn write_open_flags(sb: &mut StringBuffer, flags: i32) {
    write_enum(sb, flags & libc::O_ACCMODE, ACCESS_MODES);
    let rest = flags & !libc::O_ACCMODE;
    if rest != 0 {
        sb.puts(" | ");
        write_flags(sb, rest, OPEN_FLAGS, "0");
    }
}

pub fn write_socket_type(sb: &mut StringBuffer, kind: i32) {
    let flags = libc::SOCK_NONBLOCK | libc::SOCK_CLOEXEC;
    write_enum(sb, kind & !flags, SOCKET_TYPES);
    if kind & flags != 0 {
        sb.puts(" | ");
        write_flags(sb, kind & flags, SOCKET_TYPE_FLAGS, "0");
    }
}

/// Parses `O_RDONLY|O_CREAT` style text, numbers allowed as terms.
pub fn parse_flags(text: &str, tables: &[Table]) -> Option<i32> {
    let mut value = 0;
    for term in text.split(['|', '+']).map(str::trim) {
        if term.is_empty() {
            return None;
        }
        value |= match parse_number(term) {
            Some(number) => number,
            None => tables
                .iter()
                .flat_map(|table| table.iter())
                .find(|(_, name)| name.eq_ignore_ascii_case(term))
                .map(|(bits, _)| *bits)?,
        };
    }
    Some(value)
}

/// Decimal, `0x` hexadecimal or leading zero octal.
pub fn parse_number(text: &str) -> Option<i32> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value)
        .ok()
        .or_else(|| u32::try_from(value).ok().map(|bits| bits as i32))
}
