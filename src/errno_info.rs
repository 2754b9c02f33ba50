use crate::{options::options, string_buffer::StringBuffer};
use nix::libc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrnoInfo {
    pub number: i32,
    pub name: &'static str,
    pub description: &'static str,
}

macro_rules! userland_errnos {
    ($($name:ident),* $(,)?) => {
        static USERLAND: &[(i32, &str)] = &[$((libc::$name, stringify!($name))),*];
    };
}

userland_errnos! {
    EPERM, ENOENT, ESRCH, EINTR, EIO, ENXIO, E2BIG, ENOEXEC, EBADF, ECHILD,
    EAGAIN, ENOMEM, EACCES, EFAULT, ENOTBLK, EBUSY, EEXIST, EXDEV, ENODEV,
    ENOTDIR, EISDIR, EINVAL, ENFILE, EMFILE, ENOTTY, ETXTBSY, EFBIG, ENOSPC,
    ESPIPE, EROFS, EMLINK, EPIPE, EDOM, ERANGE, EDEADLK, ENAMETOOLONG, ENOLCK,
    ENOSYS, ENOTEMPTY, ELOOP, ENOMSG, EIDRM, ECHRNG, EL2NSYNC, EL3HLT, EL3RST,
    ELNRNG, EUNATCH, ENOCSI, EL2HLT, EBADE, EBADR, EXFULL, ENOANO, EBADRQC,
    EBADSLT, EBFONT, ENOSTR, ENODATA, ETIME, ENOSR, ENONET, ENOPKG, EREMOTE,
    ENOLINK, EADV, ESRMNT, ECOMM, EPROTO, EMULTIHOP, EDOTDOT, EBADMSG,
    EOVERFLOW, ENOTUNIQ, EBADFD, EREMCHG, ELIBACC, ELIBBAD, ELIBSCN, ELIBMAX,
    ELIBEXEC, EILSEQ, ERESTART, ESTRPIPE, EUSERS, ENOTSOCK, EDESTADDRREQ,
    EMSGSIZE, EPROTOTYPE, ENOPROTOOPT, EPROTONOSUPPORT, ESOCKTNOSUPPORT,
    EOPNOTSUPP, EPFNOSUPPORT, EAFNOSUPPORT, EADDRINUSE, EADDRNOTAVAIL, ENETDOWN,
    ENETUNREACH, ENETRESET, ECONNABORTED, ECONNRESET, ENOBUFS, EISCONN,
    ENOTCONN, ESHUTDOWN, ETOOMANYREFS, ETIMEDOUT, ECONNREFUSED, EHOSTDOWN,
    EHOSTUNREACH, EALREADY, EINPROGRESS, ESTALE, EUCLEAN, ENOTNAM, ENAVAIL,
    EISNAM, EREMOTEIO, EDQUOT, ENOMEDIUM, EMEDIUMTYPE, ECANCELED, ENOKEY,
    EKEYEXPIRED, EKEYREVOKED, EKEYREJECTED, EOWNERDEAD, ENOTRECOVERABLE,
    ERFKILL, EHWPOISON,
}

// alternative spellings, accepted by name but never produced
static ALIASES: &[(&str, i32)] = &[
    ("EWOULDBLOCK", libc::EWOULDBLOCK),
    ("EDEADLOCK", libc::EDEADLOCK),
    ("ENOTSUP", libc::ENOTSUP),
];

/// Kernel side errnos, not visible to userland but seen by tracers.
pub mod kernel {
    use super::ErrnoInfo;

    pub const ERESTARTSYS: i32 = 512;
    pub const ERESTARTNOINTR: i32 = 513;
    pub const ERESTARTNOHAND: i32 = 514;
    pub const ENOIOCTLCMD: i32 = 515;
    pub const ERESTART_RESTARTBLOCK: i32 = 516;
    pub const EPROBE_DEFER: i32 = 517;
    pub const EOPENSTALE: i32 = 518;
    pub const ENOPARAM: i32 = 519;
    pub const EBADHANDLE: i32 = 521;
    pub const ENOTSYNC: i32 = 522;
    pub const EBADCOOKIE: i32 = 523;
    pub const ENOTSUPP: i32 = 524;
    pub const ETOOSMALL: i32 = 525;
    pub const ESERVERFAULT: i32 = 526;
    pub const EBADTYPE: i32 = 527;
    pub const EJUKEBOX: i32 = 528;
    pub const EIOCBQUEUED: i32 = 529;
    pub const ERECALLCONFLICT: i32 = 530;
    pub const ENOGRACE: i32 = 531;

    macro_rules! kernel_errno {
        ($name:ident, $description:expr) => {
            ErrnoInfo {
                number: $name,
                name: stringify!($name),
                description: $description,
            }
        };
    }

    pub(super) static TABLE: &[ErrnoInfo] = &[
        // restarted unless a handler without SA_RESTART turns it into EINTR
        kernel_errno!(
            ERESTARTSYS,
            "Interrupted by a signal, restart if it has no handler or a SA_RESTART handler exists"
        ),
        kernel_errno!(ERESTARTNOINTR, "Interrupted by a signal, restart always"),
        kernel_errno!(ERESTARTNOHAND, "Interrupted by a signal, restart if it has no handler"),
        kernel_errno!(ENOIOCTLCMD, "No ioctl command"),
        kernel_errno!(
            ERESTART_RESTARTBLOCK,
            "Interrupted by a signal, restart by calling restart_syscall"
        ),
        kernel_errno!(EPROBE_DEFER, "Driver requests probe retry"),
        kernel_errno!(EOPENSTALE, "Open found a stale dentry"),
        kernel_errno!(ENOPARAM, "Parameter not supported"),
        kernel_errno!(EBADHANDLE, "Illegal NFS file handle"),
        kernel_errno!(ENOTSYNC, "Update synchronization mismatch"),
        kernel_errno!(EBADCOOKIE, "Cookie is stale"),
        kernel_errno!(ENOTSUPP, "Operation is not supported"),
        kernel_errno!(ETOOSMALL, "Buffer or request is too small"),
        kernel_errno!(ESERVERFAULT, "An untranslatable error occurred"),
        kernel_errno!(EBADTYPE, "Type not supported by server"),
        kernel_errno!(
            EJUKEBOX,
            "Request initiated, but will not complete before timeout"
        ),
        kernel_errno!(EIOCBQUEUED, "iocb queued, will get completion event"),
        kernel_errno!(ERECALLCONFLICT, "Conflict with recalled state"),
        kernel_errno!(ENOGRACE, "NFS file lock reclaim refused"),
    ];
}

pub fn lookup(number: i32) -> Option<ErrnoInfo> {
    if let Some(&(number, name)) = USERLAND.iter().find(|(n, _)| *n == number) {
        return Some(ErrnoInfo {
            number,
            name,
            description: nix::errno::Errno::from_raw(number).desc(),
        });
    }
    kernel::TABLE.iter().find(|info| info.number == number).copied()
}

/// Case insensitive lookup by symbolic name, aliases included.
pub fn by_name(name: &str) -> Option<ErrnoInfo> {
    let name = name.to_ascii_uppercase();
    if let Some(&(_, number)) = ALIASES.iter().find(|(alias, _)| *alias == name) {
        return lookup(number);
    }
    if let Some(&(number, _)) = USERLAND.iter().find(|(_, n)| *n == name) {
        return lookup(number);
    }
    kernel::TABLE.iter().find(|info| info.name == name).copied()
}

/// Every symbolic name [`by_name`] accepts.
pub fn names() -> impl Iterator<Item = &'static str> {
    USERLAND
        .iter()
        .map(|(_, name)| *name)
        .chain(ALIASES.iter().map(|(name, _)| *name))
        .chain(kernel::TABLE.iter().map(|info| info.name))
}

pub fn name(number: i32) -> Option<&'static str> {
    lookup(number).map(|info| info.name)
}

/// The description of `number`, from the C library unless the
/// `internal-strerror` option asks for the built in table.
pub fn strerror(number: i32) -> String {
    if options().internal_strerror || number >= kernel::ERESTARTSYS {
        if let Some(info) = lookup(number) {
            return info.description.to_owned();
        }
    }
    errno::Errno(number).to_string()
}

/// `description (number, NAME)`, without the number when the
/// `numeric-errno` option is off.
pub fn strerror_text(number: i32) -> String {
    let description = strerror(number);
    match (options().numeric_errno, name(number)) {
        (true, Some(name)) => format!("{description} ({number}, {name})"),
        (true, None) => format!("{description} ({number})"),
        (false, Some(name)) => format!("{description} ({name})"),
        (false, None) => description,
    }
}

pub fn write_strerror(sb: &mut StringBuffer, number: i32) {
    sb.puts(&strerror_text(number));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_number() {
        let info = lookup(libc::ENOENT).unwrap();
        assert_eq!(info.name, "ENOENT");
        assert_eq!(info.description, "No such file or directory");
        assert_eq!(lookup(kernel::ERESTARTSYS).unwrap().name, "ERESTARTSYS");
        assert!(lookup(100_000).is_none());
    }

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        assert_eq!(by_name("eacces").unwrap().number, libc::EACCES);
        assert_eq!(by_name("EWOULDBLOCK").unwrap().name, "EAGAIN");
        assert!(by_name("ENOTANERRNO").is_none());
    }

    #[test]
    fn primary_name_wins_over_alias() {
        assert_eq!(name(libc::EAGAIN), Some("EAGAIN"));
        assert_eq!(name(libc::EOPNOTSUPP), Some("EOPNOTSUPP"));
    }

    #[test]
    fn strerror_text_carries_number_and_name() {
        let mut sb = StringBuffer::default();
        write_strerror(&mut sb, libc::EACCES);
        assert!(sb.as_str().ends_with("(13, EACCES)"), "{}", sb);
        assert_eq!(strerror_text(libc::ENOENT), "No such file or directory (2, ENOENT)");
    }
}
