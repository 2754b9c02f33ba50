use super::Call;
use crate::{
    errno_info,
    flags::{self, Table},
    fstrcmp::best_match,
    identity,
    render,
    sockaddr::SocketAddress,
    types::Family,
};
use nix::libc;
use std::path::Path;
use thiserror::Error;

/// How one argument is written on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Path,
    Fildes,
    OpenFlags,
    Mode,
    AccessMode,
    Integer,
    Size,
    Pointer,
    Whence,
    Domain,
    SocketType,
    Protocol,
    Address,
    Signal,
    Uid,
    Gid,
    WaitOptions,
    MmapProt,
    MmapFlags,
    Text,
    Flag,
    // the rest of the words
    Argv,
}

impl ArgKind {
    pub fn describe(self) -> &'static str {
        match self {
            ArgKind::Path => "pathname",
            ArgKind::Fildes => "file descriptor",
            ArgKind::OpenFlags => "O_* flags",
            ArgKind::Mode => "octal mode",
            ArgKind::AccessMode => "R_OK|W_OK|X_OK",
            ArgKind::Integer => "integer",
            ArgKind::Size => "size",
            ArgKind::Pointer => "address",
            ArgKind::Whence => "SEEK_*",
            ArgKind::Domain => "AF_*",
            ArgKind::SocketType => "SOCK_*",
            ArgKind::Protocol => "IPPROTO_*",
            ArgKind::Address => "socket address",
            ArgKind::Signal => "signal",
            ArgKind::Uid => "user",
            ArgKind::Gid => "group",
            ArgKind::WaitOptions => "W* flags",
            ArgKind::MmapProt => "PROT_* flags",
            ArgKind::MmapFlags => "MAP_* flags",
            ArgKind::Text => "string",
            ArgKind::Flag => "0 or 1",
            ArgKind::Argv => "words...",
        }
    }
}

pub struct CallSpec {
    pub name: &'static str,
    pub family: Family,
    pub args: &'static [(&'static str, ArgKind)],
    /// arguments after this many may be left off
    pub required: usize,
}

impl CallSpec {
    /// `open pathname flags [mode]`
    pub fn usage(&self) -> String {
        let mut usage = self.name.to_owned();
        for (index, (name, kind)) in self.args.iter().enumerate() {
            usage.push(' ');
            match (*kind, index < self.required) {
                (ArgKind::Argv, _) => usage.push_str(&format!("{name}...")),
                (_, true) => usage.push_str(name),
                (_, false) => usage.push_str(&format!("[{name}]")),
            }
        }
        usage
    }

    fn takes_rest(&self) -> bool {
        matches!(self.args.last(), Some((_, ArgKind::Argv)))
    }
}

macro_rules! call_spec {
    ($name:literal, $family:ident, $required:literal, [$(($arg:literal, $kind:ident)),* $(,)?]) => {
        CallSpec {
            name: $name,
            family: Family::$family,
            args: &[$(($arg, ArgKind::$kind)),*],
            required: $required,
        }
    };
}

pub static CALLS: &[CallSpec] = &[
    call_spec!("open", Path, 2, [("pathname", Path), ("flags", OpenFlags), ("mode", Mode)]),
    call_spec!("openat", Path, 3, [("dirfd", Fildes), ("pathname", Path), ("flags", OpenFlags), ("mode", Mode)]),
    call_spec!("creat", Path, 1, [("pathname", Path), ("mode", Mode)]),
    call_spec!("fopen", Path, 2, [("pathname", Path), ("flags", Text)]),
    call_spec!("access", Path, 2, [("pathname", Path), ("mode", AccessMode)]),
    call_spec!("stat", Path, 1, [("pathname", Path)]),
    call_spec!("lstat", Path, 1, [("pathname", Path)]),
    call_spec!("mkdir", Path, 1, [("pathname", Path), ("mode", Mode)]),
    call_spec!("rmdir", Path, 1, [("pathname", Path)]),
    call_spec!("unlink", Path, 1, [("pathname", Path)]),
    call_spec!("rename", Path, 2, [("oldpath", Path), ("newpath", Path)]),
    call_spec!("link", Path, 2, [("oldpath", Path), ("newpath", Path)]),
    call_spec!("symlink", Path, 2, [("target", Path), ("linkpath", Path)]),
    call_spec!("readlink", Path, 1, [("pathname", Path), ("data_size", Size)]),
    call_spec!("chdir", Path, 1, [("pathname", Path)]),
    call_spec!("chmod", Path, 2, [("pathname", Path), ("mode", Mode)]),
    call_spec!("chown", Path, 3, [("pathname", Path), ("owner", Uid), ("group", Gid)]),
    call_spec!("lchown", Path, 3, [("pathname", Path), ("owner", Uid), ("group", Gid)]),
    call_spec!("truncate", Path, 2, [("pathname", Path), ("length", Integer)]),
    call_spec!("opendir", Path, 1, [("pathname", Path)]),
    call_spec!("realpath", Path, 1, [("pathname", Path)]),
    call_spec!("chroot", Path, 1, [("pathname", Path)]),
    call_spec!("read", FileDescriptor, 1, [("fildes", Fildes), ("data", Pointer), ("data_size", Size)]),
    call_spec!("write", FileDescriptor, 1, [("fildes", Fildes), ("data", Pointer), ("data_size", Size)]),
    call_spec!("close", FileDescriptor, 1, [("fildes", Fildes)]),
    call_spec!("dup", FileDescriptor, 1, [("fildes", Fildes)]),
    call_spec!("dup2", FileDescriptor, 2, [("oldfd", Fildes), ("newfd", Fildes)]),
    call_spec!("lseek", FileDescriptor, 3, [("fildes", Fildes), ("offset", Integer), ("whence", Whence)]),
    call_spec!("fstat", FileDescriptor, 1, [("fildes", Fildes)]),
    call_spec!("fsync", FileDescriptor, 1, [("fildes", Fildes)]),
    call_spec!("ftruncate", FileDescriptor, 2, [("fildes", Fildes), ("length", Integer)]),
    call_spec!("fchmod", FileDescriptor, 2, [("fildes", Fildes), ("mode", Mode)]),
    call_spec!("fchdir", FileDescriptor, 1, [("fildes", Fildes)]),
    call_spec!("pipe", FileDescriptor, 0, [("fildes", Pointer)]),
    call_spec!("socket", Network, 2, [("domain", Domain), ("type", SocketType), ("protocol", Protocol)]),
    call_spec!("bind", Network, 2, [("fildes", Fildes), ("sock_addr", Address)]),
    call_spec!("connect", Network, 2, [("fildes", Fildes), ("serv_addr", Address)]),
    call_spec!("listen", Network, 1, [("fildes", Fildes), ("backlog", Integer)]),
    call_spec!("accept", Network, 1, [("fildes", Fildes)]),
    call_spec!("execve", Process, 1, [("pathname", Path), ("argv", Argv)]),
    call_spec!("execvp", Process, 1, [("pathname", Text), ("argv", Argv)]),
    call_spec!("fork", Process, 0, []),
    call_spec!("kill", Process, 2, [("pid", Integer), ("sig", Signal)]),
    call_spec!("waitpid", Process, 1, [("pid", Integer), ("options", WaitOptions)]),
    call_spec!("setpgid", Process, 2, [("pid", Integer), ("pgid", Integer)]),
    call_spec!("setuid", Process, 1, [("uid", Uid)]),
    call_spec!("mmap", Memory, 4, [
        ("addr", Pointer),
        ("length", Size),
        ("prot", MmapProt),
        ("flags", MmapFlags),
        ("fildes", Fildes),
        ("offset", Integer),
    ]),
    call_spec!("munmap", Memory, 2, [("addr", Pointer), ("length", Size)]),
    call_spec!("malloc", Memory, 1, [("size", Size)]),
    call_spec!("calloc", Memory, 2, [("nmemb", Size), ("size", Size)]),
    call_spec!("setenv", Environment, 2, [("name", Text), ("value", Text), ("overwrite", Flag)]),
    call_spec!("unsetenv", Environment, 1, [("name", Text)]),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown call {name:?}{}", did_you_mean(.suggestion))]
    UnknownCall { name: String, suggestion: Option<&'static str> },
    #[error("wrong number of arguments ({given}), usage: {usage}")]
    ArgumentCount { usage: String, given: usize },
    #[error("{arg}: {text:?} is not a valid {expected}")]
    BadValue { arg: &'static str, text: String, expected: &'static str },
    #[error("unknown errno {text:?}{}", did_you_mean(.suggestion))]
    BadErrno { text: String, suggestion: Option<&'static str> },
}

fn did_you_mean(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(name) => format!(", did you mean {name:?}?"),
        None => String::new(),
    }
}

pub fn lookup(name: &str) -> Result<&'static CallSpec, ParseError> {
    CALLS.iter().find(|spec| spec.name == name).ok_or_else(|| ParseError::UnknownCall {
        name: name.to_owned(),
        suggestion: best_match(name, CALLS.iter().map(|spec| spec.name), 0.6),
    })
}

/// An errno given by name (`ENOENT`, case insensitive) or by number.
pub fn parse_errno(text: &str) -> Result<i32, ParseError> {
    if let Some(number) = flags::parse_number(text) {
        return Ok(number);
    }
    match errno_info::by_name(text) {
        Some(info) => Ok(info.number),
        None => Err(ParseError::BadErrno {
            text: text.to_owned(),
            suggestion: best_match(&text.to_ascii_uppercase(), errno_info::names(), 0.6),
        }),
    }
}

/// Builds the call `name` from its command line arguments, which the call
/// borrows.
pub fn parse<'a>(name: &str, words: &'a [String]) -> Result<Call<'a>, ParseError> {
    let spec = lookup(name)?;
    let maximum = if spec.takes_rest() { usize::MAX } else { spec.args.len() };
    if words.len() < spec.required || words.len() > maximum {
        return Err(ParseError::ArgumentCount { usage: spec.usage(), given: words.len() });
    }
    let p = Words { spec, words };
    let call = match spec.name {
        "open" => Call::Open { pathname: p.path(0), flags: p.flags(1)?, mode: p.mode(2)? },
        "openat" => Call::Openat {
            dirfd: p.fildes(0)?,
            pathname: p.path(1),
            flags: p.flags(2)?,
            mode: p.mode(3)?,
        },
        "creat" => Call::Creat { pathname: p.path(0), mode: p.mode(1)? },
        "fopen" => Call::Fopen { pathname: p.path(0), mode: p.text(1) },
        "access" => Call::Access { pathname: p.path(0), mode: p.flags(1)? },
        "stat" => Call::Stat { pathname: p.path(0) },
        "lstat" => Call::Lstat { pathname: p.path(0) },
        "mkdir" => Call::Mkdir { pathname: p.path(0), mode: p.mode(1)? },
        "rmdir" => Call::Rmdir { pathname: p.path(0) },
        "unlink" => Call::Unlink { pathname: p.path(0) },
        "rename" => Call::Rename { oldpath: p.path(0), newpath: p.path(1) },
        "link" => Call::Link { oldpath: p.path(0), newpath: p.path(1) },
        "symlink" => Call::Symlink { target: p.path(0), linkpath: p.path(1) },
        "readlink" => Call::Readlink { pathname: p.path(0), data_size: p.size(1)? },
        "chdir" => Call::Chdir { pathname: p.path(0) },
        "chmod" => Call::Chmod { pathname: p.path(0), mode: p.mode(1)? },
        "chown" => Call::Chown { pathname: p.path(0), owner: p.uid(1)?, group: p.gid(2)? },
        "lchown" => Call::Lchown { pathname: p.path(0), owner: p.uid(1)?, group: p.gid(2)? },
        "truncate" => Call::Truncate { pathname: p.path(0), length: p.integer(1)? },
        "opendir" => Call::Opendir { pathname: p.path(0) },
        "realpath" => Call::Realpath { pathname: p.path(0) },
        "chroot" => Call::Chroot { pathname: p.path(0) },
        "read" => Call::Read { fildes: p.fildes(0)?, data: p.size(1)?, data_size: p.size(2)? },
        "write" => Call::Write { fildes: p.fildes(0)?, data: p.size(1)?, data_size: p.size(2)? },
        "close" => Call::Close { fildes: p.fildes(0)? },
        "dup" => Call::Dup { fildes: p.fildes(0)? },
        "dup2" => Call::Dup2 { oldfd: p.fildes(0)?, newfd: p.fildes(1)? },
        "lseek" => Call::Lseek { fildes: p.fildes(0)?, offset: p.integer(1)?, whence: p.flags(2)? },
        "fstat" => Call::Fstat { fildes: p.fildes(0)? },
        "fsync" => Call::Fsync { fildes: p.fildes(0)? },
        "ftruncate" => Call::Ftruncate { fildes: p.fildes(0)?, length: p.integer(1)? },
        "fchmod" => Call::Fchmod { fildes: p.fildes(0)?, mode: p.mode(1)? },
        "fchdir" => Call::Fchdir { fildes: p.fildes(0)? },
        "pipe" => Call::Pipe { fildes: p.size(0)? },
        "socket" => Call::Socket { domain: p.flags(0)?, kind: p.flags(1)?, protocol: p.flags(2)? },
        "bind" => Call::Bind { fildes: p.fildes(0)?, address: p.address(1)? },
        "connect" => Call::Connect { fildes: p.fildes(0)?, address: p.address(1)? },
        "listen" => Call::Listen { fildes: p.fildes(0)?, backlog: p.small(1)? },
        "accept" => Call::Accept { fildes: p.fildes(0)? },
        "execve" => Call::Execve { pathname: p.path(0), argv: p.rest(1), envp: &[] },
        "execvp" => Call::Execvp { file: p.text(0), argv: p.rest(1) },
        "fork" => Call::Fork,
        "kill" => Call::Kill { pid: p.small(0)?, sig: p.signal(1)? },
        "waitpid" => Call::Waitpid { pid: p.small(0)?, options: p.flags(1)? },
        "setpgid" => Call::Setpgid { pid: p.small(0)?, pgid: p.small(1)? },
        "setuid" => Call::Setuid { uid: p.uid(0)? },
        "mmap" => Call::Mmap {
            addr: p.size(0)?,
            length: p.size(1)?,
            prot: p.flags(2)?,
            flags: p.flags(3)?,
            fildes: match p.word(4) {
                Some(_) => p.fildes(4)?,
                None => -1,
            },
            offset: p.integer(5)?,
        },
        "munmap" => Call::Munmap { addr: p.size(0)?, length: p.size(1)? },
        "malloc" => Call::Malloc { size: p.size(0)? },
        "calloc" => Call::Calloc { nmemb: p.size(0)?, size: p.size(1)? },
        "setenv" => Call::Setenv { name: p.text(0), value: p.text(1), overwrite: p.flag(2)? },
        "unsetenv" => Call::Unsetenv { name: p.text(0) },
        other => {
            return Err(ParseError::UnknownCall { name: other.to_owned(), suggestion: None });
        }
    };
    tracing::debug!(call = spec.name, words = words.len(), "parsed");
    Ok(call)
}

/// The command line words of one call, read by position against its spec.
/// Positions past the words given read as zero.
struct Words<'s, 'a> {
    spec: &'s CallSpec,
    words: &'a [String],
}

impl<'a> Words<'_, 'a> {
    fn word(&self, index: usize) -> Option<&'a str> {
        self.words.get(index).map(String::as_str)
    }

    fn bad(&self, index: usize) -> ParseError {
        let (arg, kind) = self.spec.args[index];
        ParseError::BadValue {
            arg,
            text: self.word(index).unwrap_or_default().to_owned(),
            expected: kind.describe(),
        }
    }

    fn text(&self, index: usize) -> &'a str {
        self.word(index).unwrap_or_default()
    }

    fn path(&self, index: usize) -> &'a Path {
        Path::new(self.text(index))
    }

    fn rest(&self, index: usize) -> &'a [String] {
        self.words.get(index..).unwrap_or_default()
    }

    fn integer(&self, index: usize) -> Result<i64, ParseError> {
        let Some(word) = self.word(index) else {
            return Ok(0);
        };
        word.parse::<i64>()
            .ok()
            .or_else(|| flags::parse_number(word).map(i64::from))
            .ok_or_else(|| self.bad(index))
    }

    fn small(&self, index: usize) -> Result<i32, ParseError> {
        let value = self.integer(index)?;
        i32::try_from(value).map_err(|_| self.bad(index))
    }

    fn size(&self, index: usize) -> Result<usize, ParseError> {
        let Some(word) = self.word(index) else {
            return Ok(0);
        };
        if word.eq_ignore_ascii_case("NULL") {
            return Ok(0);
        }
        let parsed = match word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
            Some(hex) => usize::from_str_radix(hex, 16),
            None => word.parse::<usize>(),
        };
        parsed.map_err(|_| self.bad(index))
    }

    fn fildes(&self, index: usize) -> Result<i32, ParseError> {
        match self.word(index) {
            Some(word) if word.eq_ignore_ascii_case("AT_FDCWD") => Ok(libc::AT_FDCWD),
            Some("stdin") => Ok(libc::STDIN_FILENO),
            Some("stdout") => Ok(libc::STDOUT_FILENO),
            Some("stderr") => Ok(libc::STDERR_FILENO),
            _ => self.small(index),
        }
    }

    fn mode(&self, index: usize) -> Result<u32, ParseError> {
        let Some(word) = self.word(index) else {
            return Ok(0);
        };
        let digits = word.strip_prefix("0o").unwrap_or(word);
        u32::from_str_radix(digits, 8).map_err(|_| self.bad(index))
    }

    /// Flag words, names or numbers joined with `|`, per the table for
    /// the argument's kind.
    fn flags(&self, index: usize) -> Result<i32, ParseError> {
        let Some(word) = self.word(index) else {
            return Ok(0);
        };
        let (tables, zero): (Vec<Table>, &str) = match self.spec.args[index].1 {
            ArgKind::OpenFlags => (vec![flags::ACCESS_MODES, flags::OPEN_FLAGS], ""),
            ArgKind::AccessMode => (vec![flags::ACCESS_CHECKS], "F_OK"),
            ArgKind::Whence => (vec![flags::LSEEK_WHENCE], ""),
            ArgKind::Domain => (vec![flags::SOCKET_DOMAINS], ""),
            ArgKind::SocketType => (vec![flags::SOCKET_TYPES, flags::SOCKET_TYPE_FLAGS], ""),
            ArgKind::Protocol => (vec![flags::PROTOCOLS], ""),
            ArgKind::WaitOptions => (vec![flags::WAIT_OPTIONS], ""),
            ArgKind::MmapProt => (vec![flags::MMAP_PROT], "PROT_NONE"),
            ArgKind::MmapFlags => (vec![flags::MMAP_FLAGS], ""),
            _ => (Vec::new(), ""),
        };
        if !zero.is_empty() && word.eq_ignore_ascii_case(zero) {
            return Ok(0);
        }
        flags::parse_flags(word, &tables).ok_or_else(|| self.bad(index))
    }

    fn address(&self, index: usize) -> Result<SocketAddress, ParseError> {
        SocketAddress::parse(self.text(index)).ok_or_else(|| self.bad(index))
    }

    fn signal(&self, index: usize) -> Result<i32, ParseError> {
        render::parse_signal(self.text(index)).ok_or_else(|| self.bad(index))
    }

    fn uid(&self, index: usize) -> Result<u32, ParseError> {
        let word = self.text(index);
        if word == "-1" {
            return Ok(u32::MAX);
        }
        word.parse::<u32>()
            .ok()
            .or_else(|| identity::user_id(word))
            .ok_or_else(|| self.bad(index))
    }

    fn gid(&self, index: usize) -> Result<u32, ParseError> {
        let word = self.text(index);
        if word == "-1" {
            return Ok(u32::MAX);
        }
        word.parse::<u32>()
            .ok()
            .or_else(|| identity::group_id(word))
            .ok_or_else(|| self.bad(index))
    }

    fn flag(&self, index: usize) -> Result<bool, ParseError> {
        match self.word(index) {
            None | Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(_) => Err(self.bad(index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;

    fn words(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_owned).collect()
    }

    // a plausible word for each kind of argument
    fn sample(kind: ArgKind) -> &'static str {
        match kind {
            ArgKind::Path => "/nonexistent/file",
            ArgKind::Fildes => "-1",
            ArgKind::OpenFlags => "O_RDONLY",
            ArgKind::Mode => "644",
            ArgKind::AccessMode => "R_OK",
            ArgKind::Integer => "1",
            ArgKind::Size => "4096",
            ArgKind::Pointer => "NULL",
            ArgKind::Whence => "SEEK_SET",
            ArgKind::Domain => "AF_INET",
            ArgKind::SocketType => "SOCK_STREAM",
            ArgKind::Protocol => "0",
            ArgKind::Address => "127.0.0.1:1",
            ArgKind::Signal => "SIGTERM",
            ArgKind::Uid | ArgKind::Gid => "0",
            ArgKind::WaitOptions => "0",
            ArgKind::MmapProt => "PROT_READ",
            ArgKind::MmapFlags => "MAP_PRIVATE",
            ArgKind::Text => "r",
            ArgKind::Flag => "1",
            ArgKind::Argv => "arg",
        }
    }

    #[test]
    fn every_call_explains_every_common_errno() {
        let errnos = [
            libc::EPERM,
            libc::ENOENT,
            libc::EINTR,
            libc::EIO,
            libc::EBADF,
            libc::EAGAIN,
            libc::ENOMEM,
            libc::EACCES,
            libc::EFAULT,
            libc::EINVAL,
            libc::ENOSPC,
            libc::ENOSYS,
        ];
        for spec in CALLS {
            let words: Vec<String> = spec.args.iter().map(|(_, kind)| sample(*kind).to_owned()).collect();
            let call = parse(spec.name, &words).unwrap_or_else(|error| panic!("{}: {error}", spec.name));
            assert_eq!(call.name(), spec.name);
            assert_eq!(call.family(), spec.family);
            for errnum in errnos {
                let message = explain_errno(&call, errnum);
                assert!(message.starts_with(spec.name), "{message}");
                assert!(message.contains(" failed, "), "{message}");
            }
        }
    }

    #[test]
    fn optional_arguments_default_to_zero() {
        let args = words("/etc/passwd O_RDONLY");
        let Call::Open { flags, mode, .. } = parse("open", &args).unwrap() else {
            panic!("not an open call");
        };
        assert_eq!(flags, libc::O_RDONLY);
        assert_eq!(mode, 0);
    }

    #[test]
    fn flag_words_combine() {
        let args = words("x O_WRONLY|O_CREAT|O_TRUNC 0644");
        let Call::Open { flags, mode, .. } = parse("open", &args).unwrap() else {
            panic!("not an open call");
        };
        assert_eq!(flags, libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC);
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn misspelled_call_gets_a_suggestion() {
        let error = parse("unlnk", &[]).unwrap_err();
        assert_eq!(error, ParseError::UnknownCall { name: "unlnk".into(), suggestion: Some("unlink") });
        assert_eq!(error.to_string(), "unknown call \"unlnk\", did you mean \"unlink\"?");
    }

    #[test]
    fn argument_count_shows_usage() {
        let error = parse("rename", &words("only-one")).unwrap_err();
        assert_eq!(error.to_string(), "wrong number of arguments (1), usage: rename oldpath newpath");
    }

    #[test]
    fn bad_values_name_the_argument() {
        let error = parse("kill", &words("12 SIGNOTHING")).unwrap_err();
        assert!(matches!(error, ParseError::BadValue { arg: "sig", .. }), "{error}");
    }

    #[test]
    fn errnos_by_name_or_number() {
        assert_eq!(parse_errno("ENOENT"), Ok(libc::ENOENT));
        assert_eq!(parse_errno("enoent"), Ok(libc::ENOENT));
        assert_eq!(parse_errno("13"), Ok(libc::EACCES));
        let Err(ParseError::BadErrno { suggestion, .. }) = parse_errno("ENOENTT") else {
            panic!("misspelling accepted");
        };
        assert_eq!(suggestion, Some("ENOENT"));
    }

    #[test]
    fn execvp_takes_the_rest_as_argv() {
        let args = words("ls ls -l /tmp");
        let Call::Execvp { file, argv } = parse("execvp", &args).unwrap() else {
            panic!("not an execvp call");
        };
        assert_eq!(file, "ls");
        assert_eq!(argv, &args[1..]);
    }

    #[test]
    fn usage_marks_optional_arguments() {
        assert_eq!(lookup("open").unwrap().usage(), "open pathname flags [mode]");
        assert_eq!(lookup("execvp").unwrap().usage(), "execvp pathname argv...");
    }
}
