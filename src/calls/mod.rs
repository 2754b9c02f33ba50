pub mod environ;
pub mod fildes;
pub mod memory;
pub mod path;
pub mod process;
pub mod socket;
pub mod table;

use crate::{
    explanation::Explanation,
    sockaddr::SocketAddress,
    string_buffer::StringBuffer,
    types::Family,
};
use std::{os::fd::RawFd, path::Path};

/// A call, with the arguments it was given.
#[derive(Clone, Debug)]
pub enum Call<'a> {
    Open { pathname: &'a Path, flags: i32, mode: u32 },
    Openat { dirfd: RawFd, pathname: &'a Path, flags: i32, mode: u32 },
    Creat { pathname: &'a Path, mode: u32 },
    Fopen { pathname: &'a Path, mode: &'a str },
    Access { pathname: &'a Path, mode: i32 },
    Stat { pathname: &'a Path },
    Lstat { pathname: &'a Path },
    Mkdir { pathname: &'a Path, mode: u32 },
    Rmdir { pathname: &'a Path },
    Unlink { pathname: &'a Path },
    Rename { oldpath: &'a Path, newpath: &'a Path },
    Link { oldpath: &'a Path, newpath: &'a Path },
    Symlink { target: &'a Path, linkpath: &'a Path },
    Readlink { pathname: &'a Path, data_size: usize },
    Chdir { pathname: &'a Path },
    Chmod { pathname: &'a Path, mode: u32 },
    Chown { pathname: &'a Path, owner: u32, group: u32 },
    Lchown { pathname: &'a Path, owner: u32, group: u32 },
    Truncate { pathname: &'a Path, length: i64 },
    Opendir { pathname: &'a Path },
    Realpath { pathname: &'a Path },
    Chroot { pathname: &'a Path },

    Read { fildes: RawFd, data: usize, data_size: usize },
    Write { fildes: RawFd, data: usize, data_size: usize },
    Close { fildes: RawFd },
    Dup { fildes: RawFd },
    Dup2 { oldfd: RawFd, newfd: RawFd },
    Lseek { fildes: RawFd, offset: i64, whence: i32 },
    Fstat { fildes: RawFd },
    Fsync { fildes: RawFd },
    Ftruncate { fildes: RawFd, length: i64 },
    Fchmod { fildes: RawFd, mode: u32 },
    Fchdir { fildes: RawFd },
    Pipe { fildes: usize },

    Socket { domain: i32, kind: i32, protocol: i32 },
    Bind { fildes: RawFd, address: SocketAddress },
    Connect { fildes: RawFd, address: SocketAddress },
    Listen { fildes: RawFd, backlog: i32 },
    Accept { fildes: RawFd },

    Execve { pathname: &'a Path, argv: &'a [String], envp: &'a [String] },
    Execvp { file: &'a str, argv: &'a [String] },
    Fork,
    Kill { pid: i32, sig: i32 },
    Waitpid { pid: i32, options: i32 },
    Setpgid { pid: i32, pgid: i32 },
    Setuid { uid: u32 },

    Mmap { addr: usize, length: usize, prot: i32, flags: i32, fildes: RawFd, offset: i64 },
    Munmap { addr: usize, length: usize },
    Malloc { size: usize },
    Calloc { nmemb: usize, size: usize },

    Setenv { name: &'a str, value: &'a str, overwrite: bool },
    Unsetenv { name: &'a str },
}

impl Call<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Open { .. } => "open",
            Call::Openat { .. } => "openat",
            Call::Creat { .. } => "creat",
            Call::Fopen { .. } => "fopen",
            Call::Access { .. } => "access",
            Call::Stat { .. } => "stat",
            Call::Lstat { .. } => "lstat",
            Call::Mkdir { .. } => "mkdir",
            Call::Rmdir { .. } => "rmdir",
            Call::Unlink { .. } => "unlink",
            Call::Rename { .. } => "rename",
            Call::Link { .. } => "link",
            Call::Symlink { .. } => "symlink",
            Call::Readlink { .. } => "readlink",
            Call::Chdir { .. } => "chdir",
            Call::Chmod { .. } => "chmod",
            Call::Chown { .. } => "chown",
            Call::Lchown { .. } => "lchown",
            Call::Truncate { .. } => "truncate",
            Call::Opendir { .. } => "opendir",
            Call::Realpath { .. } => "realpath",
            Call::Chroot { .. } => "chroot",
            Call::Read { .. } => "read",
            Call::Write { .. } => "write",
            Call::Close { .. } => "close",
            Call::Dup { .. } => "dup",
            Call::Dup2 { .. } => "dup2",
            Call::Lseek { .. } => "lseek",
            Call::Fstat { .. } => "fstat",
            Call::Fsync { .. } => "fsync",
            Call::Ftruncate { .. } => "ftruncate",
            Call::Fchmod { .. } => "fchmod",
            Call::Fchdir { .. } => "fchdir",
            Call::Pipe { .. } => "pipe",
            Call::Socket { .. } => "socket",
            Call::Bind { .. } => "bind",
            Call::Connect { .. } => "connect",
            Call::Listen { .. } => "listen",
            Call::Accept { .. } => "accept",
            Call::Execve { .. } => "execve",
            Call::Execvp { .. } => "execvp",
            Call::Fork => "fork",
            Call::Kill { .. } => "kill",
            Call::Waitpid { .. } => "waitpid",
            Call::Setpgid { .. } => "setpgid",
            Call::Setuid { .. } => "setuid",
            Call::Mmap { .. } => "mmap",
            Call::Munmap { .. } => "munmap",
            Call::Malloc { .. } => "malloc",
            Call::Calloc { .. } => "calloc",
            Call::Setenv { .. } => "setenv",
            Call::Unsetenv { .. } => "unsetenv",
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Call::Open { .. }
            | Call::Openat { .. }
            | Call::Creat { .. }
            | Call::Fopen { .. }
            | Call::Access { .. }
            | Call::Stat { .. }
            | Call::Lstat { .. }
            | Call::Mkdir { .. }
            | Call::Rmdir { .. }
            | Call::Unlink { .. }
            | Call::Rename { .. }
            | Call::Link { .. }
            | Call::Symlink { .. }
            | Call::Readlink { .. }
            | Call::Chdir { .. }
            | Call::Chmod { .. }
            | Call::Chown { .. }
            | Call::Lchown { .. }
            | Call::Truncate { .. }
            | Call::Opendir { .. }
            | Call::Realpath { .. }
            | Call::Chroot { .. } => Family::Path,
            Call::Read { .. }
            | Call::Write { .. }
            | Call::Close { .. }
            | Call::Dup { .. }
            | Call::Dup2 { .. }
            | Call::Lseek { .. }
            | Call::Fstat { .. }
            | Call::Fsync { .. }
            | Call::Ftruncate { .. }
            | Call::Fchmod { .. }
            | Call::Fchdir { .. }
            | Call::Pipe { .. } => Family::FileDescriptor,
            Call::Socket { .. }
            | Call::Bind { .. }
            | Call::Connect { .. }
            | Call::Listen { .. }
            | Call::Accept { .. } => Family::Network,
            Call::Execve { .. }
            | Call::Execvp { .. }
            | Call::Fork
            | Call::Kill { .. }
            | Call::Waitpid { .. }
            | Call::Setpgid { .. }
            | Call::Setuid { .. } => Family::Process,
            Call::Mmap { .. } | Call::Munmap { .. } | Call::Malloc { .. } | Call::Calloc { .. } => {
                Family::Memory
            }
            Call::Setenv { .. } | Call::Unsetenv { .. } => Family::Environment,
        }
    }

    /// Renders the call as `name(arg = value, ...)`.
    pub fn write_system_call(&self, sb: &mut StringBuffer) {
        match self.family() {
            Family::Path => path::write_system_call(self, sb),
            Family::FileDescriptor => fildes::write_system_call(self, sb),
            Family::Network => socket::write_system_call(self, sb),
            Family::Process => process::write_system_call(self, sb),
            Family::Memory => memory::write_system_call(self, sb),
            Family::Environment => environ::write_system_call(self, sb),
        }
    }

    /// Writes the diagnosis of `errnum`, without the call or the errno text.
    pub fn explain_errno(&self, sb: &mut StringBuffer, errnum: i32) {
        tracing::debug!(call = self.name(), errnum, "explaining");
        match self.family() {
            Family::Path => path::explain_errno(self, sb, errnum),
            Family::FileDescriptor => fildes::explain_errno(self, sb, errnum),
            Family::Network => socket::explain_errno(self, sb, errnum),
            Family::Process => process::explain_errno(self, sb, errnum),
            Family::Memory => memory::explain_errno(self, sb, errnum),
            Family::Environment => environ::explain_errno(self, sb, errnum),
        }
    }

    /// The whole message for `errnum`.
    pub fn message(&self, errnum: i32) -> String {
        explain_errno(self, errnum)
    }
}

/// Collects `name(a = 1, b = 2)` one argument at a time.
pub(crate) struct Args<'s> {
    sb: &'s mut StringBuffer,
    count: usize,
}

impl<'s> Args<'s> {
    pub(crate) fn start(sb: &'s mut StringBuffer, name: &str) -> Args<'s> {
        sb.puts(name);
        sb.putc('(');
        Args { sb, count: 0 }
    }

    /// Writes the `name = ` part, the caller writes the value.
    pub(crate) fn arg(&mut self, name: &str) -> &mut StringBuffer {
        if self.count > 0 {
            self.sb.puts(", ");
        }
        self.count += 1;
        self.sb.puts(name);
        self.sb.puts(" = ");
        self.sb
    }

    pub(crate) fn finish(self) {
        self.sb.putc(')');
    }
}

/// The explanation of `call` failing with `errnum`, as one line.
pub fn explain_errno(call: &Call, errnum: i32) -> String {
    let mut out = StringBuffer::default();
    explain_errno_into(&mut out, call, errnum);
    out.into_string()
}

/// Like [`explain_errno`] with the errno the current thread holds now.
pub fn explain(call: &Call) -> String {
    explain_errno(call, errno::errno().0)
}

/// Writes the explanation into a buffer the caller owns.
pub fn explain_errno_into(out: &mut StringBuffer, call: &Call, errnum: i32) {
    let mut explanation = Explanation::with_maximum(errnum, out.maximum());
    call.write_system_call(&mut explanation.system_call);
    if errnum != 0 {
        call.explain_errno(&mut explanation.explanation, errnum);
    }
    explanation.assemble(out);
}
