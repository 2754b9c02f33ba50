use crate::{
    capability::Capability,
    options::options,
    platform::platform,
    probe::{self, mount},
    string_buffer::StringBuffer,
    types::Bytes,
};
use nix::sys::resource::{getrlimit, Resource, RLIM_INFINITY};
use std::path::Path;
use syscalls::Sysno;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Unit {
    Count,
    Bytes,
}

/// Appends ` (RLIMIT_NOFILE is 1024)` for the soft limit of `resource`.
pub fn write_rlimit(sb: &mut StringBuffer, resource: Resource, name: &str, unit: Unit) {
    let Some((soft, _)) = probe::absorb("getrlimit", getrlimit(resource)) else {
        return;
    };
    if soft == RLIM_INFINITY {
        sb.printf(format_args!(" ({name} is unlimited)"));
        return;
    }
    match unit {
        Unit::Count => sb.printf(format_args!(" ({name} is {soft})")),
        Unit::Bytes => sb.printf(format_args!(" ({name} is {})", Bytes::from(soft))),
    }
}

pub fn capability_note(sb: &mut StringBuffer, capability: Capability) {
    if options().dialect_specific {
        sb.printf(format_args!(
            ", and the process does not have the {capability} capability"
        ));
    }
}

pub fn eintr(sb: &mut StringBuffer, syscall_name: &str) {
    sb.printf(format_args!(
        "the {syscall_name} system call was interrupted by a signal before it could finish"
    ));
}

pub fn emfile(sb: &mut StringBuffer) {
    sb.puts("the process already has the maximum number of file descriptors open");
    write_rlimit(sb, Resource::RLIMIT_NOFILE, "RLIMIT_NOFILE", Unit::Count);
}

pub fn enfile(sb: &mut StringBuffer) {
    sb.puts("the system limit on the total number of open files has been reached");
}

pub fn enomem(sb: &mut StringBuffer) {
    sb.puts("insufficient user-space memory was available");
    write_rlimit(sb, Resource::RLIMIT_AS, "RLIMIT_AS", Unit::Bytes);
}

pub fn enomem_kernel(sb: &mut StringBuffer) {
    sb.puts("insufficient kernel memory was available");
}

pub fn enobufs(sb: &mut StringBuffer) {
    sb.puts("insufficient kernel memory was available for the network buffers");
}

pub fn ewouldblock(sb: &mut StringBuffer, syscall_name: &str) {
    sb.printf(format_args!(
        "the file descriptor has been marked non-blocking (O_NONBLOCK) and the {syscall_name} system call would have blocked"
    ));
}

/// The vague form, used when nothing narrows down what is not supported.
pub fn enosys(sb: &mut StringBuffer, syscall_name: &str) {
    sb.printf(format_args!(
        "the {syscall_name} system call is not supported by the kernel or by the file or device it was applied to"
    ));
    let footnote = sb.footnote();
    footnote.printf(format_args!("the kernel release is {}", platform().release));
    if let Some(sysno) = sysno_named(syscall_name) {
        footnote.printf(format_args!(", {syscall_name} is system call number {}", sysno.id()));
    }
}

/// The Linux system call called `name` on this architecture.
pub fn sysno_named(name: &str) -> Option<Sysno> {
    let first = Sysno::first().id() as usize;
    let last = Sysno::last().id() as usize;
    (first..=last)
        .filter_map(Sysno::new)
        .find(|sysno| sysno.name() == name)
}

pub fn erange(sb: &mut StringBuffer) {
    sb.puts("the result was too large to be represented in the space provided");
}

pub fn eoverflow(sb: &mut StringBuffer) {
    sb.puts("a value is too large to be stored in the data type used to return it");
}

pub fn efault(sb: &mut StringBuffer, caption: &str) {
    sb.printf(format_args!(
        "{caption} refers to memory that is outside the process's accessible address space"
    ));
}

pub fn efault_generic(sb: &mut StringBuffer) {
    sb.puts("one or more arguments referred to memory outside the address space of the process");
}

pub fn eio(sb: &mut StringBuffer) {
    sb.puts("a low-level I/O error occurred, probably in hardware");
}

pub fn erofs(sb: &mut StringBuffer, path: &Path, caption: &str) {
    sb.printf(format_args!(
        "write access was requested and {caption} refers to a file on a read-only file system"
    ));
    if !mount::write_mount_point(sb, path) {
        mount::write_mount_point_dirname(sb, path);
    }
}

pub fn enospc(sb: &mut StringBuffer, path: Option<&Path>) {
    sb.puts("the file system containing the file has no room for more data");
    if let Some(path) = path {
        if !mount::write_mount_point(sb, path) {
            mount::write_mount_point_dirname(sb, path);
        }
    }
}

pub fn enospc_dev(sb: &mut StringBuffer, dev: u64) {
    sb.puts("the file system containing the file has no room for more data");
    mount::write_mount_point_dev(sb, dev);
}

pub fn edquot(sb: &mut StringBuffer) {
    sb.puts("the user's quota of disk blocks on the file system containing the file has been exhausted");
}

pub fn efbig(sb: &mut StringBuffer) {
    sb.puts("the file would exceed the maximum size the process is permitted to create");
    write_rlimit(sb, Resource::RLIMIT_FSIZE, "RLIMIT_FSIZE", Unit::Bytes);
}

pub fn eisdir(sb: &mut StringBuffer, caption: &str) {
    sb.printf(format_args!(
        "{caption} refers to a directory and the access requested involved writing"
    ));
}

/// ETXTBSY, naming the processes that hold the file when procfs can tell.
pub fn etxtbsy(sb: &mut StringBuffer, path: &Path, caption: &str) {
    sb.printf(format_args!(
        "{caption} refers to an executable image which is currently being executed, or is open for writing"
    ));
    let users = probe::process::processes_using(path);
    for (index, (pid, name)) in users.iter().enumerate() {
        sb.puts(if index == 0 { " by process " } else { ", process " });
        sb.printf(format_args!("{pid} "));
        sb.puts_quoted(name);
    }
}

pub fn enotdir(sb: &mut StringBuffer, caption: &str) {
    sb.printf(format_args!(
        "a component of the {caption} prefix is not a directory"
    ));
}

/// EXDEV, naming the two mount points when they can be found.
pub fn exdev(sb: &mut StringBuffer, oldpath: &Path, newpath: &Path, syscall_name: &str) {
    sb.puts("oldpath and newpath are not on the same mounted file system");
    let mounted = |path: &Path| {
        mount::mount_point(path).or_else(|| path.parent().and_then(mount::mount_point))
    };
    if let (Some(old), Some(new)) = (mounted(oldpath), mounted(newpath)) {
        sb.printf(format_args!(
            " (\"{}\" versus \"{}\")",
            old.display(),
            new.display()
        ));
    }
    sb.footnote().printf(format_args!(
        "{syscall_name} cannot be used across mount points, copy the file and then remove the original"
    ));
}

pub fn enotempty(sb: &mut StringBuffer, caption: &str) {
    sb.printf(format_args!(
        "{caption} is not an empty directory, it contains entries other than \".\" and \"..\""
    ));
}

/// EBUSY for a path, naming the processes holding it.
pub fn ebusy_path(sb: &mut StringBuffer, path: &Path, caption: &str) {
    sb.printf(format_args!(
        "{caption} is currently in use by the system or some process that prevents its removal"
    ));
    let users = probe::process::processes_using(path);
    for (index, (pid, name)) in users.iter().enumerate() {
        sb.puts(if index == 0 { ", process " } else { " and process " });
        sb.printf(format_args!("{pid} "));
        sb.puts_quoted(name);
    }
    if mount::mount_point(path).is_some_and(|point| Some(point) == path.canonicalize().ok()) {
        sb.footnote().printf(format_args!("note that {caption} is currently used as a mount point"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_limit_is_narrated() {
        let mut sb = StringBuffer::default();
        emfile(&mut sb);
        assert!(sb.as_str().starts_with("the process already has the maximum number"));
        assert!(sb.as_str().contains("RLIMIT_NOFILE is "), "{sb}");
    }

    #[test]
    fn enosys_names_the_kernel_and_syscall_number() {
        let mut sb = StringBuffer::default();
        enosys(&mut sb, "read");
        let footnotes = sb.footnotes().unwrap();
        assert!(footnotes.contains("the kernel release is"));
        assert!(footnotes.contains(&format!("system call number {}", Sysno::read.id())));
    }

    #[test]
    fn unknown_syscall_names_skip_the_number() {
        let mut sb = StringBuffer::default();
        enosys(&mut sb, "malloc");
        assert!(!sb.footnotes().unwrap().contains("system call number"));
    }
}
