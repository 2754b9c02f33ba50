use super::{common, generic::explain_generic};
use crate::{
    explanation::Verdict,
    path_resolution::{explain_path_resolution_at, FinalComponent},
    platform::platform,
    probe::{fildes::fildes_path, lstat_path, medium},
    string_buffer::StringBuffer,
};
use nix::{errno::Errno, libc};
use std::{borrow::Cow, os::fd::RawFd, path::Path};

/// Explains `errnum` for a call that resolved `pathname`.
pub fn explain_path(
    sb: &mut StringBuffer,
    errnum: i32,
    syscall_name: &str,
    pathname: &Path,
    caption: &str,
    fc: &FinalComponent,
) {
    explain_path_at(sb, errnum, syscall_name, libc::AT_FDCWD, pathname, caption, fc);
}

/// As [`explain_path`], a relative `pathname` starting from `dirfd`.
pub fn explain_path_at(
    sb: &mut StringBuffer,
    errnum: i32,
    syscall_name: &str,
    dirfd: RawFd,
    pathname: &Path,
    caption: &str,
    fc: &FinalComponent,
) {
    let resolved = anchored(dirfd, pathname);
    match errnum {
        _ if resolves_path(errnum) => {
            let verdict = explain_path_resolution_at(sb, errnum, dirfd, pathname, caption, fc);
            if verdict == Verdict::Undetermined {
                fallback(sb, errnum, syscall_name, &resolved, caption);
            }
        }
        libc::EROFS => common::erofs(sb, &resolved, caption),
        libc::ENOSPC => common::enospc(sb, Some(resolved.as_ref())),
        libc::EDQUOT => common::edquot(sb),
        libc::ETXTBSY => common::etxtbsy(sb, &resolved, caption),
        libc::EISDIR => common::eisdir(sb, caption),
        libc::EFAULT => common::efault(sb, caption),
        libc::ENOMEM => common::enomem_kernel(sb),
        libc::ENOMEDIUM => medium::explain_enomedium_path(sb, &resolved),
        _ => explain_generic(sb, errnum, syscall_name),
    }
    race_note(sb, errnum, &resolved, fc);
}

// errnos the path resolution walk can account for
fn resolves_path(errnum: i32) -> bool {
    matches!(
        errnum,
        libc::ENOENT
            | libc::ENOTDIR
            | libc::ELOOP
            | libc::EMLINK
            | libc::EACCES
            | libc::ENAMETOOLONG
            | libc::EEXIST
            | libc::EPERM
    )
}

fn anchored(dirfd: RawFd, pathname: &Path) -> Cow<'_, Path> {
    if dirfd == libc::AT_FDCWD || pathname.is_absolute() || pathname.as_os_str().is_empty() {
        return Cow::Borrowed(pathname);
    }
    match fildes_path(dirfd) {
        Some(dir) => Cow::Owned(dir.join(pathname)),
        None => Cow::Borrowed(pathname),
    }
}

fn fallback(sb: &mut StringBuffer, errnum: i32, syscall_name: &str, pathname: &Path, caption: &str) {
    match errnum {
        libc::ENOENT => sb.printf(format_args!(
            "a component of {caption} does not exist, or {caption} is an empty string"
        )),
        libc::ENOTDIR => common::enotdir(sb, caption),
        libc::ELOOP | libc::EMLINK => sb.printf(format_args!(
            "too many symbolic links were encountered in resolving {caption}"
        )),
        libc::EACCES => sb.printf(format_args!(
            "search permission is denied for one of the directories in the path prefix of {caption}, or the requested access to the file is not allowed"
        )),
        libc::ENAMETOOLONG => {
            let length = pathname.as_os_str().len();
            sb.printf(format_args!("{caption} is too long"));
            if length > platform().path_max {
                sb.printf(format_args!(" ({length} > {})", platform().path_max));
            }
        }
        libc::EEXIST => sb.printf(format_args!("{caption} already exists")),
        _ => explain_generic(sb, errnum, syscall_name),
    }
}

// The tree may have changed since the call failed.
fn race_note(sb: &mut StringBuffer, errnum: i32, pathname: &Path, fc: &FinalComponent) {
    if pathname.as_os_str().is_empty() || !fc.must_exist {
        return;
    }
    match lstat_path(pathname) {
        Ok(_) if errnum == libc::ENOENT => {
            sb.footnote()
                .puts("the file now exists, it may have been created after the failing call");
        }
        Err(Errno::ENOENT) if !resolves_path(errnum) => {
            sb.footnote()
                .puts("the file no longer exists, it may have been removed after the failing call");
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn file_created_after_the_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late");
        std::fs::write(&path, "").unwrap();
        let mut sb = StringBuffer::default();
        explain_path(&mut sb, libc::ENOENT, "open", &path, "pathname", &FinalComponent::default());
        assert!(sb.footnotes().unwrap().contains("the file now exists"), "{sb}");
    }

    #[test]
    fn file_used_as_a_directory_is_not_called_removed() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("plain"), "").unwrap();
        let path = dir.path().join("plain/inner");
        let mut sb = StringBuffer::default();
        explain_path(&mut sb, libc::ENOTDIR, "stat", &path, "pathname", &FinalComponent::default());
        assert!(sb.as_str().contains("is being used as a directory when it is not"), "{sb}");
        assert!(sb.footnotes().is_none(), "{sb}");
    }

    #[test]
    fn symlink_loop_is_not_called_removed() {
        let dir = TempDir::new().unwrap();
        std::os::unix::fs::symlink("b", dir.path().join("a")).unwrap();
        std::os::unix::fs::symlink("a", dir.path().join("b")).unwrap();
        let path = dir.path().join("a");
        let mut sb = StringBuffer::default();
        explain_path(&mut sb, libc::ELOOP, "stat", &path, "pathname", &FinalComponent::default());
        assert!(sb.as_str().contains("a symbolic link loop was encountered in pathname"), "{sb}");
        assert!(sb.footnotes().is_none(), "{sb}");
    }

    #[test]
    fn file_removed_after_the_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone");
        let mut sb = StringBuffer::default();
        explain_path(&mut sb, libc::ETXTBSY, "open", &path, "pathname", &FinalComponent::default());
        assert!(sb.footnotes().unwrap().contains("the file no longer exists"), "{sb}");
    }

    #[test]
    fn read_only_file_system_has_its_own_wording() {
        let mut sb = StringBuffer::default();
        explain_path(&mut sb, libc::EROFS, "open", Path::new("/"), "pathname", &FinalComponent::default());
        assert!(sb.as_str().starts_with("write access was requested and pathname refers to a file on a read-only file system"));
    }
}
