use super::{Args, Call};
use crate::{
    capability::Capability,
    causes::{
        common,
        fildes::{explain_ebadf, Access},
        path::{explain_path, explain_path_at},
    },
    explanation::Verdict,
    flags,
    identity::Identity,
    path_resolution::{explain_path_resolution, FinalComponent},
    probe::{device::write_file_type, lstat_path, stat_path},
    render,
    string_buffer::StringBuffer,
    types::FileType,
};
use nix::libc;
use std::{os::fd::RawFd, path::Path};

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match *call {
        Call::Open { pathname, flags, mode } => {
            render::pathname(args.arg("pathname"), pathname);
            write_open_args(&mut args, flags, mode);
        }
        Call::Openat { dirfd, pathname, flags, mode } => {
            render::fildes(args.arg("dirfd"), dirfd);
            render::pathname(args.arg("pathname"), pathname);
            write_open_args(&mut args, flags, mode);
        }
        Call::Creat { pathname, mode } | Call::Mkdir { pathname, mode } | Call::Chmod { pathname, mode } => {
            render::pathname(args.arg("pathname"), pathname);
            render::permission_mode(args.arg("mode"), mode);
        }
        Call::Fopen { pathname, mode } => {
            render::pathname(args.arg("pathname"), pathname);
            args.arg("flags").puts_quoted(mode);
        }
        Call::Access { pathname, mode } => {
            render::pathname(args.arg("pathname"), pathname);
            flags::write_flags(args.arg("mode"), mode, flags::ACCESS_CHECKS, "F_OK");
        }
        Call::Stat { pathname }
        | Call::Lstat { pathname }
        | Call::Rmdir { pathname }
        | Call::Unlink { pathname }
        | Call::Chdir { pathname }
        | Call::Opendir { pathname }
        | Call::Realpath { pathname }
        | Call::Chroot { pathname } => render::pathname(args.arg("pathname"), pathname),
        Call::Rename { oldpath, newpath } | Call::Link { oldpath, newpath } => {
            render::pathname(args.arg("oldpath"), oldpath);
            render::pathname(args.arg("newpath"), newpath);
        }
        Call::Symlink { target, linkpath } => {
            render::pathname(args.arg("target"), target);
            render::pathname(args.arg("linkpath"), linkpath);
        }
        Call::Readlink { pathname, data_size } => {
            render::pathname(args.arg("pathname"), pathname);
            args.arg("data_size").printf(format_args!("{data_size}"));
        }
        Call::Chown { pathname, owner, group } | Call::Lchown { pathname, owner, group } => {
            render::pathname(args.arg("pathname"), pathname);
            render::uid(args.arg("owner"), owner);
            render::gid(args.arg("group"), group);
        }
        Call::Truncate { pathname, length } => {
            render::pathname(args.arg("pathname"), pathname);
            args.arg("length").printf(format_args!("{length}"));
        }
        _ => {}
    }
    args.finish();
}

fn write_open_args(args: &mut Args, open_flags: i32, mode: u32) {
    flags::write_open_flags(args.arg("flags"), open_flags);
    if open_flags & libc::O_CREAT != 0 || open_flags & libc::O_TMPFILE == libc::O_TMPFILE {
        render::permission_mode(args.arg("mode"), mode);
    }
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    let name = call.name();
    match *call {
        Call::Open { pathname, flags, .. } => explain_open(sb, errnum, name, libc::AT_FDCWD, pathname, flags),
        Call::Openat { dirfd, pathname, flags, .. } => explain_open(sb, errnum, name, dirfd, pathname, flags),
        Call::Creat { pathname, .. } => explain_open(
            sb,
            errnum,
            name,
            libc::AT_FDCWD,
            pathname,
            libc::O_CREAT | libc::O_WRONLY | libc::O_TRUNC,
        ),
        Call::Fopen { pathname, mode } => match fopen_flags(mode) {
            Some(flags) => explain_open(sb, errnum, name, libc::AT_FDCWD, pathname, flags),
            None if errnum == libc::EINVAL => {
                sb.puts("the flags argument is not a valid fopen(3) mode string");
            }
            None => explain_path(sb, errnum, name, pathname, "pathname", &FinalComponent::default()),
        },
        Call::Access { pathname, mode } => explain_access(sb, errnum, pathname, mode),
        Call::Stat { pathname } => explain_path(sb, errnum, name, pathname, "pathname", &FinalComponent::default()),
        Call::Lstat { pathname } => {
            let fc = FinalComponent { follow_symlink: false, ..FinalComponent::default() };
            explain_path(sb, errnum, name, pathname, "pathname", &fc)
        }
        Call::Mkdir { pathname, .. } => explain_mkdir(sb, errnum, pathname),
        Call::Rmdir { pathname } => explain_rmdir(sb, errnum, pathname),
        Call::Unlink { pathname } => explain_unlink(sb, errnum, pathname),
        Call::Rename { oldpath, newpath } => explain_rename(sb, errnum, oldpath, newpath),
        Call::Link { oldpath, newpath } => explain_link(sb, errnum, oldpath, newpath),
        Call::Symlink { linkpath, .. } => {
            let fc = FinalComponent {
                must_exist: false,
                must_not_exist: true,
                want_to_create: true,
                follow_symlink: false,
                file_type: FileType::Symlink,
                ..FinalComponent::default()
            };
            explain_path(sb, errnum, name, linkpath, "linkpath", &fc)
        }
        Call::Readlink { pathname, data_size } => explain_readlink(sb, errnum, pathname, data_size),
        Call::Chdir { pathname } => {
            let fc = FinalComponent { want_to_search: true, ..FinalComponent::directory() };
            explain_path(sb, errnum, name, pathname, "pathname", &fc)
        }
        Call::Chmod { pathname, .. } => {
            let fc = FinalComponent { want_to_modify_inode: true, ..FinalComponent::default() };
            explain_path(sb, errnum, name, pathname, "pathname", &fc)
        }
        Call::Chown { pathname, owner, group } => explain_chown(sb, errnum, name, pathname, owner, group, true),
        Call::Lchown { pathname, owner, group } => explain_chown(sb, errnum, name, pathname, owner, group, false),
        Call::Truncate { pathname, length } => explain_truncate(sb, errnum, pathname, length),
        Call::Opendir { pathname } => {
            let fc = FinalComponent { want_to_read: true, ..FinalComponent::directory() };
            explain_path(sb, errnum, name, pathname, "pathname", &fc)
        }
        Call::Realpath { pathname } => explain_path(sb, errnum, name, pathname, "pathname", &FinalComponent::default()),
        Call::Chroot { pathname } => {
            if errnum == libc::EPERM {
                sb.puts("the process does not have the appropriate privileges to change its root directory");
                common::capability_note(sb, Capability::SysChroot);
                return;
            }
            let fc = FinalComponent { want_to_search: true, ..FinalComponent::directory() };
            explain_path(sb, errnum, name, pathname, "pathname", &fc)
        }
        _ => {}
    }
}

/// The open(2) flags an fopen(3) mode string stands for.
pub fn fopen_flags(mode: &str) -> Option<i32> {
    let mut chars = mode.chars();
    let mut flags = match chars.next()? {
        'r' => libc::O_RDONLY,
        'w' => libc::O_WRONLY | libc::O_CREAT | libc::O_TRUNC,
        'a' => libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND,
        _ => return None,
    };
    for c in chars {
        match c {
            '+' => flags = (flags & !libc::O_ACCMODE) | libc::O_RDWR,
            'b' | 't' => {}
            'e' => flags |= libc::O_CLOEXEC,
            'x' => flags |= libc::O_EXCL,
            'm' | 'c' => {}
            _ => return None,
        }
    }
    Some(flags)
}

fn is_symlink(path: &Path) -> bool {
    lstat_path(path).is_ok_and(|st| FileType::from_mode(st.st_mode) == FileType::Symlink)
}

fn explain_open(sb: &mut StringBuffer, errnum: i32, name: &str, dirfd: RawFd, pathname: &Path, flags: i32) {
    let fc = FinalComponent::from_open_flags(flags);
    match errnum {
        libc::EBADF if dirfd != libc::AT_FDCWD => explain_ebadf(sb, dirfd, "dirfd", Access::Any),
        libc::EINVAL => {
            sb.puts("the flags argument is invalid");
            if flags & libc::O_TMPFILE == libc::O_TMPFILE && flags & libc::O_ACCMODE == libc::O_RDONLY {
                sb.puts(", O_TMPFILE requires O_WRONLY or O_RDWR");
            } else if flags & libc::O_DIRECT != 0 {
                sb.puts(", the file system does not support O_DIRECT");
            }
        }
        libc::ELOOP if flags & libc::O_NOFOLLOW != 0 && is_symlink(pathname) => {
            sb.puts("O_NOFOLLOW was specified but pathname refers to a symbolic link");
        }
        libc::ENXIO => match stat_path(pathname).map(|st| FileType::from_mode(st.st_mode)) {
            Ok(FileType::Fifo) => sb.puts(
                "O_NONBLOCK | O_WRONLY is set, the named file is a FIFO and no process has the file open for reading",
            ),
            _ => sb.puts("pathname refers to a device special file and no corresponding device exists"),
        },
        libc::ENODEV => {
            sb.puts("pathname refers to a device special file and no corresponding device exists");
        }
        libc::EOVERFLOW | libc::EFBIG => {
            sb.puts("pathname refers to a regular file that is too large to be opened");
            if flags & libc::O_LARGEFILE == 0 {
                sb.puts(", the O_LARGEFILE flag is necessary");
            }
        }
        libc::EWOULDBLOCK => {
            sb.puts("the O_NONBLOCK flag was specified, and an incompatible lease was held on the file");
        }
        libc::EPERM if flags & libc::O_NOATIME != 0 => {
            sb.puts("the O_NOATIME flag was specified, but the effective user ID of the process did not match the owner of the file");
            common::capability_note(sb, Capability::Fowner);
        }
        libc::EISDIR if flags & libc::O_TMPFILE == libc::O_TMPFILE => {
            sb.puts("O_TMPFILE was specified, but the file system does not support unnamed temporary files");
        }
        _ => explain_path_at(sb, errnum, name, dirfd, pathname, "pathname", &fc),
    }
}

fn explain_access(sb: &mut StringBuffer, errnum: i32, pathname: &Path, mode: i32) {
    let fc = FinalComponent {
        want_to_read: mode & libc::R_OK != 0,
        want_to_write: mode & libc::W_OK != 0,
        want_to_execute: mode & libc::X_OK != 0,
        identity: Identity::real(),
        ..FinalComponent::default()
    };
    if errnum == libc::EINVAL {
        sb.puts("mode was incorrectly specified");
        return;
    }
    explain_path(sb, errnum, "access", pathname, "pathname", &fc);
}

fn explain_mkdir(sb: &mut StringBuffer, errnum: i32, pathname: &Path) {
    let fc = FinalComponent {
        must_exist: false,
        must_not_exist: true,
        want_to_create: true,
        follow_symlink: false,
        ..FinalComponent::directory()
    };
    match errnum {
        libc::EMLINK => sb.puts("the parent directory already has the maximum number of links to it"),
        _ => explain_path(sb, errnum, "mkdir", pathname, "pathname", &fc),
    }
}

fn last_component_is(pathname: &Path, name: &str) -> bool {
    pathname.as_os_str().to_string_lossy().trim_end_matches('/').rsplit('/').next() == Some(name)
}

fn explain_rmdir(sb: &mut StringBuffer, errnum: i32, pathname: &Path) {
    let fc = FinalComponent {
        want_to_unlink: true,
        follow_symlink: false,
        ..FinalComponent::directory()
    };
    match errnum {
        libc::EINVAL if last_component_is(pathname, ".") => sb.puts("pathname has \".\" as last component"),
        libc::ENOTEMPTY | libc::EEXIST if last_component_is(pathname, "..") => {
            sb.puts("pathname has \"..\" as its final component")
        }
        libc::ENOTEMPTY | libc::EEXIST => common::enotempty(sb, "pathname"),
        libc::EBUSY => common::ebusy_path(sb, pathname, "pathname"),
        _ => explain_path(sb, errnum, "rmdir", pathname, "pathname", &fc),
    }
}

fn explain_unlink(sb: &mut StringBuffer, errnum: i32, pathname: &Path) {
    let fc = FinalComponent {
        want_to_unlink: true,
        follow_symlink: false,
        ..FinalComponent::default()
    };
    let is_directory = || lstat_path(pathname).is_ok_and(|st| FileType::from_mode(st.st_mode) == FileType::Directory);
    match errnum {
        libc::EISDIR => sb.puts("pathname refers to a directory, directories may not be unlinked, use rmdir(2) instead"),
        libc::EPERM if is_directory() => sb.puts("pathname refers to a directory, the system does not allow unlinking of directories"),
        libc::EBUSY => common::ebusy_path(sb, pathname, "pathname"),
        _ => explain_path(sb, errnum, "unlink", pathname, "pathname", &fc),
    }
}

/// Tries the first path, then the second, then falls back on the first.
fn explain_two_paths(
    sb: &mut StringBuffer,
    errnum: i32,
    name: &str,
    first: (&Path, &str, &FinalComponent),
    second: (&Path, &str, &FinalComponent),
) {
    let mut attempt = StringBuffer::new(sb.maximum());
    if explain_path_resolution(&mut attempt, errnum, first.0, first.1, first.2) == Verdict::Explained {
        sb.copy_from(&attempt);
        return;
    }
    attempt.rewind();
    if explain_path_resolution(&mut attempt, errnum, second.0, second.1, second.2) == Verdict::Explained {
        sb.copy_from(&attempt);
        return;
    }
    explain_path(sb, errnum, name, first.0, first.1, first.2);
}

fn explain_rename(sb: &mut StringBuffer, errnum: i32, oldpath: &Path, newpath: &Path) {
    let old_fc = FinalComponent {
        want_to_unlink: true,
        follow_symlink: false,
        ..FinalComponent::default()
    };
    let new_fc = FinalComponent {
        must_exist: false,
        want_to_create: true,
        follow_symlink: false,
        ..FinalComponent::default()
    };
    let kind = |path: &Path| lstat_path(path).ok().map(|st| FileType::from_mode(st.st_mode));
    match errnum {
        libc::EXDEV => common::exdev(sb, oldpath, newpath, "rename"),
        libc::ENOTEMPTY | libc::EEXIST => common::enotempty(sb, "newpath"),
        libc::EBUSY => common::ebusy_path(sb, oldpath, "oldpath or newpath"),
        libc::EINVAL => sb.puts(
            "newpath contained a path prefix of oldpath, or more generally, an attempt was made to make a directory a subdirectory of itself",
        ),
        libc::EISDIR => match lstat_path(oldpath) {
            Ok(st) => {
                sb.puts("newpath is an existing directory, but oldpath is a ");
                write_file_type(sb, &st);
                sb.puts(", not a directory");
            }
            Err(_) => sb.puts("newpath is an existing directory, but oldpath is not a directory"),
        },
        libc::ENOTDIR if kind(oldpath) == Some(FileType::Directory) && kind(newpath).is_some() => {
            sb.puts("oldpath is a directory, but newpath exists and is not a directory")
        }
        libc::EROFS => common::erofs(sb, newpath, "newpath"),
        libc::ENOSPC => common::enospc(sb, Some(newpath)),
        _ => explain_two_paths(
            sb,
            errnum,
            "rename",
            (oldpath, "oldpath", &old_fc),
            (newpath, "newpath", &new_fc),
        ),
    }
}

fn explain_link(sb: &mut StringBuffer, errnum: i32, oldpath: &Path, newpath: &Path) {
    let old_fc = FinalComponent { follow_symlink: false, ..FinalComponent::default() };
    let new_fc = FinalComponent {
        must_exist: false,
        must_not_exist: true,
        want_to_create: true,
        follow_symlink: false,
        ..FinalComponent::default()
    };
    let old_is_directory =
        || lstat_path(oldpath).is_ok_and(|st| FileType::from_mode(st.st_mode) == FileType::Directory);
    match errnum {
        libc::EXDEV => common::exdev(sb, oldpath, newpath, "link"),
        libc::EEXIST => explain_path(sb, errnum, "link", newpath, "newpath", &new_fc),
        libc::EMLINK => sb.puts("oldpath already has the maximum number of links to it"),
        libc::EPERM if old_is_directory() => {
            sb.puts("oldpath is a directory, and it is not possible to make hard links to directories")
        }
        libc::EROFS => common::erofs(sb, oldpath, "oldpath"),
        libc::ENOSPC => common::enospc(sb, Some(newpath)),
        _ => explain_two_paths(
            sb,
            errnum,
            "link",
            (oldpath, "oldpath", &old_fc),
            (newpath, "newpath", &new_fc),
        ),
    }
}

fn explain_readlink(sb: &mut StringBuffer, errnum: i32, pathname: &Path, data_size: usize) {
    let fc = FinalComponent {
        follow_symlink: false,
        file_type: FileType::Symlink,
        ..FinalComponent::default()
    };
    match errnum {
        libc::EINVAL if data_size == 0 => sb.puts("data_size is not positive"),
        libc::EINVAL => match lstat_path(pathname) {
            Ok(st) => {
                sb.puts("pathname refers to a ");
                write_file_type(sb, &st);
                sb.puts(", not to a symbolic link");
            }
            Err(_) => sb.puts("pathname does not refer to a symbolic link"),
        },
        _ => explain_path(sb, errnum, "readlink", pathname, "pathname", &fc),
    }
}

fn explain_chown(
    sb: &mut StringBuffer,
    errnum: i32,
    name: &str,
    pathname: &Path,
    owner: u32,
    group: u32,
    follow_symlink: bool,
) {
    let fc = FinalComponent {
        want_to_modify_inode: true,
        follow_symlink,
        ..FinalComponent::default()
    };
    let id = &fc.identity;
    if errnum == libc::EPERM && !id.has(Capability::Chown) {
        let st = if follow_symlink { stat_path(pathname) } else { lstat_path(pathname) };
        if let Ok(st) = st {
            // u32::MAX stands for -1, leave unchanged
            if owner != u32::MAX && owner != st.st_uid {
                sb.puts("only a privileged process may change the owner of a file");
                common::capability_note(sb, Capability::Chown);
                return;
            }
            if group != u32::MAX && group != st.st_gid && !(id.uid == st.st_uid && id.in_group(group)) {
                sb.puts("the owner of a file may only change its group to a group they are a member of");
                common::capability_note(sb, Capability::Chown);
                return;
            }
        }
    }
    explain_path(sb, errnum, name, pathname, "pathname", &fc);
}

fn explain_truncate(sb: &mut StringBuffer, errnum: i32, pathname: &Path, length: i64) {
    let fc = FinalComponent { want_to_write: true, ..FinalComponent::default() };
    match errnum {
        libc::EINVAL if length < 0 => sb.printf(format_args!("length is negative ({length})")),
        libc::EINVAL => match stat_path(pathname) {
            Ok(st) if FileType::from_mode(st.st_mode) != FileType::Regular => {
                sb.puts("pathname refers to a ");
                write_file_type(sb, &st);
                sb.puts(", it is only possible to truncate a regular file");
            }
            _ => sb.puts("length is larger than the maximum file size"),
        },
        libc::EFBIG => common::efbig(sb),
        libc::EINTR => common::eintr(sb, "truncate"),
        libc::EISDIR => sb.puts("pathname refers to a directory, directories may not be truncated"),
        _ => explain_path(sb, errnum, "truncate", pathname, "pathname", &fc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn fopen_modes() {
        assert_eq!(fopen_flags("r"), Some(libc::O_RDONLY));
        assert_eq!(fopen_flags("w+"), Some(libc::O_RDWR | libc::O_CREAT | libc::O_TRUNC));
        assert_eq!(fopen_flags("ab"), Some(libc::O_WRONLY | libc::O_CREAT | libc::O_APPEND));
        assert_eq!(fopen_flags("q"), None);
    }

    #[test]
    fn open_renders_flags_and_mode() {
        let call = Call::Open { pathname: Path::new("f"), flags: libc::O_WRONLY | libc::O_CREAT, mode: 0o644 };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        assert_eq!(sb.as_str(), "open(pathname = \"f\", flags = O_WRONLY | O_CREAT, mode = 0644)");
    }

    #[test]
    fn missing_directory_is_named() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir/some-file");
        let call = Call::Open { pathname: &path, flags: libc::O_RDONLY, mode: 0 };
        let message = explain_errno(&call, libc::ENOENT);
        assert!(message.contains("(2, ENOENT) because"), "{message}");
        assert!(message.contains("\"no-such-dir\""), "{message}");
    }

    #[test]
    fn rmdir_of_full_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("inside"), "").unwrap();
        let call = Call::Rmdir { pathname: dir.path() };
        let message = explain_errno(&call, libc::ENOTEMPTY);
        assert!(message.ends_with("pathname is not an empty directory, it contains entries other than \".\" and \"..\""), "{message}");
    }

    #[test]
    fn readlink_of_a_regular_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain");
        fs::write(&path, "").unwrap();
        let call = Call::Readlink { pathname: &path, data_size: 64 };
        let message = explain_errno(&call, libc::EINVAL);
        assert!(message.ends_with("pathname refers to a regular file, not to a symbolic link"), "{message}");
    }

    #[test]
    fn rename_into_missing_directory_blames_newpath() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("old");
        fs::write(&old, "").unwrap();
        let new = dir.path().join("absent/new");
        let call = Call::Rename { oldpath: &old, newpath: &new };
        let message = explain_errno(&call, libc::ENOENT);
        assert!(message.contains("there is no \"absent\" directory in the newpath"), "{message}");
    }
}
