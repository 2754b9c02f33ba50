//! Replay of kernel path lookup, one component at a time.
//!
//! When a path based call fails the kernel only reports an errno. Walking
//! the same path again with `lstat` finds the component where things went
//! wrong: a missing directory, a directory without search permission, a
//! symbolic link loop, a final component of the wrong type. The caller
//! describes what it meant to do with the last component in a
//! [`FinalComponent`].
//!
//! The replay is best effort. Another process may have changed the tree
//! since the call failed, in which case [`Verdict::Undetermined`] is
//! returned and the caller falls back to a generic explanation.

use crate::{
    capability::Capability,
    explanation::Verdict,
    fstrcmp::fstrcasecmp,
    identity::Identity,
    permission::{
        explain_execute_permission, explain_inode_permission, explain_read_permission,
        explain_search_permission, explain_write_permission, have_execute_permission,
        have_inode_permission, have_search_permission, have_write_permission,
        have_read_permission, sticky_denies_unlink,
    },
    options::options,
    platform::platform,
    probe::{device::write_file_type, exec::hash_bang, fildes::fildes_path, mount, process},
    render,
    string_buffer::StringBuffer,
    types::FileType,
};
use nix::{
    errno::Errno,
    fcntl::readlink,
    libc,
    sys::stat::{lstat, FileStat},
    unistd::{pathconf, PathconfVar},
};
use std::{
    ffi::OsStr,
    fs,
    os::{fd::RawFd, unix::ffi::OsStrExt},
    path::Path,
};

/// What the caller wanted to do with the last path component.
#[derive(Clone, Debug)]
pub struct FinalComponent {
    pub want_to_read: bool,
    pub want_to_write: bool,
    pub want_to_search: bool,
    pub want_to_execute: bool,
    pub want_to_create: bool,
    pub want_to_modify_inode: bool,
    pub want_to_unlink: bool,
    pub must_exist: bool,
    pub must_not_exist: bool,
    pub must_be_a: Option<FileType>,
    pub follow_symlink: bool,
    pub follow_interpreter: bool,
    /// The type named in messages about a missing final component.
    pub file_type: FileType,
    pub identity: Identity,
    pub path_max: Option<usize>,
}

impl Default for FinalComponent {
    fn default() -> Self {
        FinalComponent {
            want_to_read: false,
            want_to_write: false,
            want_to_search: false,
            want_to_execute: false,
            want_to_create: false,
            want_to_modify_inode: false,
            want_to_unlink: false,
            must_exist: true,
            must_not_exist: false,
            must_be_a: None,
            follow_symlink: true,
            follow_interpreter: true,
            file_type: FileType::Regular,
            identity: Identity::current(),
            path_max: None,
        }
    }
}

impl FinalComponent {
    /// The intent expressed by open(2) flags.
    pub fn from_open_flags(flags: i32) -> FinalComponent {
        let mut fc = FinalComponent::default();
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => fc.want_to_read = true,
            libc::O_WRONLY => fc.want_to_write = true,
            _ => {
                fc.want_to_read = true;
                fc.want_to_write = true;
            }
        }
        if flags & libc::O_TRUNC != 0 {
            fc.want_to_write = true;
        }
        if flags & libc::O_CREAT != 0 {
            fc.want_to_create = true;
            fc.must_exist = false;
            if flags & libc::O_EXCL != 0 {
                fc.must_not_exist = true;
            }
        }
        if flags & libc::O_DIRECTORY != 0 {
            fc.must_be_a = Some(FileType::Directory);
            fc.file_type = FileType::Directory;
        }
        if flags & libc::O_NOFOLLOW != 0 {
            fc.follow_symlink = false;
        }
        fc
    }

    pub fn directory() -> FinalComponent {
        FinalComponent {
            must_be_a: Some(FileType::Directory),
            file_type: FileType::Directory,
            ..FinalComponent::default()
        }
    }
}

fn os(bytes: &[u8]) -> &Path {
    Path::new(OsStr::from_bytes(bytes))
}

fn lossy(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

fn join(dir: &[u8], component: &[u8]) -> Vec<u8> {
    let mut joined = dir.to_vec();
    if !joined.is_empty() && !joined.ends_with(b"/") {
        joined.push(b'/');
    }
    let mut component = component;
    while let Some(rest) = component.strip_prefix(b"/") {
        component = rest;
    }
    joined.extend_from_slice(component);
    joined
}

/// `pathname "/tmp" directory`, or `current directory` for `.`.
pub fn write_caption_name_type(
    sb: &mut StringBuffer,
    caption: Option<&str>,
    name: &str,
    kind: Option<FileType>,
) {
    if name == "." {
        sb.puts("current directory");
        return;
    }
    if let Some(caption) = caption {
        sb.puts(caption);
        sb.putc(' ');
    }
    sb.puts_quoted(name);
    if let Some(kind) = kind {
        sb.printf(format_args!(" {kind}"));
    }
}

fn write_caption_name_st(sb: &mut StringBuffer, caption: Option<&str>, name: &str, st: &FileStat) {
    if name == "." {
        sb.puts("current directory");
        return;
    }
    if let Some(caption) = caption {
        sb.puts(caption);
        sb.putc(' ');
    }
    sb.puts_quoted(name);
    sb.putc(' ');
    write_file_type(sb, st);
}

/// Adds a "did you mean" footnote when `directory` holds an entry whose name
/// is close to `component`.
pub fn look_for_similar(sb: &mut StringBuffer, directory: &Path, component: &str) {
    let Ok(entries) = fs::read_dir(directory) else {
        return;
    };
    let mut best: Option<(f64, String)> = None;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let weight = fstrcasecmp(component, &name);
        if weight > best.as_ref().map_or(0.6, |(best_weight, _)| *best_weight) {
            best = Some((weight, name));
        }
    }
    let Some((_, name)) = best else {
        return;
    };
    let footnote = sb.footnote();
    footnote.puts("did you mean the ");
    match lstat(&directory.join(&name)) {
        Ok(st) => write_caption_name_st(footnote, None, &name, &st),
        Err(_) => write_caption_name_type(footnote, None, &name, None),
    }
    footnote.puts(" instead?");
}

fn path_max_for(initial: &[u8], fc: &FinalComponent) -> usize {
    fc.path_max
        .or_else(|| {
            pathconf(os(initial), PathconfVar::PATH_MAX)
                .ok()
                .flatten()
                .and_then(|n| usize::try_from(n).ok())
        })
        .filter(|n| *n > 0)
        .unwrap_or(platform().path_max)
}

fn name_max_for(dir: &[u8]) -> usize {
    pathconf(os(dir), PathconfVar::NAME_MAX)
        .ok()
        .flatten()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(platform().name_max)
}

fn truncates_silently(dir: &[u8]) -> bool {
    matches!(pathconf(os(dir), PathconfVar::_POSIX_NO_TRUNC), Ok(Some(0)))
}

/// Explains why resolving `pathname` failed with `expected`.
pub fn explain_path_resolution(
    sb: &mut StringBuffer,
    expected: i32,
    pathname: &Path,
    caption: &str,
    fc: &FinalComponent,
) -> Verdict {
    let expected = if expected == libc::EMLINK { libc::ELOOP } else { expected };
    let initial = pathname.as_os_str().as_bytes();
    if initial.is_empty() {
        sb.printf(format_args!(
            "POSIX decrees that an empty {caption} must not be resolved successfully"
        ));
        return Verdict::Explained;
    }
    let initial: &[u8] = if initial.iter().all(|b| *b == b'/') { b"/." } else { initial };

    let path_max = path_max_for(initial, fc);
    if expected == libc::ENAMETOOLONG && initial.len() > path_max {
        sb.printf(format_args!(
            "{caption} exceeds the system maximum path length ({} > {path_max})",
            initial.len()
        ));
        return Verdict::Explained;
    }

    let mut path = Vec::with_capacity(initial.len() + 2);
    if initial[0] != b'/' && process::current_directory_confusing() {
        if let Some(cwd) = process::current_directory() {
            path.extend_from_slice(cwd.as_os_str().as_bytes());
            path.push(b'/');
        }
    }
    path.extend_from_slice(initial);
    if path.ends_with(b"/") {
        path.push(b'.');
    }

    Walk {
        sb,
        expected,
        caption,
        fc,
        symlinks: Vec::new(),
    }
    .run(path)
}

/// Like [`explain_path_resolution`], relative paths starting at `dirfd`.
pub fn explain_path_resolution_at(
    sb: &mut StringBuffer,
    expected: i32,
    dirfd: RawFd,
    pathname: &Path,
    caption: &str,
    fc: &FinalComponent,
) -> Verdict {
    if dirfd == libc::AT_FDCWD || pathname.is_absolute() || pathname.as_os_str().is_empty() {
        return explain_path_resolution(sb, expected, pathname, caption, fc);
    }
    match fildes_path(dirfd) {
        Some(dir) => explain_path_resolution(sb, expected, &dir.join(pathname), caption, fc),
        None => Verdict::Undetermined,
    }
}

struct Walk<'a> {
    sb: &'a mut StringBuffer,
    expected: i32,
    caption: &'a str,
    fc: &'a FinalComponent,
    symlinks: Vec<Vec<u8>>,
}

impl Walk<'_> {
    fn run(mut self, mut path: Vec<u8>) -> Verdict {
        let fc = self.fc;
        let id = &fc.identity;
        let mut lookup: Vec<u8> = if path.starts_with(b"/") { b"/".to_vec() } else { b".".to_vec() };
        let mut pos = skip_slashes(&path, 0);

        loop {
            let lookup_name = lossy(&lookup).into_owned();
            let dir_st = match lstat(os(&lookup)) {
                Ok(st) => st,
                Err(Errno::ENOENT) => {
                    write_caption_name_type(self.sb, Some(self.caption), &lookup_name, Some(FileType::Directory));
                    self.sb.puts(" does not exist");
                    return Verdict::Explained;
                }
                Err(_) => return Verdict::Undetermined,
            };
            if FileType::from_mode(dir_st.st_mode) != FileType::Directory {
                write_caption_name_type(self.sb, Some(self.caption), &lookup_name, None);
                self.sb.puts(" is a ");
                write_file_type(self.sb, &dir_st);
                self.sb.puts(", it is not a directory");
                return Verdict::Explained;
            }
            if !have_search_permission(&dir_st, id) {
                self.sb.puts("the process does not have search permission to the ");
                write_caption_name_st(self.sb, Some(self.caption), &lookup_name, &dir_st);
                explain_search_permission(self.sb, &dir_st, id);
                return Verdict::Explained;
            }
            let dir_writable = have_write_permission(&dir_st, id);

            let start = pos;
            while pos < path.len() && path[pos] != b'/' {
                pos += 1;
            }
            let mut component = path[start..pos].to_vec();
            pos = skip_slashes(&path, pos);
            let last = pos >= path.len();

            let name_max = name_max_for(&lookup);
            if self.expected == libc::ENAMETOOLONG
                && !truncates_silently(&lookup)
                && component.len() > name_max
            {
                self.sb.printf(format_args!("{} ", self.caption));
                self.sb.puts_quoted(&lossy(&component));
                self.sb.printf(format_args!(
                    " component is longer than the system limit ({} > {name_max})",
                    component.len()
                ));
                return Verdict::Explained;
            }
            component.truncate(name_max);
            let component_name = lossy(&component).into_owned();

            let intermediate = join(&lookup, &component);
            let st = match lstat(os(&intermediate)) {
                Ok(st) => st,
                Err(errno) => {
                    return self.missing(errno, last, &component_name, &lookup_name, &dir_st, dir_writable)
                }
            };

            if FileType::from_mode(st.st_mode) == FileType::Symlink && (!last || fc.follow_symlink) {
                if let Ok(target) = readlink(os(&intermediate)) {
                    if self.symlinks.contains(&intermediate) {
                        self.sb.printf(format_args!(
                            "a symbolic link loop was encountered in {}, starting at ",
                            self.caption
                        ));
                        self.sb.puts_quoted(&lossy(&intermediate));
                        return Verdict::Explained;
                    }
                    self.symlinks.push(intermediate);

                    let mut target = target.as_bytes().to_vec();
                    if target.is_empty() {
                        target.push(b'.');
                    }
                    let rest = &path[pos..];
                    let next = if rest.is_empty() { target.clone() } else { join(&target, rest) };
                    let resolved = if target.starts_with(b"/") { target.clone() } else { join(&lookup, &target) };
                    if let Err(Errno::ENOENT) = lstat(os(&resolved)) {
                        self.sb.puts("the ");
                        write_caption_name_type(self.sb, None, &component_name, Some(FileType::Symlink));
                        self.sb.puts(" in the ");
                        write_caption_name_st(self.sb, Some(self.caption), &lookup_name, &dir_st);
                        self.sb.puts(" refers to ");
                        self.sb.puts_quoted(&lossy(&target));
                        self.sb.puts(" that does not exist");
                        return Verdict::Explained;
                    }
                    if target.starts_with(b"/") {
                        lookup = b"/".to_vec();
                    }
                    if self.symlinks.len() >= platform().symloop_max {
                        self.sb.printf(format_args!(
                            "too many symbolic links were encountered in {}",
                            self.caption
                        ));
                        if options().dialect_specific {
                            self.sb.printf(format_args!(" ({})", self.symlinks.len()));
                        }
                        return Verdict::Explained;
                    }
                    path = next;
                    pos = skip_slashes(&path, 0);
                    continue;
                }
            }

            if !last {
                if FileType::from_mode(st.st_mode) != FileType::Directory {
                    self.sb.puts("the ");
                    write_caption_name_st(self.sb, None, &component_name, &st);
                    self.sb.puts(" in the ");
                    write_caption_name_st(self.sb, Some(self.caption), &lookup_name, &dir_st);
                    self.sb.puts(" is being used as a directory when it is not");
                    return Verdict::Explained;
                }
                lookup = intermediate;
                continue;
            }

            return self.final_checks(&intermediate, &component_name, &st, &lookup_name, &dir_st, dir_writable);
        }
    }

    /// The component could not be found.
    fn missing(
        &mut self,
        errno: Errno,
        last: bool,
        component: &str,
        dir: &str,
        dir_st: &FileStat,
        dir_writable: bool,
    ) -> Verdict {
        let fc = self.fc;
        if errno != Errno::ENOENT {
            return Verdict::Undetermined;
        }
        if !last {
            self.no_such_entry(component, FileType::Directory, dir, dir_st);
            return Verdict::Explained;
        }
        if fc.must_not_exist {
            if !dir_writable {
                self.new_entry_denied(component, dir, dir_st);
                return Verdict::Explained;
            }
            return Verdict::Undetermined;
        }
        if fc.must_exist {
            self.no_such_entry(component, fc.file_type, dir, dir_st);
            return Verdict::Explained;
        }
        if (self.expected == libc::EACCES || self.expected == libc::EPERM)
            && fc.want_to_create
            && !dir_writable
        {
            self.new_entry_denied(component, dir, dir_st);
            look_for_similar(self.sb, os(dir.as_bytes()), component);
            return Verdict::Explained;
        }
        Verdict::Undetermined
    }

    fn no_such_entry(&mut self, component: &str, kind: FileType, dir: &str, dir_st: &FileStat) {
        self.sb.puts("there is no ");
        write_caption_name_type(self.sb, None, component, Some(kind));
        self.sb.puts(" in the ");
        write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
        look_for_similar(self.sb, os(dir.as_bytes()), component);
    }

    fn new_entry_denied(&mut self, component: &str, dir: &str, dir_st: &FileStat) {
        self.sb.puts("the process does not have write permission to the ");
        write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
        self.sb.puts(", this is needed to create the directory entry for the ");
        write_caption_name_type(self.sb, None, component, Some(self.fc.file_type));
        explain_write_permission(self.sb, dir_st, &self.fc.identity);
    }

    fn denied(&mut self, what: &str, component: &str, st: &FileStat, dir: &str, dir_st: &FileStat) {
        self.sb.printf(format_args!("the process does not have {what} permission to the "));
        write_caption_name_st(self.sb, None, component, st);
        self.sb.puts(" in the ");
        write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
    }

    fn final_checks(
        &mut self,
        full: &[u8],
        component: &str,
        st: &FileStat,
        dir: &str,
        dir_st: &FileStat,
        dir_writable: bool,
    ) -> Verdict {
        let fc = self.fc;
        let id = &fc.identity;
        let kind = FileType::from_mode(st.st_mode);
        let refused = self.expected == libc::EACCES || self.expected == libc::EPERM;

        if fc.must_not_exist {
            self.sb.puts("there is already a ");
            write_file_type(self.sb, st);
            self.sb.putc(' ');
            self.sb.puts_quoted(component);
            self.sb.puts(" in the ");
            write_caption_name_st(self.sb, None, dir, dir_st);
            return Verdict::Explained;
        }

        if let Some(wanted) = fc.must_be_a {
            if kind != wanted {
                self.sb.puts("in the ");
                write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
                self.sb.puts(" there is a ");
                write_caption_name_st(self.sb, None, component, st);
                self.sb.printf(format_args!(", but it should be a {wanted}"));
                return Verdict::Explained;
            }
        }

        if refused && fc.want_to_modify_inode && !have_inode_permission(st, id) {
            self.sb.puts("the process does not have permission to modify the inode of the ");
            write_caption_name_st(self.sb, None, component, st);
            self.sb.puts(" in the ");
            write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
            explain_inode_permission(self.sb, st, id);
            return Verdict::Explained;
        }

        if refused && fc.want_to_unlink && !dir_writable {
            let sticky = dir_st.st_mode & libc::S_ISVTX != 0;
            if !sticky || sticky_denies_unlink(dir_st, st, id) {
                self.sb.puts("the process does not have write permission to the ");
                write_caption_name_st(self.sb, Some(self.caption), dir, dir_st);
                self.sb.puts(", this is needed to remove the directory entry for the ");
                write_caption_name_st(self.sb, None, component, st);
                if sticky {
                    self.sb.puts(", the directory has the sticky bit (S_ISVTX) set and the process ");
                    self.sb.printf(format_args!("{} ", id.uid_caption()));
                    render::uid(self.sb, id.uid);
                    self.sb.puts(" is neither the owner UID ");
                    render::uid(self.sb, st.st_uid);
                    self.sb.puts(" of the ");
                    write_file_type(self.sb, st);
                    self.sb.puts(" to be removed, nor the owner UID ");
                    render::uid(self.sb, dir_st.st_uid);
                    self.sb.puts(" of the directory containing it");
                    if options().dialect_specific {
                        self.sb.printf(format_args!(
                            ", and the process does not have the {} capability",
                            Capability::Fowner
                        ));
                    }
                }
                return Verdict::Explained;
            }
        }

        if self.expected != libc::EACCES {
            return Verdict::Undetermined;
        }

        if kind.is_device()
            && (fc.want_to_read || fc.want_to_write)
            && mount::device_has_option(st.st_dev, "nodev")
        {
            self.sb.puts("the ");
            write_caption_name_st(self.sb, Some(self.caption), component, st);
            self.sb.puts(" is on a file system that is mounted with the \"nodev\" option");
            mount::write_mount_point_dev(self.sb, st.st_dev);
            return Verdict::Explained;
        }

        if fc.want_to_read && !have_read_permission(st, id) {
            self.denied("read", component, st, dir, dir_st);
            explain_read_permission(self.sb, st, id);
            return Verdict::Explained;
        }
        if fc.want_to_write && !have_write_permission(st, id) {
            self.denied("write", component, st, dir, dir_st);
            explain_write_permission(self.sb, st, id);
            return Verdict::Explained;
        }
        if fc.want_to_execute {
            if have_execute_permission(st, id) {
                return self.executable_refused(full, st);
            }
            if kind != FileType::Regular {
                self.sb.puts("it is not possible to execute the ");
                write_caption_name_st(self.sb, Some(self.caption), component, st);
                self.sb.puts(", only regular files can be executed");
                return Verdict::Explained;
            }
            self.denied("execute", component, st, dir, dir_st);
            explain_execute_permission(self.sb, st, id);
            return Verdict::Explained;
        }
        if fc.want_to_search && !have_search_permission(st, id) {
            self.denied("search", component, st, dir, dir_st);
            explain_search_permission(self.sb, st, id);
            return Verdict::Explained;
        }
        Verdict::Undetermined
    }

    /// Execute permission is there, yet exec was refused.
    fn executable_refused(&mut self, full: &[u8], st: &FileStat) -> Verdict {
        let fc = self.fc;
        let full = os(full);
        let overridden = fc.identity.has(Capability::DacOverride);
        if !overridden && mount::device_has_option(st.st_dev, "noexec") {
            self.sb.puts("the executable is on a file system that is mounted with the \"noexec\" option");
            mount::write_mount_point_dev(self.sb, st.st_dev);
            return Verdict::Explained;
        }
        if !overridden
            && st.st_mode & (libc::S_ISUID | libc::S_ISGID) != 0
            && mount::device_has_option(st.st_dev, "nosuid")
        {
            self.sb.puts("the executable is on a file system that is mounted with the \"nosuid\" option");
            mount::write_mount_point_dev(self.sb, st.st_dev);
            return Verdict::Explained;
        }
        let Some((interpreter, _)) = hash_bang(full) else {
            return Verdict::Undetermined;
        };
        if !fc.follow_interpreter {
            self.sb.puts("too many levels of interpreters (");
            self.sb.puts_quoted(&interpreter.to_string_lossy());
            self.sb.putc(')');
            return Verdict::Explained;
        }
        let inner = FinalComponent {
            want_to_execute: true,
            follow_interpreter: false,
            identity: fc.identity.clone(),
            ..FinalComponent::default()
        };
        explain_path_resolution(self.sb, libc::EACCES, &interpreter, "#!", &inner)
    }
}

fn skip_slashes(path: &[u8], mut pos: usize) -> usize {
    while pos < path.len() && path[pos] == b'/' {
        pos += 1;
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use std::os::unix::fs::{symlink, PermissionsExt};
    use tempfile::TempDir;

    fn explain(expected: i32, path: &Path, fc: &FinalComponent) -> (Verdict, String) {
        let mut sb = StringBuffer::default();
        let verdict = explain_path_resolution(&mut sb, expected, path, "pathname", fc);
        let mut text = sb.as_str().to_owned();
        if let Some(footnotes) = sb.footnotes() {
            text.push_str(footnotes);
        }
        (verdict, text)
    }

    #[test]
    fn empty_path() {
        let (verdict, text) = explain(libc::ENOENT, Path::new(""), &FinalComponent::default());
        assert_eq!(verdict, Verdict::Explained);
        assert_eq!(text, "POSIX decrees that an empty pathname must not be resolved successfully");
    }

    #[test]
    fn missing_intermediate_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no-such-dir/some-file");
        let (verdict, text) = explain(libc::ENOENT, &path, &FinalComponent::default());
        assert_eq!(verdict, Verdict::Explained);
        assert!(text.contains("there is no \"no-such-dir\" directory"), "{text}");
    }

    #[test]
    fn missing_final_component_suggests_a_similar_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "").unwrap();
        let (verdict, text) = explain(libc::ENOENT, &dir.path().join("confg.toml"), &FinalComponent::default());
        assert_eq!(verdict, Verdict::Explained);
        assert!(text.contains("there is no \"confg.toml\" regular file"), "{text}");
        assert!(text.contains("; did you mean the \"config.toml\" regular file instead?"), "{text}");
    }

    #[test]
    fn inode_of_someone_elses_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("theirs");
        fs::write(&path, "").unwrap();
        let stranger = nix::unistd::geteuid().as_raw().wrapping_add(1);
        let fc = FinalComponent {
            want_to_modify_inode: true,
            identity: Identity::new(stranger, stranger)
                .with_capabilities(CapabilitySet::EMPTY.with(Capability::DacReadSearch)),
            ..FinalComponent::default()
        };
        let (verdict, text) = explain(libc::EPERM, &path, &fc);
        assert_eq!(verdict, Verdict::Explained);
        assert!(text.starts_with("the process does not have permission to modify the inode of the \"theirs\" regular file"), "{text}");
        assert!(text.contains("does not match the regular file owner UID"), "{text}");
    }

    #[test]
    fn file_used_as_directory() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("plain"), "").unwrap();
        let (_, text) = explain(libc::ENOTDIR, &dir.path().join("plain/inner"), &FinalComponent::default());
        assert!(text.contains("is being used as a directory when it is not"), "{text}");
    }

    #[test]
    fn symlink_loop() {
        let dir = TempDir::new().unwrap();
        symlink("b", dir.path().join("a")).unwrap();
        symlink("a", dir.path().join("b")).unwrap();
        let (verdict, text) = explain(libc::ELOOP, &dir.path().join("a"), &FinalComponent::default());
        assert_eq!(verdict, Verdict::Explained);
        assert!(text.contains("a symbolic link loop was encountered in pathname"), "{text}");
    }

    #[test]
    fn dangling_symlink() {
        let dir = TempDir::new().unwrap();
        symlink("nowhere", dir.path().join("link")).unwrap();
        let (_, text) = explain(libc::ENOENT, &dir.path().join("link"), &FinalComponent::default());
        assert!(text.contains("refers to \"nowhere\" that does not exist"), "{text}");
    }

    #[test]
    fn exclusive_create_of_existing_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("there"), "").unwrap();
        let fc = FinalComponent::from_open_flags(libc::O_WRONLY | libc::O_CREAT | libc::O_EXCL);
        let (_, text) = explain(libc::EEXIST, &dir.path().join("there"), &fc);
        assert!(text.starts_with("there is already a regular file \"there\""), "{text}");
    }

    #[test]
    fn wrong_type_for_directory_open() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("file"), "").unwrap();
        let fc = FinalComponent::from_open_flags(libc::O_RDONLY | libc::O_DIRECTORY);
        let (_, text) = explain(libc::ENOTDIR, &dir.path().join("file"), &fc);
        assert!(text.contains("but it should be a directory"), "{text}");
    }

    #[test]
    fn unreadable_file_for_a_bare_identity() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("secret");
        fs::write(&path, "").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o200)).unwrap();
        let me = nix::unistd::geteuid().as_raw();
        let fc = FinalComponent {
            want_to_read: true,
            identity: Identity::new(me, nix::unistd::getegid().as_raw()),
            ..FinalComponent::default()
        };
        let (verdict, text) = explain(libc::EACCES, &path, &fc);
        assert_eq!(verdict, Verdict::Explained);
        assert!(text.starts_with("the process does not have read permission to the \"secret\" regular file"), "{text}");
    }

    #[test]
    fn name_too_long() {
        let dir = TempDir::new().unwrap();
        let long = "x".repeat(300);
        let (_, text) = explain(libc::ENAMETOOLONG, &dir.path().join(long), &FinalComponent::default());
        assert!(text.contains("component is longer than the system limit (300 > 255)"), "{text}");
    }

    #[test]
    fn open_flags_to_intent() {
        let fc = FinalComponent::from_open_flags(libc::O_RDWR | libc::O_CREAT | libc::O_NOFOLLOW);
        assert!(fc.want_to_read && fc.want_to_write && fc.want_to_create);
        assert!(!fc.must_exist && !fc.must_not_exist && !fc.follow_symlink);
    }
}
