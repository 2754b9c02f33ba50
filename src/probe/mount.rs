use super::absorb;
use crate::string_buffer::StringBuffer;
use nix::sys::{
    stat::{major, minor, stat},
    statvfs::statvfs,
};
use procfs::process::{MountInfo, Process};
use std::path::{Path, PathBuf};

/// The mount holding device `dev`. With several mounts of the same device
/// the most recently mounted one is taken.
pub fn mount_for_device(dev: u64) -> Option<MountInfo> {
    let majmin = format!("{}:{}", major(dev), minor(dev));
    let process = absorb("myself", Process::myself())?;
    let mounts = absorb("mountinfo", process.mountinfo())?;
    mounts.into_iter().filter(|mount| mount.majmin == majmin).last()
}

/// The mount holding `path`: of the mounts of its device, the deepest one
/// that is an ancestor of the path.
pub fn mount_for_path(path: &Path) -> Option<MountInfo> {
    let st = stat(path).ok()?;
    let Ok(path) = path.canonicalize() else {
        return mount_for_device(st.st_dev);
    };
    let majmin = format!("{}:{}", major(st.st_dev), minor(st.st_dev));
    let process = absorb("myself", Process::myself())?;
    let mounts = absorb("mountinfo", process.mountinfo())?;
    mounts
        .into_iter()
        .filter(|mount| mount.majmin == majmin && path.starts_with(&mount.mount_point))
        .max_by_key(|mount| mount.mount_point.components().count())
        .or_else(|| mount_for_device(st.st_dev))
}

pub fn mount_point(path: &Path) -> Option<PathBuf> {
    mount_for_path(path).map(|mount| mount.mount_point)
}

/// Whether the mount holding `dev` carries `option`, e.g. `noexec`.
pub fn device_has_option(dev: u64, option: &str) -> bool {
    mount_for_device(dev).is_some_and(|mount| {
        mount.mount_options.contains_key(option) || mount.super_options.contains_key(option)
    })
}

/// Percentage of the usable blocks in use, the way df(1) counts it.
pub fn percent_full(mount_point: &Path) -> Option<u32> {
    let vfs = absorb("statvfs", statvfs(mount_point))?;
    let total = vfs.blocks() as i64;
    let free = vfs.blocks_free() as i64;
    let available = vfs.blocks_available() as i64;
    let reserved = (free - available).max(0);
    let blocks = total - reserved;
    let used = blocks - available;
    (blocks > 0 && (0..=total).contains(&used))
        .then(|| (0.5 + 100.0 * used as f64 / blocks as f64) as u32)
}

/// Writes ` ("/home", 87% full)` for the mount holding `dev`, nothing when
/// it cannot be found.
pub fn write_mount_point_dev(sb: &mut StringBuffer, dev: u64) -> bool {
    match mount_for_device(dev) {
        Some(mount) => write_mount(sb, &mount),
        None => false,
    }
}

fn write_mount(sb: &mut StringBuffer, mount: &MountInfo) -> bool {
    sb.puts(" (");
    sb.puts_quoted(&mount.mount_point.to_string_lossy());
    if let Some(percent) = percent_full(&mount.mount_point) {
        sb.printf(format_args!(", {percent}% full"));
    }
    sb.putc(')');
    true
}

pub fn write_mount_point(sb: &mut StringBuffer, path: &Path) -> bool {
    match mount_for_path(path) {
        Some(mount) => write_mount(sb, &mount),
        None => false,
    }
}

/// Like [`write_mount_point`], for the directory that would hold `path`.
pub fn write_mount_point_dirname(sb: &mut StringBuffer, path: &Path) -> bool {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    write_mount_point(sb, parent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_mounted() {
        assert_eq!(mount_point(Path::new("/")), Some(PathBuf::from("/")));
    }

    #[test]
    fn mount_point_text() {
        let mut sb = StringBuffer::default();
        if write_mount_point(&mut sb, Path::new("/")) {
            assert!(sb.as_str().starts_with(" (\"/\""), "{sb}");
            assert!(sb.as_str().ends_with(')'));
        }
    }

    #[test]
    fn missing_path_writes_nothing() {
        let mut sb = StringBuffer::default();
        assert!(!write_mount_point(&mut sb, Path::new("/no/such/path/anywhere")));
        assert!(sb.is_empty());
    }
}
