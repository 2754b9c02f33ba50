pub mod device;
pub mod exec;
pub mod fildes;
pub mod medium;
pub mod mount;
pub mod process;

use nix::sys::stat::{lstat, stat, FileStat};
use std::{fmt::Display, path::Path};

/// Turns a probe failure into `None`, leaving a trace of it.
pub(crate) fn absorb<T, E: Display>(what: &str, result: Result<T, E>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            tracing::debug!(probe = what, %error, "probe failed");
            None
        }
    }
}

pub fn stat_path(path: &Path) -> Result<FileStat, nix::errno::Errno> {
    stat(path)
}

pub fn lstat_path(path: &Path) -> Result<FileStat, nix::errno::Errno> {
    lstat(path)
}

pub fn exists(path: &Path) -> bool {
    lstat(path).is_ok()
}
