use nix::libc;
use rustix::system::uname;
use std::{ffi::CStr, sync::OnceLock};

pub const DEFAULT_SEARCH_PATH: &str = ".:/bin:/usr/bin";

#[derive(Debug, Clone)]
pub struct Platform {
    pub release: String,
    pub page_size: usize,
    pub path_max: usize,
    pub name_max: usize,
    pub symloop_max: usize,
    pub arg_max: usize,
    pub default_search_path: String,
    pub has_proc: bool,
}

static PLATFORM: OnceLock<Platform> = OnceLock::new();

pub fn platform() -> &'static Platform {
    PLATFORM.get_or_init(detect)
}

fn detect() -> Platform {
    let uts = uname();
    Platform {
        release: uts.release().to_string_lossy().into_owned(),
        page_size: page_size::get(),
        path_max: libc::PATH_MAX as usize,
        name_max: 255,
        symloop_max: sysconf_or(libc::_SC_SYMLOOP_MAX, 40),
        arg_max: sysconf_or(libc::_SC_ARG_MAX, 131072),
        default_search_path: confstr_path().unwrap_or_else(|| DEFAULT_SEARCH_PATH.to_owned()),
        has_proc: procfs::process::Process::myself().is_ok(),
    }
}

fn sysconf_or(name: libc::c_int, fallback: usize) -> usize {
    // -1 means indeterminate, which Linux reports for SYMLOOP_MAX
    match unsafe { libc::sysconf(name) } {
        value if value > 0 => value as usize,
        _ => fallback,
    }
}

// _CS_PATH in both glibc and musl
const CS_PATH: libc::c_int = 0;

extern "C" {
    fn confstr(name: libc::c_int, buf: *mut libc::c_char, len: libc::size_t) -> libc::size_t;
}

fn confstr_path() -> Option<String> {
    let mut buffer = [0u8; 512];
    let needed = unsafe {
        confstr(
            CS_PATH,
            buffer.as_mut_ptr().cast::<libc::c_char>(),
            buffer.len(),
        )
    };
    if needed == 0 || needed > buffer.len() {
        return None;
    }
    let path = CStr::from_bytes_until_nul(&buffer).ok()?.to_str().ok()?;
    (!path.is_empty()).then(|| path.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_fills_every_limit() {
        let platform = platform();
        assert!(platform.page_size >= 4096);
        assert!(platform.symloop_max > 0);
        assert!(platform.arg_max > 0);
        assert!(!platform.default_search_path.is_empty());
        assert_eq!(platform.has_proc, std::path::Path::new("/proc/self/stat").exists());
    }
}
