use crate::{options::options, string_buffer::StringBuffer, types::FileType};
use nix::sys::stat::{major, minor, FileStat};
use std::{fs, path::Path};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceClass {
    Character,
    Block,
}

impl DeviceClass {
    fn section(self) -> &'static str {
        match self {
            DeviceClass::Character => "Character devices:",
            DeviceClass::Block => "Block devices:",
        }
    }

    fn sys_dir(self) -> &'static str {
        match self {
            DeviceClass::Character => "char",
            DeviceClass::Block => "block",
        }
    }
}

/// The driver registered for `major` in a `/proc/devices` listing.
pub fn driver_in(listing: &str, class: DeviceClass, major: u64) -> Option<String> {
    let mut lines = listing.lines().skip_while(|line| line.trim() != class.section());
    lines.next()?;
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        let mut fields = line.split_whitespace();
        let number = fields.next().and_then(|n| n.parse::<u64>().ok());
        let name = fields.next();
        if let (Some(number), Some(name)) = (number, name) {
            if number == major && !name.starts_with('/') {
                return Some(name.to_owned());
            }
        }
    }
    None
}

pub fn driver_name(class: DeviceClass, rdev: u64) -> Option<String> {
    let listing = fs::read_to_string("/proc/devices").ok()?;
    driver_in(&listing, class, major(rdev))
}

/// Whether sysfs places the device somewhere under a USB bus.
pub fn is_usb(class: DeviceClass, rdev: u64) -> bool {
    let link = format!("/sys/dev/{}/{}:{}", class.sys_dir(), major(rdev), minor(rdev));
    fs::read_link(Path::new(&link)).is_ok_and(|target| target.to_string_lossy().contains("usb"))
}

/// The file type of `st`, devices with their driver when the
/// `extra-device-info` option allows: `usb sd block special device`.
pub fn write_file_type(sb: &mut StringBuffer, st: &FileStat) {
    let kind = FileType::from_mode(st.st_mode);
    let class = match kind {
        FileType::CharDevice => Some(DeviceClass::Character),
        FileType::BlockDevice => Some(DeviceClass::Block),
        _ => None,
    };
    if let (Some(class), true) = (class, options().extra_device_info) {
        if is_usb(class, st.st_rdev) {
            sb.puts("usb ");
        }
        if let Some(driver) = driver_name(class, st.st_rdev) {
            sb.puts(&driver);
            sb.putc(' ');
        }
    }
    sb.printf(format_args!("{kind}"));
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Character devices:\n  1 mem\n  4 /dev/vc/0\n  4 tty\n 10 misc\n\nBlock devices:\n  7 loop\n  8 sd\n";

    #[test]
    fn drivers_by_major() {
        assert_eq!(driver_in(LISTING, DeviceClass::Character, 1).as_deref(), Some("mem"));
        assert_eq!(driver_in(LISTING, DeviceClass::Character, 4).as_deref(), Some("tty"));
        assert_eq!(driver_in(LISTING, DeviceClass::Block, 8).as_deref(), Some("sd"));
        assert_eq!(driver_in(LISTING, DeviceClass::Block, 1), None);
    }

    #[test]
    fn dev_null_is_a_mem_device() {
        let st = nix::sys::stat::stat("/dev/null").unwrap();
        let mut sb = StringBuffer::default();
        write_file_type(&mut sb, &st);
        assert!(sb.as_str().ends_with("character special device"), "{sb}");
    }
}
