use crate::string_buffer::StringBuffer;
use nix::libc;
use std::{
    fs::{File, OpenOptions},
    os::{
        fd::{AsRawFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::Path,
};

const CDROM_GET_CAPABILITY: libc::c_ulong = 0x5331;
const CDC_DVD: libc::c_int = 0x8000;
const CDC_DVD_R: libc::c_int = 0x10000;
const CDC_DVD_RAM: libc::c_int = 0x20000;

nix::ioctl_none_bad!(cdrom_get_capability, CDROM_GET_CAPABILITY);
nix::ioctl_read!(floppy_drive_type, 2, 0x0f, [u8; 16]);

static FLOPPY_TYPES: &[(&str, &str)] = &[
    ("d360", "360KB PC"),
    ("h1200", "1.2MB AT"),
    ("D360", "360KB SS 3.5\""),
    ("D720", "720KB 3.5\""),
    ("h360", "360KB AT"),
    ("h720", "720KB AT"),
    ("H1440", "1.44MB 3.5\""),
    ("E2880", "2.88MB 3.5\""),
    ("h1440", "1.44MB 5.25\""),
    ("H1680", "1.68MB 3.5\""),
    ("D800", "800KB 3.5\""),
    ("H1600", "1.6MB 3.5\""),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Drive {
    Disc { dvd: bool },
    Floppy(String),
    Unknown,
}

fn open_quietly(path: &Path) -> Option<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .ok()
}

pub fn drive_of(fd: RawFd) -> Drive {
    if let Ok(capability) = unsafe { cdrom_get_capability(fd) } {
        return Drive::Disc {
            dvd: capability & (CDC_DVD | CDC_DVD_R | CDC_DVD_RAM) != 0,
        };
    }
    let mut name = [0u8; 16];
    if unsafe { floppy_drive_type(fd, &mut name) }.is_ok() {
        let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());
        let code = String::from_utf8_lossy(&name[..end]).into_owned();
        let human = FLOPPY_TYPES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, human)| (*human).to_owned())
            .unwrap_or(code);
        return Drive::Floppy(human);
    }
    Drive::Unknown
}

pub fn write_drive(sb: &mut StringBuffer, drive: &Drive) {
    match drive {
        Drive::Disc { dvd } => sb.printf(format_args!(
            "there does not appear to be a disc in the {} drive",
            if *dvd { "DVD" } else { "CD-ROM" }
        )),
        Drive::Floppy(kind) if kind.is_empty() || kind == "(null)" => {
            sb.puts("there does not appear to be a disk in the floppy drive")
        }
        Drive::Floppy(kind) => sb.printf(format_args!(
            "there does not appear to be a disk in the {kind} floppy drive"
        )),
        Drive::Unknown => sb.puts(
            "the disk drive is a type that has removable disks, and there does not appear to be a disk in the drive",
        ),
    }
}

pub fn explain_enomedium_fildes(sb: &mut StringBuffer, fd: RawFd) {
    write_drive(sb, &drive_of(fd));
}

pub fn explain_enomedium_path(sb: &mut StringBuffer, path: &Path) {
    let drive = open_quietly(path)
        .map(|file| drive_of(file.as_raw_fd()))
        .unwrap_or(Drive::Unknown);
    write_drive(sb, &drive);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wording_by_drive() {
        let mut sb = StringBuffer::default();
        write_drive(&mut sb, &Drive::Disc { dvd: true });
        assert_eq!(sb.as_str(), "there does not appear to be a disc in the DVD drive");
        sb.rewind();
        write_drive(&mut sb, &Drive::Floppy("1.44MB 3.5\"".into()));
        assert!(sb.as_str().contains("1.44MB 3.5\" floppy drive"));
        sb.rewind();
        write_drive(&mut sb, &Drive::Unknown);
        assert!(sb.as_str().starts_with("the disk drive is a type that has removable disks"));
    }

    #[test]
    fn ordinary_files_are_not_drives() {
        let file = tempfile::tempfile().unwrap();
        assert_eq!(drive_of(file.as_raw_fd()), Drive::Unknown);
    }
}
