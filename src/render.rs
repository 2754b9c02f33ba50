use crate::{
    identity::{group_name, user_name},
    options::options,
    probe::fildes::describe_fildes,
    string_buffer::StringBuffer,
};
use nix::{libc, sys::signal::Signal};
use std::{os::fd::RawFd, path::Path};

// argv renderings stop after roughly this much text
const ARGV_BUDGET: usize = 1000;

pub fn pointer(sb: &mut StringBuffer, address: usize) {
    if address == 0 {
        sb.puts("NULL");
    } else {
        sb.printf(format_args!("{:#x}", address));
    }
}

pub fn pathname(sb: &mut StringBuffer, path: &Path) {
    sb.puts_quoted(&path.to_string_lossy());
}

pub fn fildes(sb: &mut StringBuffer, fd: RawFd) {
    sb.printf(format_args!("{fd}"));
    if fd == libc::AT_FDCWD {
        sb.puts(" AT_FDCWD");
        return;
    }
    if let Some(target) = describe_fildes(fd) {
        sb.putc(' ');
        sb.puts_quoted(&target);
    }
}

pub fn uid(sb: &mut StringBuffer, uid: u32) {
    sb.printf(format_args!("{uid}"));
    if let Some(name) = user_name(uid) {
        sb.putc(' ');
        sb.puts_quoted(&name);
    }
}

pub fn gid(sb: &mut StringBuffer, gid: u32) {
    sb.printf(format_args!("{gid}"));
    if let Some(name) = group_name(gid) {
        sb.putc(' ');
        sb.puts_quoted(&name);
    }
}

pub fn rwx(bits: u32) -> &'static str {
    ["---", "--x", "-w-", "-wx", "r--", "r-x", "rw-", "rwx"][(bits & 7) as usize]
}

static MODE_BITS: &[(u32, &str)] = &[
    (libc::S_ISUID, "S_ISUID"),
    (libc::S_ISGID, "S_ISGID"),
    (libc::S_ISVTX, "S_ISVTX"),
    (libc::S_IRUSR, "S_IRUSR"),
    (libc::S_IWUSR, "S_IWUSR"),
    (libc::S_IXUSR, "S_IXUSR"),
    (libc::S_IRGRP, "S_IRGRP"),
    (libc::S_IWGRP, "S_IWGRP"),
    (libc::S_IXGRP, "S_IXGRP"),
    (libc::S_IROTH, "S_IROTH"),
    (libc::S_IWOTH, "S_IWOTH"),
    (libc::S_IXOTH, "S_IXOTH"),
];

/// Octal by default, `S_IRUSR | S_IWUSR` with the `symbolic-mode-bits` option.
pub fn permission_mode(sb: &mut StringBuffer, mode: u32) {
    if mode == 0 {
        sb.putc('0');
        return;
    }
    if !options().symbolic_mode_bits {
        sb.printf(format_args!("0{mode:o}"));
        return;
    }
    let mut remaining = mode;
    let mut first = true;
    for &(bit, name) in MODE_BITS {
        if remaining & bit != 0 {
            if !first {
                sb.puts(" | ");
            }
            sb.puts(name);
            remaining &= !bit;
            first = false;
        }
    }
    if remaining != 0 {
        if !first {
            sb.puts(" | ");
        }
        sb.printf(format_args!("0{remaining:o}"));
    }
}

pub fn signal_name(signum: i32) -> Option<String> {
    if let Ok(signal) = Signal::try_from(signum) {
        return Some(signal.as_str().to_owned());
    }
    let (low, high) = (libc::SIGRTMIN(), libc::SIGRTMAX());
    if signum == low {
        Some("SIGRTMIN".to_owned())
    } else if signum > low && signum <= high {
        Some(format!("SIGRTMIN+{}", signum - low))
    } else {
        None
    }
}

pub fn signal(sb: &mut StringBuffer, signum: i32) {
    match signal_name(signum) {
        Some(name) => sb.puts(&name),
        None => sb.printf(format_args!("{signum}")),
    }
}

/// Accepts `SIGKILL`, `KILL`, `SIGRTMIN+3` or a number.
pub fn parse_signal(text: &str) -> Option<i32> {
    if let Ok(number) = text.parse::<i32>() {
        return Some(number);
    }
    let upper = text.to_ascii_uppercase();
    let name = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    if let Some(offset) = name.strip_prefix("SIGRTMIN+") {
        let signum = libc::SIGRTMIN().checked_add(offset.parse::<i32>().ok()?)?;
        return (libc::SIGRTMIN()..=libc::SIGRTMAX()).contains(&signum).then_some(signum);
    }
    if name == "SIGRTMIN" {
        return Some(libc::SIGRTMIN());
    }
    name.parse::<Signal>().ok().map(|signal| signal as i32)
}

/// `["ls", "-l"]`, cut short once it gets long.
pub fn argv(sb: &mut StringBuffer, argv: &[String]) {
    sb.putc('[');
    let start = sb.position();
    for (index, arg) in argv.iter().enumerate() {
        if index > 0 {
            sb.puts(", ");
        }
        if sb.position() - start > ARGV_BUDGET {
            let rest = argv.len() - index;
            sb.printf(format_args!("... plus another {rest} command line argument"));
            if rest != 1 {
                sb.putc('s');
            }
            break;
        }
        sb.puts_quoted(arg);
    }
    sb.putc(']');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_addresses() {
        let mut sb = StringBuffer::default();
        pointer(&mut sb, 0);
        sb.puts(" ");
        pointer(&mut sb, 0x7f00);
        assert_eq!(sb.as_str(), "NULL 0x7f00");
    }

    #[test]
    fn rwx_strings() {
        assert_eq!(rwx(0o6), "rw-");
        assert_eq!(rwx(0o1), "--x");
        assert_eq!(rwx(0o7), "rwx");
    }

    #[test]
    fn signals_by_name() {
        assert_eq!(signal_name(libc::SIGKILL).as_deref(), Some("SIGKILL"));
        assert_eq!(parse_signal("term"), Some(libc::SIGTERM));
        assert_eq!(parse_signal("SIGRTMIN+2"), Some(libc::SIGRTMIN() + 2));
        assert_eq!(signal_name(libc::SIGRTMIN() + 2).as_deref(), Some("SIGRTMIN+2"));
        assert_eq!(parse_signal("SIGBOGUS"), None);
        assert_eq!(parse_signal("SIGRTMIN+2147483647"), None);
        assert_eq!(parse_signal("SIGRTMIN+-1"), None);
        assert_eq!(parse_signal("SIGRTMIN+200"), None);
    }

    #[test]
    fn long_argv_is_summarised() {
        let args: Vec<String> = (0..500).map(|n| format!("argument-{n}")).collect();
        let mut sb = StringBuffer::default();
        argv(&mut sb, &args);
        assert!(sb.as_str().contains("command line arguments"));
        assert!(sb.as_str().ends_with(']'));
    }

    #[test]
    fn octal_modes() {
        let mut sb = StringBuffer::default();
        permission_mode(&mut sb, 0o644);
        assert_eq!(sb.as_str(), "0644");
    }
}
