use super::{Args, Call};
use crate::{
    causes::{
        common::{self, write_rlimit, Unit},
        fildes::{explain_ebadf, explain_fildes, Access},
        generic::explain_generic,
    },
    flags,
    platform::platform,
    probe::{self, device::write_file_type, fildes, mount, process},
    render,
    string_buffer::StringBuffer,
    types::{Bytes, FileType},
};
use nix::{
    libc,
    sys::resource::{getrlimit, Resource, RLIM_INFINITY},
};
use std::os::fd::RawFd;

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match *call {
        Call::Mmap { addr, length, prot, flags, fildes, offset } => {
            render::pointer(args.arg("addr"), addr);
            args.arg("length").printf(format_args!("{length}"));
            flags::write_flags(args.arg("prot"), prot, flags::MMAP_PROT, "PROT_NONE");
            flags::write_flags(args.arg("flags"), flags, flags::MMAP_FLAGS, "0");
            if flags & libc::MAP_ANONYMOUS != 0 {
                args.arg("fildes").printf(format_args!("{fildes}"));
            } else {
                render::fildes(args.arg("fildes"), fildes);
            }
            args.arg("offset").printf(format_args!("{offset}"));
        }
        Call::Munmap { addr, length } => {
            render::pointer(args.arg("addr"), addr);
            args.arg("length").printf(format_args!("{length}"));
        }
        Call::Malloc { size } => {
            args.arg("size").printf(format_args!("{size}"));
        }
        Call::Calloc { nmemb, size } => {
            args.arg("nmemb").printf(format_args!("{nmemb}"));
            args.arg("size").printf(format_args!("{size}"));
        }
        _ => {}
    }
    args.finish();
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    match *call {
        Call::Mmap { addr, length, prot, flags, fildes, offset } => {
            explain_mmap(sb, errnum, addr, length, prot, flags, fildes, offset)
        }
        Call::Munmap { addr, length } => match errnum {
            libc::EINVAL => {
                if !explain_alignment(sb, &[("addr", addr as u64)]) {
                    if length == 0 {
                        sb.puts("the length argument is zero");
                    } else {
                        sb.puts("the address range is outside the process address space");
                    }
                }
            }
            _ => explain_generic(sb, errnum, "munmap"),
        },
        Call::Malloc { size } => match errnum {
            libc::ENOMEM => explain_enomem(sb, size as u64),
            _ => explain_generic(sb, errnum, "malloc"),
        },
        Call::Calloc { nmemb, size } => match (errnum, nmemb.checked_mul(size)) {
            (libc::ENOMEM | libc::EOVERFLOW, None) => sb.printf(format_args!(
                "the product of nmemb ({nmemb}) and size ({size}) does not fit in a size_t"
            )),
            (libc::ENOMEM, Some(total)) => explain_enomem(sb, total as u64),
            _ => explain_generic(sb, errnum, "calloc"),
        },
        _ => {}
    }
}

/// Names the first value that is not a multiple of the page size.
fn explain_alignment(sb: &mut StringBuffer, values: &[(&str, u64)]) -> bool {
    let page_size = platform().page_size as u64;
    let Some((caption, _)) = values.iter().find(|(_, value)| value % page_size != 0) else {
        return false;
    };
    sb.printf(format_args!(
        "the {caption} argument must be a multiple of the page size ({page_size})"
    ));
    true
}

/// Says so when `size` more bytes would take the process past RLIMIT_AS.
fn explain_rlimit_exceeded(sb: &mut StringBuffer, size: u64) -> bool {
    let Some((soft, _)) = probe::absorb("getrlimit", getrlimit(Resource::RLIMIT_AS)) else {
        return false;
    };
    if soft == RLIM_INFINITY {
        return false;
    }
    let Some(current) = process::virtual_size() else {
        return false;
    };
    if current.saturating_add(size) <= soft {
        return false;
    }
    sb.puts("the process would exceed its maximum virtual memory size");
    write_rlimit(sb, Resource::RLIMIT_AS, "RLIMIT_AS", Unit::Bytes);
    sb.footnote().printf(format_args!(
        "the process is already using {} of virtual memory",
        Bytes::from(current)
    ));
    true
}

fn explain_enomem(sb: &mut StringBuffer, size: u64) {
    if !explain_rlimit_exceeded(sb, size) {
        common::enomem(sb);
    }
}

fn write_open_mode(sb: &mut StringBuffer, flags: i32) {
    sb.puts(" (");
    flags::write_open_flags(sb, flags);
    sb.putc(')');
}

#[allow(clippy::too_many_arguments)]
fn explain_mmap(
    sb: &mut StringBuffer,
    errnum: i32,
    addr: usize,
    length: usize,
    prot: i32,
    flags: i32,
    fd: RawFd,
    offset: i64,
) {
    let open_flags = fildes::open_flags(fd).map(|flags| flags.bits());
    match errnum {
        libc::EACCES => {
            if let Some(st) = fildes::fstat(fd) {
                if FileType::from_mode(st.st_mode) != FileType::Regular {
                    sb.puts("fildes refers to a ");
                    write_file_type(sb, &st);
                    sb.puts(", only regular files can be mapped");
                    return;
                }
            }
            let Some(omode) = open_flags else {
                explain_generic(sb, errnum, "mmap");
                return;
            };
            let accmode = omode & libc::O_ACCMODE;
            if flags & libc::MAP_PRIVATE != 0 && accmode == libc::O_WRONLY {
                explain_ebadf(sb, fd, "fildes", Access::Read);
            } else if prot & libc::PROT_WRITE != 0 && flags & libc::MAP_SHARED != 0 && accmode != libc::O_RDWR {
                sb.puts("the file descriptor is not open for both reading and writing");
                write_open_mode(sb, omode);
            } else if prot & libc::PROT_WRITE != 0 && omode & libc::O_APPEND != 0 {
                sb.puts("the file descriptor is open for append");
                write_open_mode(sb, omode);
            } else {
                explain_generic(sb, errnum, "mmap");
            }
        }
        libc::EAGAIN => {
            if flags & libc::MAP_LOCKED != 0 && explain_rlimit_exceeded(sb, length as u64) {
                return;
            }
            sb.puts("the file is locked, or too much memory has been locked");
            if flags & libc::MAP_LOCKED != 0 {
                write_rlimit(sb, Resource::RLIMIT_MEMLOCK, "RLIMIT_MEMLOCK", Unit::Bytes);
            }
        }
        libc::EBADF => explain_ebadf(sb, fd, "fildes", Access::Any),
        libc::EINVAL => {
            if explain_alignment(sb, &[("addr", addr as u64), ("offset", offset as u64)]) {
                return;
            }
            if length == 0 {
                sb.puts("the length argument is zero");
                return;
            }
            let sharing = flags & (libc::MAP_PRIVATE | libc::MAP_SHARED);
            if sharing == 0 || sharing == libc::MAP_PRIVATE | libc::MAP_SHARED {
                sb.puts("you must specify exactly one of MAP_PRIVATE or MAP_SHARED");
                return;
            }
            explain_generic(sb, errnum, "mmap");
        }
        libc::ENODEV | libc::EOPNOTSUPP => {
            sb.puts("the underlying file system does not support memory mapping");
            write_mount_of(sb, fd);
        }
        libc::ENOMEM => {
            if !explain_rlimit_exceeded(sb, length as u64) {
                common::enomem_kernel(sb);
            }
        }
        libc::EPERM if prot & libc::PROT_EXEC != 0 => {
            sb.puts("the underlying file system does not permit execution");
            write_mount_of(sb, fd);
        }
        libc::ETXTBSY if flags & libc::MAP_DENYWRITE != 0 => match open_flags {
            Some(omode) if omode & libc::O_ACCMODE != libc::O_RDONLY => {
                sb.puts("the mapping flag MAP_DENYWRITE is incompatible with the open mode of the file descriptor");
                write_open_mode(sb, omode);
            }
            _ => explain_generic(sb, errnum, "mmap"),
        },
        libc::EOVERFLOW => sb.puts(
            "the number of pages used for length plus number of pages used for offset would overflow an unsigned long",
        ),
        libc::ENFILE => common::enfile(sb),
        _ if flags & libc::MAP_ANONYMOUS == 0 && fd >= 0 => {
            explain_fildes(sb, errnum, "mmap", fd, "fildes", Access::Any)
        }
        _ => explain_generic(sb, errnum, "mmap"),
    }
}

fn write_mount_of(sb: &mut StringBuffer, fd: RawFd) {
    if let Some(st) = fildes::fstat(fd) {
        mount::write_mount_point_dev(sb, st.st_dev);
    }
}
