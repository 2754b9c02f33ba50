use super::common;
use crate::{errno_info, options::options, probe::medium, string_buffer::StringBuffer};
use nix::libc;

/// The last resort for any call: the standard cause of `errnum` when there
/// is one, else its description.
pub fn explain_generic(sb: &mut StringBuffer, errnum: i32, syscall_name: &str) {
    match errnum {
        0 => {}
        libc::EAGAIN => common::ewouldblock(sb, syscall_name),
        libc::EMFILE => common::emfile(sb),
        libc::ENFILE => common::enfile(sb),
        libc::EPERM => sb.printf(format_args!(
            "the process does not have the appropriate privileges to use the {syscall_name} system call"
        )),
        libc::EINTR => common::eintr(sb, syscall_name),
        libc::ENOMEDIUM => medium::write_drive(sb, &medium::Drive::Unknown),
        libc::ENOMEM => common::enomem(sb),
        libc::ENOBUFS => common::enobufs(sb),
        libc::ENOSYS | libc::ENOTTY | libc::EOPNOTSUPP => common::enosys(sb, syscall_name),
        libc::ERANGE => common::erange(sb),
        libc::EOVERFLOW => common::eoverflow(sb),
        libc::EFAULT => common::efault_generic(sb),
        libc::EIO => common::eio(sb),
        libc::ENOSPC => common::enospc(sb, None),
        libc::EROFS => sb.puts("write access was requested of a file on a read-only file system"),
        libc::EDQUOT => common::edquot(sb),
        _ => {
            errno_info::write_strerror(sb, errnum);
            if options().debug {
                sb.footnote().puts("something weird happened, cause unknown");
                sb.footnote().printf(format_args!(
                    "this error is not documented for the {syscall_name} system call"
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(errnum: i32, name: &str) -> String {
        let mut sb = StringBuffer::default();
        explain_generic(&mut sb, errnum, name);
        sb.into_string()
    }

    #[test]
    fn eperm_names_the_call() {
        assert_eq!(
            generic(libc::EPERM, "reboot"),
            "the process does not have the appropriate privileges to use the reboot system call"
        );
    }

    #[test]
    fn unlisted_errnos_get_their_description() {
        let text = generic(libc::EXDEV, "read");
        assert!(text.ends_with("(18, EXDEV)"), "{text}");
    }

    #[test]
    fn success_says_nothing() {
        assert!(generic(0, "read").is_empty());
    }
}
