use super::{Args, Call};
use crate::{
    causes::{common, generic::explain_generic},
    string_buffer::StringBuffer,
    types::Bytes,
};
use nix::libc;
use std::env;

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match *call {
        Call::Setenv { name, value, overwrite } => {
            args.arg("name").puts_quoted(name);
            args.arg("value").puts_quoted(value);
            args.arg("overwrite").printf(format_args!("{}", i32::from(overwrite)));
        }
        Call::Unsetenv { name } => args.arg("name").puts_quoted(name),
        _ => {}
    }
    args.finish();
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    match *call {
        Call::Setenv { name, .. } | Call::Unsetenv { name } => match errnum {
            libc::EINVAL => explain_bad_name(sb, name),
            libc::ENOMEM => {
                sb.puts("insufficient space to allocate the new environment");
                common::write_rlimit(
                    sb,
                    nix::sys::resource::Resource::RLIMIT_AS,
                    "RLIMIT_AS",
                    common::Unit::Bytes,
                );
                let (count, bytes) = environment_size();
                sb.footnote().printf(format_args!(
                    "the environment already holds {count} variables in {}",
                    Bytes::from(bytes as u64)
                ));
            }
            _ => explain_generic(sb, errnum, call.name()),
        },
        _ => {}
    }
}

fn explain_bad_name(sb: &mut StringBuffer, name: &str) {
    if name.is_empty() {
        sb.puts("name is the empty string");
    } else if let Some(at) = name.find('=') {
        sb.printf(format_args!(
            "name contains an equals sign ('=') at offset {at}, it may not contain one"
        ));
    } else {
        sb.puts("name is a NULL pointer, or the empty string, or contains an equals sign ('=')");
    }
}

/// How many variables the environment holds and how many bytes of
/// `NAME=value\0` strings that comes to.
fn environment_size() -> (usize, usize) {
    env::vars_os().fold((0, 0), |(count, bytes), (name, value)| {
        (count + 1, bytes + name.len() + value.len() + 2)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;

    #[test]
    fn setenv_rendering() {
        let call = Call::Setenv { name: "LANG", value: "C", overwrite: true };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        assert_eq!(sb.as_str(), "setenv(name = \"LANG\", value = \"C\", overwrite = 1)");
    }

    #[test]
    fn names_may_not_hold_equals() {
        let call = Call::Setenv { name: "A=B", value: "x", overwrite: false };
        let message = explain_errno(&call, libc::EINVAL);
        assert!(message.ends_with("name contains an equals sign ('=') at offset 1, it may not contain one"), "{message}");
    }

    #[test]
    fn empty_name_for_unsetenv() {
        let call = Call::Unsetenv { name: "" };
        assert!(explain_errno(&call, libc::EINVAL).ends_with("because name is the empty string"));
    }
}
