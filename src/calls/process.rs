use super::{Args, Call};
use crate::{
    capability::Capability,
    causes::{
        common::{self, write_rlimit, Unit},
        generic::explain_generic,
        path::explain_path,
    },
    flags,
    identity::Identity,
    path_resolution::{write_caption_name_type, FinalComponent},
    permission::have_execute_permission,
    platform::platform,
    probe::{self, exec, process},
    render,
    string_buffer::StringBuffer,
    types::{Bytes, FileType},
};
use nix::{
    libc,
    sys::{resource::Resource, stat::stat},
    unistd::{getpgrp, getpid, getsid, Pid},
};
use std::{
    env,
    path::{Path, PathBuf},
};

// the PATH listing in the ENOENT explanation is cut short past this
const SEARCH_PATH_TEXT_MAX: usize = 1000;

pub(super) fn write_system_call(call: &Call, sb: &mut StringBuffer) {
    let mut args = Args::start(sb, call.name());
    match *call {
        Call::Execve { pathname, argv, envp } => {
            render::pathname(args.arg("pathname"), pathname);
            render::argv(args.arg("argv"), argv);
            render::argv(args.arg("envp"), envp);
        }
        Call::Execvp { file, argv } => {
            args.arg("pathname").puts_quoted(file);
            render::argv(args.arg("argv"), argv);
        }
        Call::Fork => {}
        Call::Kill { pid, sig } => {
            write_pid(args.arg("pid"), pid);
            render::signal(args.arg("sig"), sig);
        }
        Call::Waitpid { pid, options } => {
            write_pid(args.arg("pid"), pid);
            flags::write_flags(args.arg("options"), options, flags::WAIT_OPTIONS, "0");
        }
        Call::Setpgid { pid, pgid } => {
            write_pid(args.arg("pid"), pid);
            args.arg("pgid").printf(format_args!("{pgid}"));
        }
        Call::Setuid { uid } => render::uid(args.arg("uid"), uid),
        _ => {}
    }
    args.finish();
}

/// `1234 "bash"` for a live process.
fn write_pid(sb: &mut StringBuffer, pid: i32) {
    sb.printf(format_args!("{pid}"));
    if pid > 0 {
        if let Some(name) = process::process_name(pid) {
            sb.putc(' ');
            sb.puts_quoted(&name);
        }
    }
}

pub(super) fn explain_errno(call: &Call, sb: &mut StringBuffer, errnum: i32) {
    match *call {
        Call::Execve { pathname, argv, envp } => explain_execve(sb, errnum, pathname, argv, envp),
        Call::Execvp { file, argv } => explain_execvp_search(sb, errnum, file, argv, &search_path()),
        Call::Fork => explain_fork(sb, errnum),
        Call::Kill { pid, sig } => explain_kill(sb, errnum, pid, sig),
        Call::Waitpid { pid, .. } => explain_waitpid(sb, errnum, pid),
        Call::Setpgid { pid, pgid } => explain_setpgid(sb, errnum, pid, pgid),
        Call::Setuid { uid } => explain_setuid(sb, errnum, uid),
        _ => {}
    }
}

/// `$PATH`, or the system default when it is unset.
pub fn search_path() -> String {
    env::var("PATH").unwrap_or_else(|_| platform().default_search_path.clone())
}

fn env_bytes(strings: &[String]) -> usize {
    strings.iter().map(|s| s.len() + 1).sum::<usize>() + (strings.len() + 1) * size_of::<usize>()
}

pub fn explain_execve(sb: &mut StringBuffer, errnum: i32, pathname: &Path, argv: &[String], envp: &[String]) {
    let fc = FinalComponent {
        want_to_execute: true,
        ..FinalComponent::default()
    };
    match errnum {
        libc::E2BIG => {
            let total = env_bytes(argv) + env_bytes(envp);
            sb.puts("the total number of bytes in the argument list (argv) plus the environment (envp) is too large");
            sb.printf(format_args!(" ({} > {})", Bytes::from(total as u64), Bytes::from(platform().arg_max as u64)));
        }
        libc::ENOEXEC => {
            sb.puts("the executable is not in a recognised format, is for the wrong architecture, or has some other format error that means it cannot be executed");
            if let Some(description) = exec::describe_file(pathname) {
                sb.footnote().printf(format_args!("the file is a {description}"));
            }
        }
        libc::EINVAL => sb.puts("an ELF executable had more than one PT_INTERP segment"),
        libc::EISDIR => sb.puts("an ELF interpreter was a directory, and it is not possible to execute a directory"),
        libc::ELIBBAD => sb.puts("an ELF interpreter was not in a recognised format"),
        libc::EPERM => {
            sb.puts("the file system is mounted nosuid, the user is not the superuser, and the file has the set-user-ID or set-group-ID bit set");
            if probe::stat_path(pathname).is_ok_and(|st| st.st_mode & (libc::S_ISUID | libc::S_ISGID) == 0) {
                sb.puts(", or the process is being traced");
            }
        }
        libc::ENOENT if probe::exists(pathname) => match exec::hash_bang(pathname) {
            Some((interpreter, _)) if !probe::exists(&interpreter) => {
                sb.puts("the ");
                write_caption_name_type(sb, None, &interpreter.to_string_lossy(), Some(FileType::Regular));
                sb.puts(" interpreter named on the first line of the script does not exist");
            }
            _ => sb.puts("an ELF interpreter or shared library needed by the executable could not be found"),
        },
        libc::ETXTBSY => common::etxtbsy(sb, pathname, "pathname"),
        libc::EMFILE | libc::ENFILE | libc::ENOMEM => explain_generic(sb, errnum, "execve"),
        _ => explain_path(sb, errnum, "execve", pathname, "pathname", &fc),
    }
}

// errnos from probing a PATH candidate that mean "look further along"
fn keep_searching(errnum: i32) -> bool {
    matches!(
        errnum,
        libc::ENOENT | libc::ESTALE | libc::ENOTDIR | libc::ENODEV | libc::ETIMEDOUT
    )
}

/// Replays the PATH search execvp(3) makes for `file`, and explains the
/// attempt that reproduces `errnum` as an execve(2) failure.
///
/// The search stops at the first executable candidate, which is the file
/// execvp would have run, unless the failure was EACCES: execvp moves past
/// candidates it may not execute, so then the first candidate that is
/// refused is explained, else the first executable one.
pub fn explain_execvp_search(
    sb: &mut StringBuffer,
    errnum: i32,
    file: &str,
    argv: &[String],
    search_path: &str,
) {
    if file.is_empty() || file.contains('/') {
        explain_execve(sb, errnum, Path::new(file), argv, &[]);
        return;
    }
    if errnum == libc::ENOENT {
        explain_not_on_path(sb, file, search_path);
        return;
    }
    let id = Identity::current();
    let mut first_executable: Option<PathBuf> = None;
    for dir in search_path.split(':') {
        let candidate = if dir.is_empty() { Path::new(".").join(file) } else { Path::new(dir).join(file) };
        let probed = match stat(&candidate) {
            Ok(st) if have_execute_permission(&st, &id) => {
                if errnum != libc::EACCES {
                    explain_candidate(sb, errnum, file, &candidate, argv);
                    return;
                }
                first_executable.get_or_insert(candidate);
                continue;
            }
            Ok(_) => libc::EACCES,
            Err(errno) => errno as i32,
        };
        tracing::debug!(candidate = %candidate.display(), probed, "execvp replay");
        if probed == errnum || (probed != libc::EACCES && !keep_searching(probed)) {
            explain_candidate(sb, errnum, file, &candidate, argv);
            return;
        }
    }
    match first_executable {
        Some(candidate) => explain_candidate(sb, errnum, file, &candidate, argv),
        None => explain_execve(sb, errnum, Path::new(file), argv, &[]),
    }
}

fn explain_candidate(sb: &mut StringBuffer, errnum: i32, file: &str, candidate: &Path, argv: &[String]) {
    explain_execve(sb, errnum, candidate, argv, &[]);
    let footnote = sb.footnote();
    footnote.puts("the command search PATH resolved ");
    footnote.puts_quoted(file);
    footnote.puts(" to ");
    footnote.puts_quoted(&candidate.to_string_lossy());
}

fn explain_not_on_path(sb: &mut StringBuffer, file: &str, search_path: &str) {
    let mut listing = StringBuffer::new(SEARCH_PATH_TEXT_MAX);
    for dir in search_path.split(':') {
        if !listing.is_empty() {
            listing.puts(", ");
        }
        if !listing.is_empty() && listing.position() + dir.len() + 5 > listing.maximum() {
            listing.puts("...");
            break;
        }
        listing.puts_quoted(if dir.is_empty() { "." } else { dir });
    }
    sb.puts("there is no ");
    write_caption_name_type(sb, None, file, Some(FileType::Regular));
    sb.printf(format_args!(
        " in any of the command search PATH directories ({listing})"
    ));
}

fn explain_fork(sb: &mut StringBuffer, errnum: i32) {
    match errnum {
        libc::EAGAIN => {
            sb.puts("the system lacked the necessary resources to create another process, or the process would exceed the limit on the number of processes");
            write_rlimit(sb, Resource::RLIMIT_NPROC, "RLIMIT_NPROC", Unit::Count);
            let uid = Identity::current().uid;
            if let Some(count) = process::user_process_count(uid) {
                sb.footnote().printf(format_args!("the user currently has {count} processes"));
            }
        }
        libc::ENOMEM => common::enomem_kernel(sb),
        _ => explain_generic(sb, errnum, "fork"),
    }
}

fn explain_kill(sb: &mut StringBuffer, errnum: i32, pid: i32, sig: i32) {
    match errnum {
        libc::EINVAL => sb.printf(format_args!("the sig argument ({sig}) is not a valid signal number")),
        libc::ESRCH if pid < -1 => sb.printf(format_args!("process group {} does not exist", -pid)),
        libc::ESRCH => sb.puts("the pid argument does not refer to an existing process"),
        libc::EPERM => {
            sb.puts("the process does not have permission to send the signal to the target process");
            let id = Identity::current();
            if let Some((real, effective, _)) = process::uids(pid) {
                sb.puts(", the process ");
                sb.printf(format_args!("{} ", id.uid_caption()));
                render::uid(sb, id.uid);
                sb.puts(" matches neither the real UID ");
                render::uid(sb, real);
                sb.puts(" nor the saved set-user-ID of the target process");
                if effective != real {
                    sb.puts(" (the target is running set-user-ID)");
                }
            }
            common::capability_note(sb, Capability::Kill);
        }
        _ => explain_generic(sb, errnum, "kill"),
    }
}

fn explain_waitpid(sb: &mut StringBuffer, errnum: i32, pid: i32) {
    let me = getpid().as_raw();
    match errnum {
        libc::ECHILD if pid > 0 && process::exists(pid) => {
            sb.puts("the process specified by pid is not a child of this process");
            if let Some(parent) = process::parent_of(pid) {
                sb.printf(format_args!(", its parent is process {parent}"));
                if parent == me {
                    sb.puts(", it may already have been waited for");
                }
            }
        }
        libc::ECHILD if pid > 0 => sb.puts("the process specified by pid does not exist"),
        libc::ECHILD if pid == -1 => sb.puts("the process does not have any unwaited-for child processes"),
        libc::ECHILD => {
            let group = if pid == 0 { getpgrp().as_raw() } else { -pid };
            sb.printf(format_args!(
                "process group {group} does not have any member process that is a child of this process"
            ));
        }
        libc::EINTR => sb.puts("WNOHANG was not set and an unblocked signal or a SIGCHLD was caught"),
        libc::EINVAL => sb.puts("the options argument was invalid"),
        _ => explain_generic(sb, errnum, "waitpid"),
    }
}

fn explain_setpgid(sb: &mut StringBuffer, errnum: i32, pid: i32, pgid: i32) {
    let me = getpid().as_raw();
    let target = if pid == 0 { me } else { pid };
    match errnum {
        libc::EACCES => sb.puts("an attempt was made to change the process group ID of one of the children of the calling process and the child had already performed an execve"),
        libc::EINVAL => sb.printf(format_args!("pgid is less than 0 ({pgid})")),
        libc::EPERM if getsid(Some(Pid::from_raw(target))).ok() == Some(Pid::from_raw(target)) => {
            sb.puts("an attempt was made to change the process group ID of a session leader")
        }
        libc::EPERM => sb.puts("an attempt was made to move a process into a process group in a different session, or to change the process group ID of one of the children of the calling process and the child was in a different session"),
        libc::ESRCH => sb.puts("pid is not the calling process and not a child of the calling process"),
        _ => explain_generic(sb, errnum, "setpgid"),
    }
}

fn explain_setuid(sb: &mut StringBuffer, errnum: i32, uid: u32) {
    match errnum {
        libc::EAGAIN => {
            sb.puts("the uid does not match the current uid and this uid would put the user over its RLIMIT_NPROC resource limit");
            write_rlimit(sb, Resource::RLIMIT_NPROC, "RLIMIT_NPROC", Unit::Count);
            if let Some(count) = process::user_process_count(uid) {
                sb.footnote().printf(format_args!("the user currently has {count} processes"));
            }
        }
        libc::EINVAL => sb.puts("the uid is not valid in this user namespace"),
        libc::EPERM => {
            sb.puts("the process is not privileged and uid does not match the real UID or saved set-user-ID of the process");
            common::capability_note(sb, Capability::Setuid);
        }
        _ => explain_generic(sb, errnum, "setuid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calls::explain_errno;
    use std::{fs, os::unix::fs::PermissionsExt};
    use tempfile::TempDir;

    fn execvp_text(errnum: i32, file: &str, path: &str) -> String {
        let mut sb = StringBuffer::default();
        explain_execvp_search(&mut sb, errnum, file, &[file.to_owned()], path);
        sb.into_string()
    }

    #[test]
    fn missing_command_lists_the_search_path() {
        let text = execvp_text(libc::ENOENT, "no-such-command", ".:/bin:/usr/bin");
        assert_eq!(
            text,
            "there is no \"no-such-command\" regular file in any of the command search PATH directories (\".\", \"/bin\", \"/usr/bin\")"
        );
    }

    #[test]
    fn empty_path_entries_mean_the_current_directory() {
        let text = execvp_text(libc::ENOENT, "cmd", ":/bin");
        assert!(text.ends_with("(\".\", \"/bin\")"), "{text}");
    }

    #[test]
    fn non_executable_candidate_is_the_culprit() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("tool");
        fs::write(&script, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o644)).unwrap();
        let path = format!("/nonexistent-bin:{}", dir.path().display());
        let text = execvp_text(libc::EACCES, "tool", &path);
        if Identity::current().has(Capability::DacOverride) {
            return;
        }
        assert!(text.contains("execute permission"), "{text}");
        assert!(text.contains("\"tool\" regular file"), "{text}");
    }

    #[test]
    fn the_file_execvp_would_run_is_examined() {
        let dir = TempDir::new().unwrap();
        let tool = dir.path().join("tooly");
        fs::write(&tool, [0u8, 1, 2, 3]).unwrap();
        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        let path = format!("/nonexistent-bin:{}", dir.path().display());
        let mut sb = StringBuffer::default();
        explain_execvp_search(&mut sb, libc::ETXTBSY, "tooly", &["tooly".to_owned()], &path);
        assert!(sb.as_str().starts_with("pathname refers to an executable image"), "{sb}");
        let expected = format!("resolved \"tooly\" to \"{}\"", tool.display());
        assert!(sb.footnotes().unwrap().contains(&expected), "{:?}", sb.footnotes());
    }

    #[test]
    fn slash_means_no_search() {
        let text = execvp_text(libc::ENOENT, "./definitely-missing", "/bin");
        assert!(text.contains("there is no \"definitely-missing\" regular file"), "{text}");
    }

    #[test]
    fn kill_renders_signal_names() {
        let call = Call::Kill { pid: -5, sig: libc::SIGTERM };
        let mut sb = StringBuffer::default();
        call.write_system_call(&mut sb);
        assert_eq!(sb.as_str(), "kill(pid = -5, sig = SIGTERM)");
        assert!(explain_errno(&call, libc::ESRCH).ends_with("process group 5 does not exist"));
    }

    #[test]
    fn waitpid_without_children() {
        let call = Call::Waitpid { pid: -1, options: libc::WNOHANG };
        let message = explain_errno(&call, libc::ECHILD);
        assert!(message.starts_with("waitpid(pid = -1, options = WNOHANG) failed"), "{message}");
        assert!(message.ends_with("the process does not have any unwaited-for child processes"));
    }
}
