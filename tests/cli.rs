use std::process::{Command, Output};

fn explain(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_explain"))
        .args(["--no-color", "--width", "500"])
        .args(args)
        .env_remove("EXPLAIN_OPTIONS")
        .env_remove("LIBEXPLAIN_OPTIONS")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn explains_a_call_from_the_command_line() {
    let output = explain(&["-e", "ENOENT", "open", "no-such-dir/some-file", "O_RDONLY"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.starts_with("open(pathname = \"no-such-dir/some-file\", flags = O_RDONLY) failed"), "{text}");
    assert!(text.contains("\"no-such-dir\""), "{text}");
}

#[test]
fn errno_alone_is_described() {
    let output = explain(&["-e", "EBADF"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "Bad file descriptor (9, EBADF)\n");
}

#[test]
fn options_flag_overrides_the_environment() {
    let output = explain(&["-o", "no-numeric-errno", "-e", "9"]);
    assert_eq!(stdout(&output), "Bad file descriptor (EBADF)\n");
}

#[test]
fn exec_calls_echo_the_command() {
    let output = explain(&["-e", "ENOENT", "execvp", "no-such-command", "no-such-command", "two words"]);
    let text = stdout(&output);
    assert!(text.starts_with("$ no-such-command 'two words'\n"), "{text}");
    assert!(text.contains("command search PATH directories"), "{text}");
}

#[test]
fn lists_the_supported_calls() {
    let output = explain(&["--list"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for name in ["open", "execvp", "mmap", "setenv"] {
        assert!(text.contains(name), "{name} missing");
    }
    assert!(text.contains("File Descriptor"));
}

#[test]
fn misspelled_call_is_corrected() {
    let output = explain(&["-e", "ENOENT", "unlnk", "x"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("did you mean \"unlink\""), "{stderr}");
}

#[test]
fn call_without_errno_is_refused() {
    let output = explain(&["close", "3"]);
    assert!(!output.status.success());
}
