use std::{
    fs,
    io::Write,
    path::Path,
    process::{Child, Command, Output, Stdio},
    thread,
    time::Duration,
};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use tempfile::TempDir;

fn spawn_in(dir: &Path) -> Child {
    Command::new(env!("CARGO_BIN_EXE_smallsh"))
        .current_dir(dir)
        .env("SMALLSH_CONFIG", dir.join("config.json"))
        .env("HOME", dir)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start smallsh")
}

fn run_script(dir: &Path, script: &str) -> Output {
    let mut child = spawn_in(dir);
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// True while `pid` exists and is not a zombie. The orphaned child may never
/// be reaped inside a container, so a zombie counts as dead.
fn is_running(pid: i32) -> bool {
    if kill(Pid::from_raw(pid), None).is_err() {
        return false;
    }
    match fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rsplit_once(')')
            .and_then(|(_, rest)| rest.split_whitespace().next())
            .is_some_and(|state| state != "Z" && state != "X"),
        Err(_) => false,
    }
}

#[test]
fn runs_external_command_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "echo hello world\nexit\n");
    assert!(out.status.success());
    assert!(stdout(&out).contains("hello world\n"));
}

#[test]
fn end_of_input_exits_with_zero() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "echo bye\n");
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn comments_and_blank_lines_do_nothing() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "# echo hidden\n\n   \necho shown\n");
    let text = stdout(&out);
    assert!(!text.contains("hidden"));
    assert!(text.contains("shown"));
}

#[test]
fn pid_marker_expands_to_interpreter_pid() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_in(dir.path());
    let pid = child.id();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo pid=$$\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(stdout(&out).contains(&format!("pid={pid}\n")));
}

#[test]
fn pid_marker_expands_in_redirect_targets() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_in(dir.path());
    let pid = child.id();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo hi > f.$$\ncat < f.$$\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    let file = dir.path().join(format!("f.{pid}"));
    assert_eq!(fs::read_to_string(file).unwrap(), "hi\n");
    assert!(!dir.path().join("f.$$").exists());
    assert!(stdout(&out).contains("hi\n"));
}

#[test]
fn status_reports_exit_code_of_last_command() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("seven.sh"), "exit 7\n").unwrap();
    let out = run_script(dir.path(), "status\nsh seven.sh\nstatus\n");
    let text = stdout(&out);
    let zero = text.find("exit status 0").expect("initial status");
    let seven = text.find("exit status 7").expect("status after script");
    assert!(zero < seven);
}

#[test]
fn unknown_program_sets_status_one() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "no-such-program-here\nstatus\n");
    assert!(stdout(&out).contains("exit status 1"));
    assert!(stderr(&out).contains("no-such-program-here"));
}

#[test]
fn output_and_input_redirection() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("in.txt"), "b\na\nc\n").unwrap();
    let out = run_script(dir.path(), "sort < in.txt > out.txt\ncat out.txt\n");
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "a\nb\nc\n");
    assert!(stdout(&out).contains("a\nb\nc\n"));
}

#[test]
fn output_redirection_truncates() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("out.txt"), "old contents that are long\n").unwrap();
    run_script(dir.path(), "echo new > out.txt\n");
    assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "new\n");
}

#[test]
fn missing_input_file_fails_child_only() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "cat < missing.txt\nstatus\necho still here\n");
    let text = stdout(&out);
    assert!(text.contains("exit status 1"));
    assert!(text.contains("still here"));
    assert!(stderr(&out).contains("missing.txt"));
}

#[test]
fn missing_redirect_target_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "cat >\necho after\n");
    assert!(stderr(&out).contains("missing redirection target"));
    assert!(stdout(&out).contains("after"));
}

#[test]
fn background_command_reports_pid_and_completion_later() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "sleep 0.1 &\nsleep 0.5\necho next\n");
    let text = stdout(&out);
    let started = text.find("background pid is ").expect("launch message");
    let pid: String = text[started + "background pid is ".len()..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let done = text
        .find(&format!("background pid {pid} is done: exit value 0"))
        .expect("completion message");
    assert!(started < done);
}

#[test]
fn background_command_output_goes_to_null_device() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "echo invisible &\nsleep 0.2\n");
    assert!(!stdout(&out).contains("invisible"));
}

#[test]
fn background_command_with_explicit_output() {
    let dir = TempDir::new().unwrap();
    run_script(dir.path(), "echo saved > bg.txt &\nsleep 0.3\n");
    assert_eq!(fs::read_to_string(dir.path().join("bg.txt")).unwrap(), "saved\n");
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let out = run_script(dir.path(), "cd sub\npwd\ncd\npwd\n");
    let text = stdout(&out);
    let sub = dir.path().canonicalize().unwrap().join("sub");
    assert!(text.contains(&format!("{}\n", sub.display())));
    let home = dir.path().canonicalize().unwrap();
    assert!(text.contains(&format!("{}\n", home.display())));
}

#[test]
fn cd_error_is_reported_and_interpreter_continues() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "cd a b\ncd nowhere\necho alive\n");
    assert!(stderr(&out).contains("too many arguments"));
    assert!(stderr(&out).contains("cd: nowhere"));
    assert!(stdout(&out).contains("alive"));
    assert_eq!(out.status.code(), Some(0));
}

#[test]
fn strict_cd_policy_terminates_with_one() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), r#"{ "cd_failure": "exit" }"#).unwrap();
    let out = run_script(dir.path(), "cd nowhere\necho unreachable\n");
    assert_eq!(out.status.code(), Some(1));
    assert!(!stdout(&out).contains("unreachable"));
}

#[test]
fn exit_terminates_background_processes() {
    let dir = TempDir::new().unwrap();
    let out = run_script(dir.path(), "sleep 30 &\nexit\n");
    assert!(out.status.success());
    let text = stdout(&out);
    let start = text.find("background pid is ").unwrap() + "background pid is ".len();
    let pid: i32 = text[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap();

    let mut alive = true;
    for _ in 0..50 {
        if !is_running(pid) {
            alive = false;
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!alive, "background sleep {pid} survived exit");
}

#[test]
fn overlong_line_is_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), r#"{ "max_line_length": 16 }"#).unwrap();
    let out = run_script(dir.path(), "echo this line is far too long\necho ok\n");
    assert!(stderr(&out).contains("input too long"));
    assert!(!stdout(&out).contains("far too long"));
    assert!(stdout(&out).contains("ok"));
}

#[test]
fn suspend_signal_toggles_foreground_only_mode() {
    let dir = TempDir::new().unwrap();
    let mut child = spawn_in(dir.path());
    let pid = Pid::from_raw(child.id() as i32);
    let mut stdin = child.stdin.take().unwrap();

    // Let the interpreter install its handlers before signalling it.
    stdin.write_all(b"echo ready\n").unwrap();
    thread::sleep(Duration::from_millis(300));

    kill(pid, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(100));
    stdin.write_all(b"echo fg-only &\n").unwrap();
    thread::sleep(Duration::from_millis(300));

    kill(pid, Signal::SIGTSTP).unwrap();
    thread::sleep(Duration::from_millis(100));
    stdin.write_all(b"exit\n").unwrap();
    drop(stdin);

    let out = child.wait_with_output().unwrap();
    let text = stdout(&out);
    let enter = text
        .find("Entering foreground-only mode (& is now ignored)")
        .expect("enter message");
    let ran = text.find("fg-only\n").expect("command ran in the foreground");
    let leave = text.find("Exiting foreground-only mode").expect("exit message");
    assert!(enter < ran && ran < leave);
    assert!(!text.contains("background pid is"));
    assert_eq!(text.matches("Entering foreground-only mode").count(), 1);
    assert_eq!(text.matches("Exiting foreground-only mode").count(), 1);
}
