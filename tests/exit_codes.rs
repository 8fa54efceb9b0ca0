use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn broom_cmd(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_broom"));
    cmd.env("HOME", home);
    for var in [
        "BROOM_CONFIG",
        "BROOM_UI_COLOR",
        "BROOM_UI_LOG_CAPACITY",
        "BROOM_CLEANERS_EXCLUDE",
        "BROOM_LOGS_ENABLED",
        "SUDO_UID",
        "SUDO_GID",
        "SUDO_USER",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(home: &Path, args: &[&str]) -> Output {
    broom_cmd(home).args(args).output().expect("run broom")
}

fn make_temp_home() -> PathBuf {
    static HOME_SEQ: AtomicU64 = AtomicU64::new(0);
    let seq = HOME_SEQ.fetch_add(1, Ordering::Relaxed);
    let home = std::env::temp_dir().join(format!("broom-exit-test-{}-{seq}", std::process::id()));
    let _ = std::fs::remove_dir_all(&home);
    std::fs::create_dir_all(&home).expect("create home");
    home
}

#[test]
fn completion_unknown_shell_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn completion_bash_succeeds() {
    let home = make_temp_home();
    let out = run(&home, &["completion", "bash"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("broom"));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_requires_tty_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["ui"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn bare_invocation_requires_tty_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &[]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn ui_with_json_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["ui", "--json"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn run_without_selector_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["run"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn run_include_with_exclude_exits_2() {
    let home = make_temp_home();
    let out = run(&home, &["run", "-i", "python", "-x", "npm"]);
    assert_eq!(out.status.code(), Some(2));

    let out = run(&home, &["run", "--all", "-x", "npm"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn run_unknown_type_exits_2_and_names_it() {
    let home = make_temp_home();
    let out = run(&home, &["run", "-i", "python,definitely-not-a-cleaner"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("definitely-not-a-cleaner"), "{stderr}");
    assert!(!home.join(".config/broom/logs").exists());
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn invalid_config_file_exits_2() {
    let home = make_temp_home();
    let path = home.join(".config/broom/config.toml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[ui]\nlog_capacity = \"many\"\n").unwrap();
    let out = run(&home, &["list"]);
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}

#[test]
fn zero_log_capacity_from_env_exits_2() {
    let home = make_temp_home();
    let out = broom_cmd(&home)
        .env("BROOM_UI_LOG_CAPACITY", "0")
        .args(["config", "--show"])
        .output()
        .expect("run broom");
    assert_eq!(out.status.code(), Some(2));
    let _ = std::fs::remove_dir_all(&home);
}
