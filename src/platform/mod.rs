use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use wait_timeout::ChildExt;

/// Operating systems that have a cleaner table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    #[serde(rename = "macos")]
    MacOs,
}

impl Platform {
    pub fn current() -> Option<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOs),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// First non-empty stderr line, falling back to stdout.
    pub fn first_error_line(&self) -> Option<&str> {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CommandRunAs {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunOptions {
    pub run_as: Option<CommandRunAs>,
    pub env: Vec<(String, String)>,
}

/// Runs a short probe command, killing it after `timeout`.
pub fn run_command(cmd: &str, args: &[&str], timeout: Duration) -> Result<CommandOutput> {
    let mut child = build_command(cmd, args, &CommandRunOptions::default())
        .spawn()
        .with_context(|| format!("failed to start process: {cmd}"))?;

    let status = match child
        .wait_timeout(timeout)
        .with_context(|| format!("failed to wait for process: {cmd}"))?
    {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(anyhow!("timed out after {timeout:?}: {cmd}"));
        }
    };

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }
    let mut stderr = String::new();
    if let Some(mut err) = child.stderr.take() {
        let _ = err.read_to_string(&mut stderr);
    }

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Runs a command until it exits on its own. Cleanup commands have no time
/// limit.
pub fn run_to_completion(
    cmd: &str,
    args: &[&str],
    options: &CommandRunOptions,
) -> Result<CommandOutput> {
    let output = build_command(cmd, args, options)
        .output()
        .with_context(|| format!("failed to start process: {cmd}"))?;

    Ok(CommandOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like `run_to_completion`, but drops to the user who invoked `sudo` so
/// per-user caches are cleaned for them rather than for root.
pub fn run_as_invoking_user(cmd: &str, args: &[&str]) -> Result<CommandOutput> {
    let Some(user) = invoking_user() else {
        return run_to_completion(cmd, args, &CommandRunOptions::default());
    };

    let mut env = vec![("HOME".to_string(), user.home_dir.display().to_string())];
    if let Some(name) = user.username.clone() {
        env.push(("USER".to_string(), name.clone()));
        env.push(("LOGNAME".to_string(), name));
    }

    run_to_completion(
        cmd,
        args,
        &CommandRunOptions {
            run_as: Some(CommandRunAs {
                uid: user.uid,
                gid: user.gid,
            }),
            env,
        },
    )
}

fn build_command(cmd: &str, args: &[&str], options: &CommandRunOptions) -> Command {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (k, v) in &options.env {
        command.env(k, v);
    }

    #[cfg(unix)]
    if let Some(run_as) = &options.run_as {
        use std::os::unix::process::CommandExt;
        command.uid(run_as.uid);
        command.gid(run_as.gid);
    }

    command
}

pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Available bytes for unprivileged users on the filesystem holding `path`.
#[cfg(unix)]
pub fn free_disk_space(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let stat = unsafe { stat.assume_init() };
    #[allow(clippy::unnecessary_cast)]
    let bytes = (stat.f_bavail as u64).saturating_mul(stat.f_frsize as u64);
    Some(bytes)
}

#[cfg(not(unix))]
pub fn free_disk_space(_path: &Path) -> Option<u64> {
    None
}

#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

#[derive(Debug, Clone)]
pub struct InvokingUser {
    pub uid: u32,
    pub gid: u32,
    pub username: Option<String>,
    pub home_dir: PathBuf,
}

pub fn invoking_user() -> Option<InvokingUser> {
    let uid = std::env::var("SUDO_UID").ok()?.parse::<u32>().ok()?;
    let gid = std::env::var("SUDO_GID").ok()?.parse::<u32>().ok()?;
    let username = std::env::var("SUDO_USER").ok();
    let home_dir = home_dir_for_uid(uid)?;

    Some(InvokingUser {
        uid,
        gid,
        username,
        home_dir,
    })
}

/// Home of the person at the keyboard, also under `sudo`.
pub fn effective_home_dir() -> Result<PathBuf> {
    if let Some(user) = invoking_user() {
        return Ok(user.home_dir);
    }
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}

#[cfg(unix)]
fn home_dir_for_uid(uid: u32) -> Option<PathBuf> {
    use std::ffi::CStr;

    unsafe {
        let bufsize = libc::sysconf(libc::_SC_GETPW_R_SIZE_MAX);
        let bufsize = if bufsize <= 0 {
            16 * 1024
        } else {
            bufsize as usize
        };
        let mut buf = vec![0u8; bufsize];
        let mut pwd: libc::passwd = std::mem::zeroed();
        let mut result: *mut libc::passwd = std::ptr::null_mut();

        let rc = libc::getpwuid_r(
            uid as libc::uid_t,
            &mut pwd,
            buf.as_mut_ptr() as *mut libc::c_char,
            buf.len(),
            &mut result,
        );
        if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
            return None;
        }

        let dir = CStr::from_ptr(pwd.pw_dir).to_string_lossy().to_string();
        if dir.trim().is_empty() {
            return None;
        }
        Some(PathBuf::from(dir))
    }
}

#[cfg(not(unix))]
fn home_dir_for_uid(_uid: u32) -> Option<PathBuf> {
    None
}

pub fn os_info(timeout: Duration) -> OsInfo {
    match Platform::current() {
        #[cfg(target_os = "macos")]
        Some(Platform::MacOs) => crate::platform::macos::os_info(timeout),
        Some(Platform::Linux) => linux_os_info(),
        _ => {
            let _ = timeout;
            OsInfo {
                name: std::env::consts::OS.to_string(),
                version: "unknown".to_string(),
            }
        }
    }
}

fn linux_os_info() -> OsInfo {
    let version = std::fs::read_to_string("/etc/os-release")
        .ok()
        .and_then(|s| parse_os_release(&s))
        .unwrap_or_else(|| "unknown".to_string());
    OsInfo {
        name: "Linux".to_string(),
        version,
    }
}

fn parse_os_release(content: &str) -> Option<String> {
    let mut fallback = None;
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').to_string();
        match key.trim() {
            "PRETTY_NAME" if !value.is_empty() => return Some(value),
            "VERSION_ID" if !value.is_empty() => fallback = Some(value),
            _ => {}
        }
    }
    fallback
}

#[cfg(target_os = "macos")]
pub mod macos;
