use std::time::Duration;

use crate::platform::{OsInfo, run_command};

pub fn os_info(timeout: Duration) -> OsInfo {
    let output = run_command("sw_vers", &["-productVersion"], timeout);
    match output {
        Ok(output) if output.exit_code == 0 => OsInfo {
            name: "macOS".to_string(),
            version: output.stdout.trim().to_string(),
        },
        _ => OsInfo {
            name: "macOS".to_string(),
            version: "unknown".to_string(),
        },
    }
}
