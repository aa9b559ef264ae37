//! External process execution with a hard timeout
//!
//! Each call spins up a current-thread tokio runtime, so these helpers must not
//! be called from inside another runtime (use `spawn_blocking` there).

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use super::StrategyError;

/// Run `program` and collect its output. The child is killed when the
/// timeout elapses and the call fails with [`StrategyError::TimedOut`].
pub(crate) fn run_with_timeout<I, S>(
    program: &Path,
    args: I,
    timeout: Duration,
) -> Result<Output, StrategyError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    runtime.block_on(run(command, timeout))
}

async fn run(mut command: Command, timeout: Duration) -> Result<Output, StrategyError> {
    let child = command.spawn()?;
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => Err(StrategyError::TimedOut(timeout)),
    }
}

/// Locate an executable by absolute path or on `PATH`.
pub(crate) fn find_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let plain = dir.join(name);
        if plain.is_file() {
            return Some(plain);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{name}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Collapse stderr into a one-line failure reason.
pub(crate) fn failure_reason(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let first = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    format!("exited with {}: {}", output.status, first.trim())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn slow_commands_time_out() {
        let Some(sleep) = find_executable("sleep") else {
            return;
        };
        let err = run_with_timeout(&sleep, ["5"], Duration::from_millis(200));
        assert!(matches!(err, Err(StrategyError::TimedOut(_))));
    }

    #[test]
    fn output_is_captured() {
        let Some(echo) = find_executable("echo") else {
            return;
        };
        let output = run_with_timeout(&echo, ["hello"], Duration::from_secs(5)).expect("echo runs");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn missing_programs_are_not_found() {
        assert!(find_executable("definitely-not-a-real-tool-xyz").is_none());
    }
}
