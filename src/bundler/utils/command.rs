//! External command execution.
//!
//! Every tool the bundler drives (otool, install_name_tool, codesign, hdiutil,
//! xcrun) goes through these helpers so failures are reported uniformly as
//! [`Error::CommandError`] or [`Error::ToolInvocationFailed`].

use crate::bundler::error::{Error, Result};
use std::ffi::OsStr;
use std::process::Output;

/// Renders a program and its arguments as a single display string.
pub fn command_line<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.as_ref().to_string_lossy());
    }
    line
}

fn check_output(command: String, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(Error::CommandError {
            command,
            code: output.status.code().unwrap_or(-1),
            output: Some(stderr),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs a command to completion on the current thread and returns its stdout.
pub fn run_blocking<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<String> {
    let command = command_line(program, args);
    log::debug!("{}", command);

    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|error| Error::ToolInvocationFailed {
            command: command.clone(),
            error,
        })?;

    check_output(command, output)
}

/// Runs a command asynchronously and returns its stdout.
///
/// With `dry_run` set the command is only logged and an empty string is returned.
pub async fn run<S: AsRef<OsStr>>(program: &str, args: &[S], dry_run: bool) -> Result<String> {
    let command = command_line(program, args);
    log::debug!("{}", command);

    if dry_run {
        log::info!("[DRY RUN] {}", command);
        return Ok(String::new());
    }

    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|error| Error::ToolInvocationFailed {
            command: command.clone(),
            error,
        })?;

    check_output(command, output)
}
