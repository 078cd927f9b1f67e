//! External command execution.
//!
//! Every interaction with the outside world - the git backend, the build
//! and publish commands - goes through the [CommandRunner] trait, so tests
//! can substitute a scripted runner that records invocations instead of
//! spawning processes.

use crate::error::{ReleaseError, Result};
use std::path::Path;
use std::process::Command;

/// Executes external commands on behalf of the repository handle.
pub trait CommandRunner {
    /// Run `program` with `args` in `dir` and return its trimmed output.
    ///
    /// # Returns
    /// * `Ok(String)` - Trimmed output (stderr first, stdout as fallback)
    /// * `Err` - If the process cannot start or exits with a failure status
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<String>;
}

/// Runner that spawns one synchronous child process per call.
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<String> {
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|e| {
                ReleaseError::execution(format!("Failed to execute {}: {}", program, e))
            })?;

        // git reports informational chatter on stderr even on success, so
        // stderr takes precedence on both paths.
        let mut text = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }

        if output.status.success() {
            Ok(text)
        } else {
            Err(ReleaseError::execution(strip_error_prefix(&text)))
        }
    }
}

/// Drop the conventional `error:` prefix from a failure message.
fn strip_error_prefix(message: &str) -> String {
    let trimmed = message.trim_start();
    for prefix in ["error:", "Error:", "ERROR:"] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim_start().to_string();
        }
    }
    message.to_string()
}
