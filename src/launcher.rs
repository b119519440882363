//! Spawns the target executable with a composed environment. Deliberately
//! thin: signal handling, output capture, and process-tree management are
//! out of scope.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::error::{EnvoyError, Result};

/// Replace the current process's environment with `env` and run `executable`
/// with `args`, waiting for it to exit. Returns the child's exit code, or
/// `None` if it was terminated by a signal.
pub fn launch(executable: &str, args: &[String], env: &HashMap<String, String>, cwd: Option<&Path>) -> Result<Option<i32>> {
    let mut command = Command::new(executable);
    command.args(args);
    command.env_clear();
    command.envs(env);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let status = command.status().map_err(|source| EnvoyError::LaunchFailure {
        executable: executable.to_string(),
        source,
    })?;

    Ok(status.code())
}
