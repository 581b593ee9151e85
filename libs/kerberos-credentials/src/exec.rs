//! Synchronous external command execution
//!
//! The Kerberos tooling (`klist`, `kinit`) ships as standalone executables next
//! to the application binary. This module runs them, captures both output
//! streams, and turns non-empty stderr into a typed failure.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Where operators get the Kerberos tooling from when it is missing.
pub const TOOLING_REMEDIATION: &str =
    "install the kerberos-auth-egress buildpack from \
     https://github.com/cloudfoundry-community/kerberos-auth-egress-buildpack/releases";

#[derive(Debug, Error)]
pub enum ExecError {
    /// The executable does not exist at the resolved path. This is a
    /// deployment defect, not a transient condition; callers must not retry.
    #[error("external tool '{}' does not exist; {}", .path.display(), TOOLING_REMEDIATION)]
    ToolNotFound { path: PathBuf },

    /// The process launched but wrote non-whitespace error output.
    #[error("'{program}' reported an error: {stderr}")]
    ExecutionFailed { program: String, stderr: String },

    /// The OS refused to launch the process at all.
    #[error("failed to launch '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Spawn and execution failures are worth retrying on the next call;
    /// a missing tool is not.
    pub fn is_tool_missing(&self) -> bool {
        matches!(self, ExecError::ToolNotFound { .. })
    }
}

/// Seam for running external commands, so the TGT manager can be tested with a
/// scripted runner instead of real Kerberos tooling.
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args`, blocking until it exits.
    ///
    /// Returns captured stdout. Fails if the executable is missing or if the
    /// process wrote anything but whitespace to stderr; the exit code alone is
    /// not treated as failure (the MIT tools report errors on stderr).
    fn run(&self, program: &Path, args: &[&str]) -> Result<String, ExecError>;
}

/// Production runner backed by `std::process::Command`.
///
/// No timeout is enforced; a hung KDC stalls the calling thread. Callers that
/// need bounded latency must wrap the runner themselves.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, program: &Path, args: &[&str]) -> Result<String, ExecError> {
        if !program.is_file() {
            return Err(ExecError::ToolNotFound {
                path: program.to_path_buf(),
            });
        }

        let program_str = program.display().to_string();
        debug!(program = %program_str, ?args, "executing external command");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: program_str.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            return Err(ExecError::ExecutionFailed {
                program: program_str,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_tool_not_found() {
        let runner = SystemCommandRunner;
        let result = runner.run(Path::new("/nonexistent/klist"), &[]);

        match result {
            Err(ExecError::ToolNotFound { path }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/klist"));
            }
            other => panic!("expected ToolNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_tool_not_found_message_names_remediation() {
        let err = ExecError::ToolNotFound {
            path: PathBuf::from("/app/bin/kinit"),
        };
        let message = err.to_string();
        assert!(message.contains("/app/bin/kinit"));
        assert!(message.contains("kerberos-auth-egress-buildpack"));
    }

    #[test]
    fn test_captures_stdout() {
        let runner = SystemCommandRunner;
        let stdout = runner
            .run(Path::new("/bin/echo"), &["hello"])
            .expect("echo should succeed");
        assert_eq!(stdout.trim(), "hello");
    }

    #[test]
    fn test_nonempty_stderr_is_failure() {
        let runner = SystemCommandRunner;
        let result = runner.run(Path::new("/bin/sh"), &["-c", "echo oops >&2"]);

        match result {
            Err(ExecError::ExecutionFailed { program, stderr }) => {
                assert_eq!(program, "/bin/sh");
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected ExecutionFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_only_stderr_is_success() {
        let runner = SystemCommandRunner;
        let result = runner.run(Path::new("/bin/sh"), &["-c", "printf '\\n' >&2; echo ok"]);
        assert_eq!(result.expect("should succeed").trim(), "ok");
    }

    #[test]
    fn test_is_tool_missing() {
        let missing = ExecError::ToolNotFound {
            path: PathBuf::from("/x"),
        };
        let failed = ExecError::ExecutionFailed {
            program: "klist".to_string(),
            stderr: "boom".to_string(),
        };
        assert!(missing.is_tool_missing());
        assert!(!failed.is_tool_missing());
    }
}
