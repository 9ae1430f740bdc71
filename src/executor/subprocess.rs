//! Subprocess execution.
//!
//! Provides utilities for running external build and server commands with:
//! - No shell interpretation (direct exec)
//! - An optional timeout (none by default; external tools govern themselves)
//! - Captured or inherited stdout/stderr
//! - Working directory control

use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::output::sanitize_output;
use crate::error::{CommandErrorKind, DeployError, DeployResult};

/// Lines of captured output kept in error messages.
const ERROR_OUTPUT_LINES: usize = 20;

/// Result of a subprocess execution.
#[derive(Debug, Clone)]
pub struct SubprocessResult {
    /// Program that was executed, for error reporting.
    pub program: String,
    /// Whether the command exited successfully (exit code 0).
    pub success: bool,
    /// The exit code, if available.
    pub exit_code: Option<i32>,
    /// Captured stdout (empty when output was inherited).
    pub stdout: String,
    /// Captured stderr (empty when output was inherited).
    pub stderr: String,
}

impl SubprocessResult {
    /// Escalate a non-zero exit status to a typed error.
    pub fn check(self) -> DeployResult<Self> {
        if self.success {
            return Ok(self);
        }
        Err(DeployError::Command {
            kind: CommandErrorKind::NonZeroExit {
                program: self.program.clone(),
                exit_code: self.exit_code,
                output: self.diagnostic(),
            },
        })
    }

    /// Captured output suitable for an error message.
    ///
    /// Most tools (nginx included) write their diagnostics to stderr, so it
    /// comes first.
    pub fn diagnostic(&self) -> String {
        let combined = match (self.stderr.trim(), self.stdout.trim()) {
            ("", out) => out.to_string(),
            (err, "") => err.to_string(),
            (err, out) => format!("{}\n{}", err, out),
        };
        sanitize_output(&combined, ERROR_OUTPUT_LINES)
    }
}

/// Builder for subprocess execution.
pub struct SubprocessBuilder {
    program: PathBuf,
    args: Vec<OsString>,
    current_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    /// If true, the child writes straight to our terminal instead of pipes.
    inherit_output: bool,
}

impl SubprocessBuilder {
    /// Create a new subprocess builder.
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
            inherit_output: false,
        }
    }

    /// Add arguments to the command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Run the command from the given directory.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Kill the command if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Let the child write directly to our stdout/stderr.
    ///
    /// Used for long-running builds and certbot, whose progress the operator
    /// should see as it happens.
    pub fn inherit_output(mut self) -> Self {
        self.inherit_output = true;
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    /// Execute the command and wait for completion.
    ///
    /// If a timeout is configured and the process exceeds it, the process is
    /// killed and a timeout error is returned.
    pub fn run(self) -> DeployResult<SubprocessResult> {
        let program = self.program_name();
        debug!(
            program = %program,
            args = ?self.args,
            cwd = ?self.current_dir,
            timeout_secs = ?self.timeout.map(|t| t.as_secs()),
            "Executing subprocess"
        );

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        if self.inherit_output {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::piped());
            cmd.stderr(Stdio::piped());
        }

        let child = cmd.spawn().map_err(|e| DeployError::Command {
            kind: CommandErrorKind::ExecutionFailed {
                message: format!("Failed to spawn {}: {}", program, e),
            },
        })?;

        let start = Instant::now();
        let result = match self.timeout {
            Some(timeout) => wait_with_timeout(child, &program, timeout)?,
            None => collect(child, &program)?,
        };

        debug!(
            program = %program,
            success = result.success,
            exit_code = ?result.exit_code,
            duration_ms = start.elapsed().as_millis(),
            "Subprocess completed"
        );
        Ok(result)
    }
}

/// Block until the child exits and gather whatever output was piped.
fn collect(child: Child, program: &str) -> DeployResult<SubprocessResult> {
    let output = child.wait_with_output().map_err(|e| DeployError::Command {
        kind: CommandErrorKind::ExecutionFailed {
            message: format!("Failed to get output from {}: {}", program, e),
        },
    })?;
    Ok(build_result(
        program,
        output.status,
        &output.stdout,
        &output.stderr,
    ))
}

/// Poll the child until it exits, killing it once `timeout` has elapsed.
///
/// Piped output is drained on reader threads meanwhile; a child blocked on a
/// full pipe would otherwise never exit.
fn wait_with_timeout(
    mut child: Child,
    program: &str,
    timeout: Duration,
) -> DeployResult<SubprocessResult> {
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let start = Instant::now();
    let poll_interval = Duration::from_millis(100);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stdout = join_output(stdout);
                let stderr = join_output(stderr);
                return Ok(build_result(program, status, &stdout, &stderr));
            }
            Ok(None) => {
                if start.elapsed() > timeout {
                    warn!(
                        program = %program,
                        timeout_secs = timeout.as_secs(),
                        "Process timed out, killing"
                    );
                    if let Err(e) = child.kill() {
                        warn!(error = %e, "Failed to kill timed-out process");
                    }
                    // Reap the zombie process
                    let _ = child.wait();
                    // Readers are left detached; a grandchild may still hold the pipes
                    return Err(DeployError::Command {
                        kind: CommandErrorKind::Timeout {
                            timeout_secs: timeout.as_secs(),
                        },
                    });
                }
                thread::sleep(poll_interval);
            }
            Err(e) => {
                return Err(DeployError::Command {
                    kind: CommandErrorKind::ExecutionFailed {
                        message: format!("Failed to check status of {}: {}", program, e),
                    },
                });
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // Whatever was read before an error is still worth reporting
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

fn join_output(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn build_result(program: &str, status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> SubprocessResult {
    SubprocessResult {
        program: program.to_string(),
        success: status.success(),
        exit_code: status.code(),
        stdout: String::from_utf8_lossy(stdout).to_string(),
        stderr: String::from_utf8_lossy(stderr).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_echo() {
        let result = SubprocessBuilder::new("echo")
            .args(["hello", "world"])
            .run()
            .unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[test]
    fn test_run_false_command() {
        let result = SubprocessBuilder::new("false").run().unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
    }

    #[test]
    fn test_check_escalates_failure() {
        let err = SubprocessBuilder::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .run()
            .unwrap()
            .check()
            .unwrap_err();
        match err {
            DeployError::Command {
                kind:
                    CommandErrorKind::NonZeroExit {
                        exit_code, output, ..
                    },
            } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_current_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = SubprocessBuilder::new("pwd")
            .current_dir(dir.path())
            .run()
            .unwrap();
        let reported = std::fs::canonicalize(result.stdout.trim()).unwrap();
        assert_eq!(reported, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_timeout_with_large_captured_output() {
        // Well past a 64 KiB pipe buffer
        let result = SubprocessBuilder::new("sh")
            .args(["-c", "head -c 300000 /dev/zero; echo done >&2"])
            .timeout(Duration::from_secs(30))
            .run()
            .unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.len(), 300000);
        assert_eq!(result.stderr.trim(), "done");
    }

    #[test]
    fn test_timeout_kills_process() {
        let result = SubprocessBuilder::new("sleep")
            .arg("5")
            .timeout(Duration::from_millis(200))
            .run();
        assert!(matches!(
            result,
            Err(DeployError::Command {
                kind: CommandErrorKind::Timeout { .. }
            })
        ));
    }

    #[test]
    fn test_nonexistent_command() {
        let result = SubprocessBuilder::new("nonexistent_command_12345").run();
        assert!(result.is_err());
    }

    #[test]
    fn test_diagnostic_prefers_stderr() {
        let result = SubprocessResult {
            program: "nginx".to_string(),
            success: false,
            exit_code: Some(1),
            stdout: "out".to_string(),
            stderr: "err".to_string(),
        };
        assert_eq!(result.diagnostic(), "err\nout");
    }
}
