use crate::{ClusterError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

/// How a child process is wired to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdioMode {
    /// Provisioning runs: the operator watches the output live.
    Inherit,
    /// Probes: output is captured for parsing.
    Capture,
}

/// A fully assembled external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub stdio: StdioMode,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdio: StdioMode::Inherit,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Captures output and bounds the run with `timeout`.
    pub fn probe(mut self, timeout: Duration) -> Self {
        self.stdio = StdioMode::Capture;
        self.timeout = Some(timeout);
        self
    }

    pub fn captured(mut self) -> Self {
        self.stdio = StdioMode::Capture;
        self
    }

    pub fn program_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|arg| arg.to_string_lossy() == needle)
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs external processes. Implementations must return
/// [`ClusterError::ExternalWorkflow`] for a nonzero exit and
/// [`ClusterError::Timeout`] when a bounded run overstays.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Spawns real child processes through `tokio::process`.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        log::debug!("Executing command: {spec}");

        let mut command = tokio::process::Command::new(&spec.program);
        command.args(&spec.args).kill_on_drop(true);
        match spec.stdio {
            StdioMode::Inherit => {
                command
                    .stdin(Stdio::inherit())
                    .stdout(Stdio::inherit())
                    .stderr(Stdio::inherit());
            }
            StdioMode::Capture => {
                command
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped());
            }
        }

        let child = command.output();
        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| ClusterError::Timeout {
                    command: spec.to_string(),
                    timeout: limit,
                })?,
            None => child.await,
        }
        .map_err(|err| ClusterError::Other(format!("spawn {}: {err}", spec.program_name())))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ClusterError::ExternalWorkflow {
                command: spec.to_string(),
                status: output.status.code(),
                stdout,
                stderr,
            });
        }
        Ok(CommandOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("ansible-playbook")
            .args(["-i", "/tmp/hosts"])
            .arg("site.yml");
        assert_eq!(spec.to_string(), "ansible-playbook -i /tmp/hosts site.yml");
        assert!(spec.has_arg("site.yml"));
        assert_eq!(spec.stdio, StdioMode::Inherit);
    }

    #[test]
    fn probe_captures_and_bounds() {
        let spec = CommandSpec::new("/usr/local/kubeauto/kube-bin/kubectl")
            .probe(Duration::from_millis(500));
        assert_eq!(spec.stdio, StdioMode::Capture);
        assert_eq!(spec.timeout, Some(Duration::from_millis(500)));
        assert_eq!(spec.program_name(), "kubectl");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_surfaces_output() {
        let spec = CommandSpec::new("sh")
            .args(["-c", "echo out; echo err >&2; exit 3"])
            .captured();
        let err = SystemRunner.run(&spec).await.unwrap_err();
        match err {
            ClusterError::ExternalWorkflow {
                status,
                stdout,
                stderr,
                ..
            } => {
                assert_eq!(status, Some(3));
                assert_eq!(stdout.trim(), "out");
                assert_eq!(stderr.trim(), "err");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn bounded_probe_times_out() {
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .probe(Duration::from_millis(50));
        let err = SystemRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, ClusterError::Timeout { .. }), "{err}");
    }
}
