//! External command execution
//!
//! `helm` and `kubectl` are only ever invoked through [`CommandRunner`].

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Where a command's stdout/stderr go
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputMode {
    /// Stream straight to this process's console
    Inherit,
    /// Collect into [`CommandOutput`]
    Capture,
}

/// Exit status and, when captured, output of a finished command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Human-readable exit status
    pub fn status(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// A program plus its arguments, for logging
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub program: &'a str,
    pub args: &'a [String],
}

impl fmt::Display for CommandLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion.
    ///
    /// Only a failure to start the process is an `Err`; a non-zero exit is
    /// reported through [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[String], mode: OutputMode)
        -> io::Result<CommandOutput>;
}

/// Runs commands on the host with `tokio::process`
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        mode: OutputMode,
    ) -> io::Result<CommandOutput> {
        debug!("Running {}", CommandLine { program, args });

        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());

        match mode {
            OutputMode::Inherit => {
                let status = command.status().await?;
                Ok(CommandOutput {
                    success: status.success(),
                    code: status.code(),
                    ..Default::default()
                })
            }
            OutputMode::Capture => {
                let output = command.output().await?;
                Ok(CommandOutput {
                    success: output.status.success(),
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_line_display() {
        let args = args(&["upgrade", "--install", "sock-shop", "/charts/sock-shop"]);
        let line = CommandLine {
            program: "helm",
            args: &args,
        };
        assert_eq!(
            line.to_string(),
            "helm upgrade --install sock-shop /charts/sock-shop"
        );
    }

    #[test]
    fn test_output_status() {
        assert_eq!(CommandOutput::failure(1, "boom").status(), "exit status 1");
        assert_eq!(CommandOutput::default().status(), "terminated by signal");
        assert!(CommandOutput::success("").success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = SystemRunner
            .run("sh", &args(&["-c", "echo carts orders"]), OutputMode::Capture)
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "carts orders");

        let output = SystemRunner
            .run("sh", &args(&["-c", "exit 3"]), OutputMode::Inherit)
            .await
            .unwrap();
        assert!(!output.success);
        assert_eq!(output.code, Some(3));
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let result = SystemRunner
            .run("definitely-not-a-real-binary", &[], OutputMode::Capture)
            .await;
        assert!(result.is_err());
    }
}
