//! Process execution without a shell.
//!
//! Every compiler, linker and test invocation goes through [`spawn`] with an
//! argument vector, so paths containing spaces or quotes are passed through
//! untouched. Quoting only happens in [`format_argv`], for humans reading
//! verbose output.

use std::process::{Child, Command, Stdio};
use thiserror::Error;

/// What the child does with its output streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Share the driver's stdout/stderr (programs and tests being run).
    Inherit,
    /// Capture stderr so it can be printed above a progress bar.
    Capture,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("empty command line")]
    EmptyArgv,
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a spawned process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code; a process terminated by a signal reports 1.
    pub code: i32,
    /// Captured stderr (always empty in [`OutputMode::Inherit`]).
    pub stderr: String,
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A running child process. The caller owns it and must [`Process::wait`].
#[derive(Debug)]
pub struct Process {
    program: String,
    child: Child,
}

/// Start `argv[0]` with the remaining arguments and return immediately.
pub fn spawn(argv: &[String], mode: OutputMode) -> Result<Process, ProcessError> {
    let (program, args) = argv.split_first().ok_or(ProcessError::EmptyArgv)?;

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    if mode == OutputMode::Capture {
        cmd.stderr(Stdio::piped());
    }

    let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    tracing::trace!(pid = child.id(), program = %program, "spawned");
    Ok(Process {
        program: program.clone(),
        child,
    })
}

/// Spawn and block until the process exits.
pub fn run(argv: &[String], mode: OutputMode) -> Result<ExitStatus, ProcessError> {
    spawn(argv, mode)?.wait()
}

impl Process {
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Block until the process exits, draining captured stderr.
    pub fn wait(self) -> Result<ExitStatus, ProcessError> {
        let Process { program, child } = self;
        let output = child
            .wait_with_output()
            .map_err(|source| ProcessError::Wait {
                program: program.clone(),
                source,
            })?;

        Ok(ExitStatus {
            code: output.status.code().unwrap_or(1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Render an argv as a single line, quoting arguments with whitespace or `"`.
pub fn format_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.chars().any(|c| c.is_whitespace() || c == '"') {
                format!("\"{}\"", arg.replace('"', "\\\""))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
