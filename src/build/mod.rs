//! Compiling and linking targets.

mod clean;
mod core;
pub mod scheduler;
mod test;

pub use clean::{clean, clobber};
pub use self::core::{BuildOptions, BuildOutcome, Builder};
pub use test::{TestSummary, run_tests};

use crate::config::Config;
use crate::graph::{Target, TargetGraph};
use crate::process::{self, OutputMode, ProcessError};
use scheduler::SchedulerError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown or disabled target '{0}'")]
    UnknownTarget(String),
    #[error("no .c sources for target '{target}' in {}", dir.display())]
    NoSources { target: String, dir: PathBuf },
    #[error("compilation of {target} failed")]
    Compile {
        target: String,
        #[source]
        source: SchedulerError,
    },
    #[error("linking {} failed with exit code {code}", binary.display())]
    Link { binary: PathBuf, code: i32 },
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(context: &'static str, source: io::Error) -> Self {
        BuildError::Io { context, source }
    }
}

/// The requested target, or the configured default when none is given.
pub fn select_target<'g>(
    graph: &'g TargetGraph,
    config: &Config,
    requested: Option<&str>,
) -> Result<&'g Target, BuildError> {
    let name = requested.unwrap_or_else(|| config.default_target());
    graph
        .find(name)
        .ok_or_else(|| BuildError::UnknownTarget(name.to_string()))
}

/// Run a built program with inherited stdio; returns its exit code.
pub fn run_binary(binary: &Path, args: &[String]) -> Result<i32, BuildError> {
    let mut argv = vec![binary.to_string_lossy().into_owned()];
    argv.extend(args.iter().cloned());
    let status = process::run(&argv, OutputMode::Inherit)?;
    Ok(status.code)
}
