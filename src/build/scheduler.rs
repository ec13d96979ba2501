//! Bounded-parallel execution of compiler processes.
//!
//! Concurrency comes only from child processes; the driver stays on one
//! thread. When the window is full the *oldest* admitted job is waited for
//! before the next one is admitted (FIFO, not wait-any). That can leave a
//! slot idle while a slow early job finishes, but admission order stays
//! predictable and no completion channel is needed.

use crate::process::{self, ExitStatus, OutputMode, Process, ProcessError};
use colored::*;
use indicatif::ProgressBar;
use std::collections::VecDeque;
use thiserror::Error;

/// One compiler invocation.
#[derive(Debug, Clone)]
pub struct Job {
    pub argv: Vec<String>,
    /// Shown in diagnostics, usually the source path.
    pub label: String,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("{label}: exited with code {code}")]
    Failed { label: String, code: i32 },
    #[error(transparent)]
    Process(#[from] ProcessError),
}

pub struct Scheduler {
    max_parallel: usize,
    verbose: bool,
    progress: ProgressBar,
}

impl Scheduler {
    /// `max_parallel` of 0 is treated as 1.
    pub fn new(max_parallel: usize, verbose: bool, progress: ProgressBar) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            verbose,
            progress,
        }
    }

    /// Run every job, at most `max_parallel` at a time.
    ///
    /// Stops admitting jobs at the first failure. Processes already running
    /// are always waited for before returning, so a failed batch leaves no
    /// children behind. Returns the number of jobs started.
    pub fn run_many(&self, jobs: Vec<Job>) -> Result<usize, SchedulerError> {
        if self.max_parallel == 1 {
            self.run_sequential(jobs)
        } else {
            self.run_windowed(jobs)
        }
    }

    fn run_sequential(&self, jobs: Vec<Job>) -> Result<usize, SchedulerError> {
        let mut started = 0;
        for job in jobs {
            self.announce(&job);
            started += 1;
            let status = process::run(&job.argv, OutputMode::Capture)?;
            self.finish(&job, status)?;
        }
        Ok(started)
    }

    fn run_windowed(&self, jobs: Vec<Job>) -> Result<usize, SchedulerError> {
        let mut running: VecDeque<(Job, Process)> = VecDeque::with_capacity(self.max_parallel);
        let mut result = Ok(());
        let mut started = 0;

        for job in jobs {
            if running.len() >= self.max_parallel
                && let Some((oldest, proc)) = running.pop_front()
                && let Err(e) = self.reap(&oldest, proc)
            {
                result = Err(e);
                break;
            }

            self.announce(&job);
            match process::spawn(&job.argv, OutputMode::Capture) {
                Ok(proc) => {
                    started += 1;
                    running.push_back((job, proc));
                }
                Err(e) => {
                    result = Err(e.into());
                    break;
                }
            }
        }

        // Drain everything still in flight; the first error wins.
        while let Some((job, proc)) = running.pop_front() {
            let outcome = self.reap(&job, proc);
            match (&result, outcome) {
                (Ok(()), Err(e)) => result = Err(e),
                (Err(_), Err(e)) => tracing::debug!(error = %e, "further failure while draining"),
                _ => {}
            }
        }

        result.map(|()| started)
    }

    fn reap(&self, job: &Job, proc: Process) -> Result<(), SchedulerError> {
        let status = proc.wait()?;
        self.finish(job, status)
    }

    fn announce(&self, job: &Job) {
        if self.verbose {
            self.progress.println(process::format_argv(&job.argv));
        }
        self.progress.set_message(format!("Compiling {}", job.label));
    }

    fn finish(&self, job: &Job, status: ExitStatus) -> Result<(), SchedulerError> {
        self.progress.inc(1);
        let stderr = status.stderr.trim_end();

        if !status.success() {
            self.progress.println(format!(
                "{} Error compiling {}:\n{}",
                "x".red(),
                job.label,
                stderr
            ));
            return Err(SchedulerError::Failed {
                label: job.label.clone(),
                code: status.code,
            });
        }

        if !stderr.is_empty() {
            self.progress
                .println(format!("{} Warning in {}:\n{}", "!".yellow(), job.label, stderr));
        }
        Ok(())
    }
}
