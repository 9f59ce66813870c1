//! Job scheduler seam for background work.
//!
//! The store does not own a thread pool; it submits tagged jobs to an
//! injected [`JobScheduler`]. Production embeds hand it their worker pool
//! (or use [`ThreadScheduler`]); tests use [`InlineScheduler`] so drains run
//! deterministically on the calling thread.

use std::fmt;

/// Tag describing what a job does, for scheduling priority and accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Durable write of batched objects.
    Write,
}

impl JobKind {
    /// Stable label for logs and thread names.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Write => "write",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Executes store background jobs.
pub trait JobScheduler: Send + Sync {
    /// Runs `job`, now or later, on some thread.
    fn spawn(&self, kind: JobKind, name: &'static str, job: Box<dyn FnOnce() + Send + 'static>);
}

/// Spawns one named OS thread per job. The production default.
#[derive(Debug, Default)]
pub struct ThreadScheduler;

impl JobScheduler for ThreadScheduler {
    fn spawn(&self, kind: JobKind, name: &'static str, job: Box<dyn FnOnce() + Send + 'static>) {
        let spawned = std::thread::Builder::new()
            .name(format!("hashvault-{}-{name}", kind.as_str()))
            .spawn(job);
        if let Err(err) = spawned {
            tracing::error!(%kind, name, error = %err, "failed to spawn job thread");
        }
    }
}

/// Runs jobs synchronously on the submitting thread. For tests.
#[derive(Debug, Default)]
pub struct InlineScheduler;

impl JobScheduler for InlineScheduler {
    fn spawn(&self, _kind: JobKind, _name: &'static str, job: Box<dyn FnOnce() + Send + 'static>) {
        job();
    }
}
