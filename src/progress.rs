//! Progress reporting and cooperative cancellation for per-repository passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives whole-number percentages (0..=100) as repositories complete
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

/// Counts completed items and converts them to a floored percentage
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self { total, completed: 0 }
    }

    /// Record one completion and return `floor(100 * completed / total)`
    pub fn advance(&mut self) -> u8 {
        self.completed = (self.completed + 1).min(self.total);
        self.percent()
    }

    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u8
    }

    pub fn completed(&self) -> usize {
        self.completed
    }
}

/// Shared flag checked between repositories
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
