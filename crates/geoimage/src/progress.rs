//! Advisory progress reporting.

use tracing::info;

/// Receives coarse progress fractions in `[0, 1]` from long-running nodes.
///
/// Reporting never cancels or blocks the operation.
pub trait Progress {
    fn report(&self, fraction: f64, message: &str);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&self, _fraction: f64, _message: &str) {}
}

/// Logs progress through `tracing` at info level.
#[derive(Debug, Clone)]
pub struct TracingProgress {
    node: &'static str,
}

impl TracingProgress {
    pub fn new(node: &'static str) -> Self {
        Self { node }
    }
}

impl Progress for TracingProgress {
    fn report(&self, fraction: f64, message: &str) {
        let percent = (fraction.clamp(0.0, 1.0) * 100.0).round() as u32;
        info!(node = self.node, percent, "{}", message);
    }
}
