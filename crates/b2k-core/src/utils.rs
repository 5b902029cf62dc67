use std::time::{Duration, Instant};

use tracing::info;

/// Logs how long an operation took when dropped.
pub struct MeasuredOperation {
    operation: String,
    started: Instant,
}

impl MeasuredOperation {
    pub fn start(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for MeasuredOperation {
    fn drop(&mut self) {
        info!(operation = %self.operation, elapsed = ?self.started.elapsed(), "operation finished");
    }
}

/// Truncate for log/error previews.
pub fn truncate_text(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
