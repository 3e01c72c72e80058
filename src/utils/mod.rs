use std::time::{Duration, Instant};
use tracing::info;

/// A simple wall-clock timer for logging elapsed time.
pub struct Timer {
    label: String,
    start: Instant,
}

impl Timer {
    pub fn start(label: impl Into<String>) -> Self {
        let label = label.into();
        info!("⏱  Starting: {}", label);
        Self {
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        info!(
            "⏱  Finished: {} (took {:.2?})",
            self.label,
            self.start.elapsed()
        );
    }
}

/// Human age string for snapshot staleness display: "3m", "2h", "5d".
pub fn fmt_age(age: chrono::Duration) -> String {
    let mins = age.num_minutes();
    if mins < 1 {
        return "<1m".to_string();
    }
    if mins < 60 {
        return format!("{}m", mins);
    }
    let hours = age.num_hours();
    if hours < 24 {
        return format!("{}h", hours);
    }
    format!("{}d", age.num_days())
}
