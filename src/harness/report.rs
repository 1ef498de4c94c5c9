//! Summary of a completed replay session

use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Returned by the controller when a session ran to the end of its tick loop
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub title: String,
    pub seed: u64,
    /// Ticks run after the session was loaded
    pub ticks: u64,
    /// The loop ended on an external stop rather than the recording running out
    pub stopped_early: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (seed {}): {} ticks in {:.2}s{}",
            self.title,
            self.seed,
            self.ticks,
            self.elapsed.as_secs_f32(),
            if self.stopped_early { ", stopped early" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_marks_early_stop() {
        let mut report = SessionReport {
            session_id: Uuid::new_v4(),
            title: "DirtBreak".to_string(),
            seed: 3,
            ticks: 120,
            stopped_early: false,
            started_at: Utc::now(),
            elapsed: Duration::from_millis(2_000),
        };
        assert_eq!(report.to_string(), "DirtBreak (seed 3): 120 ticks in 2.00s");

        report.stopped_early = true;
        assert!(report.to_string().ends_with(", stopped early"));
    }
}
