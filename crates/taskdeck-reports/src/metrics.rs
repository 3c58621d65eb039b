//! Metric names emitted by the report scheduler.

/// Scheduler ticks run (counter).
pub const REPORT_TICKS_TOTAL: &str = "report_ticks_total";
/// Preferences claimed as due (counter).
pub const REPORTS_DUE_TOTAL: &str = "reports_due_total";
/// Digests accepted by the mailer (counter).
pub const REPORTS_SENT_TOTAL: &str = "reports_sent_total";
/// Digests that failed to render or deliver (counter, label: `reason`).
pub const REPORTS_FAILED_TOTAL: &str = "reports_failed_total";
/// Tick wall time (histogram, seconds).
pub const REPORT_TICK_DURATION_SECONDS: &str = "report_tick_duration_seconds";

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_snake_case() {
        for name in [
            REPORT_TICKS_TOTAL,
            REPORTS_DUE_TOTAL,
            REPORTS_SENT_TOTAL,
            REPORTS_FAILED_TOTAL,
            REPORT_TICK_DURATION_SECONDS,
        ] {
            assert!(
                name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{name} is not snake_case"
            );
        }
    }
}
