use chrono::{DateTime, Utc};

/// Source of "now" for the engine. All elapsed-time values are derived from
/// two timestamps on read; nothing in the engine accumulates ticks, so a
/// missed redraw (backgrounded terminal, suspended laptop) self-corrects on
/// the next read.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock for tests: returns whatever it was last set to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: std::cell::Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: std::cell::Cell::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now
            .set(self.now.get() + chrono::Duration::seconds(secs));
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Whole seconds between two instants, clamped at zero so a slightly-skewed
/// persisted timestamp never renders a negative timer.
pub fn elapsed_secs(now: DateTime<Utc>, since: DateTime<Utc>) -> i64 {
    (now - since).num_seconds().max(0)
}

/// Rest/elapsed display: `MM:SS` below one hour, `H:MM` at or above it
/// (hours unpadded, minutes always two digits, seconds dropped).
pub fn format_elapsed(total_secs: i64) -> String {
    let total_secs = total_secs.max(0);
    if total_secs < 3600 {
        format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
    } else {
        format!("{}:{:02}", total_secs / 3600, (total_secs % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn elapsed_is_difference_in_whole_seconds() {
        assert_eq!(elapsed_secs(t(90), t(0)), 90);
        assert_eq!(elapsed_secs(t(0), t(0)), 0);
    }

    #[test]
    fn elapsed_clamps_negative_skew() {
        assert_eq!(elapsed_secs(t(0), t(10)), 0);
    }

    #[test]
    fn format_under_one_hour_is_mm_ss() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(90), "01:30");
        assert_eq!(format_elapsed(3599), "59:59");
    }

    #[test]
    fn format_at_or_above_one_hour_drops_seconds() {
        assert_eq!(format_elapsed(3600), "1:00");
        assert_eq!(format_elapsed(3660), "1:01");
        assert_eq!(format_elapsed(3659), "1:00"); // 59s dropped, not rounded
        assert_eq!(format_elapsed(7320), "2:02");
        assert_eq!(format_elapsed(36_000), "10:00");
    }

    #[test]
    fn fixed_clock_advances_deterministically() {
        let clock = FixedClock::at(t(0));
        assert_eq!(clock.now(), t(0));
        clock.advance_secs(42);
        assert_eq!(clock.now(), t(42));
    }
}
