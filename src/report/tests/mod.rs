//! Unit tests for the report domain, state machine, and codec.

mod codec_tests;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

/// Clock pinned to a fixed instant for byte-deterministic assertions.
pub(crate) struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// 2026-08-30T10:00:00Z, the instant used throughout these tests.
    pub(crate) fn base() -> Self {
        Self(
            Utc.with_ymd_and_hms(2026, 8, 30, 10, 0, 0)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl Clock for FixedClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}
