use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Timelike, Utc};

use crate::format::ClockTime;

/// A fixed-period simulation clock.
///
/// Each call to [`SimClock::tick`] advances the clock by one tick interval
/// and returns the timestamp at the end of that tick. Wall-clock rendering
/// uses a fixed UTC offset so results do not depend on the host time zone.
///
/// # Examples
///
/// ```
/// use b2h_sim::sim::clock::SimClock;
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2025, 1, 1, 5, 30, 0).unwrap();
/// let mut clock = SimClock::new(start, 2000, 540);
/// clock.tick();
/// assert_eq!(clock.ticks(), 1);
/// assert_eq!(clock.local_time_of_day().to_string(), "14:30");
/// ```
#[derive(Debug, Clone)]
pub struct SimClock {
    /// Timestamp of tick zero
    start: DateTime<Utc>,
    /// Tick period
    interval: TimeDelta,
    /// Ticks elapsed so far
    ticks: u64,
    /// Offset used for HH:MM rendering
    offset: FixedOffset,
}

impl SimClock {
    /// Creates a clock at `start` with a tick period of `interval_ms`.
    ///
    /// An out-of-range `utc_offset_minutes` falls back to UTC.
    pub fn new(start: DateTime<Utc>, interval_ms: u64, utc_offset_minutes: i32) -> Self {
        let interval = TimeDelta::try_milliseconds(interval_ms as i64).unwrap_or(TimeDelta::zero());
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix());
        Self {
            start,
            interval,
            ticks: 0,
            offset,
        }
    }

    /// Advances one tick and returns the new current time.
    pub fn tick(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        self.now()
    }

    /// Current simulated time.
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = self.interval * self.ticks.min(i32::MAX as u64) as i32;
        self.start + elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Local time of day of the current instant.
    pub fn local_time_of_day(&self) -> ClockTime {
        self.time_of_day(self.now())
    }

    /// Local time of day of `instant`, minute precision.
    pub fn time_of_day(&self, instant: DateTime<Utc>) -> ClockTime {
        let local = instant.with_timezone(&self.offset);
        ClockTime::new(local.hour(), local.minute())
    }
}
