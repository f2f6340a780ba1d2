//! Time source for TTL bookkeeping.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

/// Source of the current time, injectable so expiry can be tested without
/// sleeping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Instant at which an entry written at `now` with `ttl` stops being live.
/// Saturates instead of overflowing for absurd TTLs.
pub fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Clock for unit tests in this crate; moves only when advanced.
#[cfg(test)]
pub(crate) struct StepClock(std::sync::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl StepClock {
    pub(crate) fn starting_now() -> Self {
        Self(std::sync::Mutex::new(Utc::now()))
    }

    pub(crate) fn advance(&self, secs: i64) {
        if let Ok(mut now) = self.0.lock() {
            *now += TimeDelta::seconds(secs);
        }
    }
}

#[cfg(test)]
impl Clock for StepClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.lock().map(|now| *now).unwrap_or_else(|_| Utc::now())
    }
}
