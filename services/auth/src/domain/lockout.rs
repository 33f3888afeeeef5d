use chrono::{DateTime, Duration, Utc};

/// Account lockout after consecutive failed password checks.
///
/// Unlocking is lazy: once `locked_until` is in the past the account is open
/// again without any write. A successful login zeroes the counter.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub threshold: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: 5,
            lock_duration: Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Open,
    Locked { until: DateTime<Utc> },
}

impl LockoutPolicy {
    pub fn new(threshold: u32, lock_duration: Duration) -> Self {
        Self {
            threshold,
            lock_duration,
        }
    }

    /// Current state from the persisted lock deadline. The failure counter
    /// only matters when the next failure is recorded.
    pub fn state(&self, locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> LockState {
        match locked_until {
            Some(until) if until > now => LockState::Locked { until },
            _ => LockState::Open,
        }
    }

    /// Counter and lock after one more failure. Reaching the threshold sets a
    /// fresh lock of `lock_duration` from `now`.
    pub fn next_after_failure(
        &self,
        failed_attempts: u32,
        now: DateTime<Utc>,
    ) -> (u32, Option<DateTime<Utc>>) {
        let count = failed_attempts.saturating_add(1);
        if count >= self.threshold {
            (count, Some(now + self.lock_duration))
        } else {
            (count, None)
        }
    }
}

/// Whole minutes left on a lock, rounded up, never below 1.
pub fn remaining_minutes(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (until - now).num_seconds();
    ((secs + 59) / 60).max(1)
}
