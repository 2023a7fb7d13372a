//! Vesting schedules for genesis allocations.
//!
//! A schedule unlocks an allocation between `start` and
//! `end = start + cliff + duration`. Linear schedules interpolate exactly
//! (no compounding); milestone schedules release everything at `end`.

use crate::amount::{mul_div_floor, Amount};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VestingError {
    #[error("vesting duration must be positive")]
    ZeroDuration,
    #[error("cliff ({cliff_secs}s) exceeds vesting duration ({duration_secs}s)")]
    CliffExceedsDuration { cliff_secs: u64, duration_secs: u64 },
    #[error("vesting window overflows the timestamp range")]
    Overflow,
}

fn default_linear() -> bool {
    true
}

/// Vesting schedule attached to a genesis allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    /// Cliff duration in seconds.
    pub cliff_secs: u64,
    /// Total vesting duration in seconds.
    pub duration_secs: u64,
    /// Linear unlock when true, single milestone at the end otherwise.
    #[serde(default = "default_linear")]
    pub linear: bool,
    /// Unix start time; defaults to the genesis time.
    #[serde(default)]
    pub start_time: Option<i64>,
}

impl VestingSchedule {
    pub fn validate(&self) -> Result<(), VestingError> {
        if self.duration_secs == 0 {
            return Err(VestingError::ZeroDuration);
        }
        if self.cliff_secs > self.duration_secs {
            return Err(VestingError::CliffExceedsDuration {
                cliff_secs: self.cliff_secs,
                duration_secs: self.duration_secs,
            });
        }
        Ok(())
    }
}

/// Resolved unlock window of a vesting account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingWindow {
    pub original: Amount,
    pub start: i64,
    pub end: i64,
    pub linear: bool,
}

impl VestingWindow {
    pub fn from_schedule(
        original: Amount,
        schedule: &VestingSchedule,
        genesis_time: i64,
    ) -> Result<Self, VestingError> {
        schedule.validate()?;
        let start = schedule.start_time.unwrap_or(genesis_time);
        let span = schedule
            .cliff_secs
            .checked_add(schedule.duration_secs)
            .and_then(|s| i64::try_from(s).ok())
            .ok_or(VestingError::Overflow)?;
        let end = start.checked_add(span).ok_or(VestingError::Overflow)?;
        Ok(Self {
            original,
            start,
            end,
            linear: schedule.linear,
        })
    }

    /// Amount unlocked at unix time `t`.
    pub fn vested_amount(&self, t: i64) -> Amount {
        if t <= self.start {
            return 0;
        }
        if t >= self.end {
            return self.original;
        }
        if !self.linear {
            return 0;
        }
        let elapsed = (t - self.start) as u128;
        let total = (self.end - self.start) as u128;
        mul_div_floor(self.original, elapsed, total).unwrap_or(0)
    }

    /// Amount still locked at unix time `t`.
    pub fn locked_amount(&self, t: i64) -> Amount {
        self.original.saturating_sub(self.vested_amount(t))
    }
}
