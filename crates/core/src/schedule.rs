// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

//! Schedule: either a fixed interval or a cron expression.

use std::time::Duration;
use thiserror::Error;

/// Minimum allowed interval, per the Step Graph invariant: "if
/// `S.interval < 1 min`, construction fails".
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Sentinel interval returned by `Schedule::interval()` for cron schedules.
/// The scheduler uses this only to detect "arm from cron expression
/// instead"; the real period comes from `Schedule::next_fire_after`.
pub const CRON_SENTINEL_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("interval must be at least {min:?}, got {actual:?}", min = MIN_INTERVAL)]
    IntervalTooShort { actual: Duration },
    #[error("invalid cron expression {0:?}: {1}")]
    InvalidCron(String, String),
}

/// Either a fixed interval or a standard five-field cron expression.
#[derive(Debug, Clone)]
pub enum Schedule {
    Interval(Duration),
    Cron(String),
}

impl Schedule {
    pub fn interval(duration: Duration) -> Result<Self, ScheduleError> {
        if duration < MIN_INTERVAL {
            return Err(ScheduleError::IntervalTooShort { actual: duration });
        }
        Ok(Schedule::Interval(duration))
    }

    pub fn cron(expr: impl Into<String>) -> Result<Self, ScheduleError> {
        let expr = expr.into();
        if expr.split_whitespace().count() != 5 {
            return Err(ScheduleError::InvalidCron(
                expr,
                "cron expression must have exactly five fields (minute hour day-of-month month day-of-week)"
                    .to_string(),
            ));
        }
        // Validate eagerly so construction fails fast rather than at first fire.
        chrono_next_fire::to_cron_crate_expr(&expr)
            .parse::<cron::Schedule>()
            .map_err(|e| ScheduleError::InvalidCron(expr.clone(), e.to_string()))?;
        Ok(Schedule::Cron(expr))
    }

    /// The literal period for interval schedules, or
    /// [`CRON_SENTINEL_INTERVAL`] for cron schedules (the scheduler arms its
    /// next-fire computation from `next_fire_after` instead).
    pub fn interval_or_sentinel(&self) -> Duration {
        match self {
            Schedule::Interval(d) => *d,
            Schedule::Cron(_) => CRON_SENTINEL_INTERVAL,
        }
    }

    /// Compute the next fire time at or after `after_epoch_ms`, in epoch
    /// milliseconds.
    pub fn next_fire_after(&self, after_epoch_ms: u64) -> Result<u64, ScheduleError> {
        match self {
            Schedule::Interval(d) => Ok(after_epoch_ms + d.as_millis() as u64),
            Schedule::Cron(expr) => {
                use chrono_next_fire::next_fire_ms;
                next_fire_ms(expr, after_epoch_ms)
                    .map_err(|e| ScheduleError::InvalidCron(expr.clone(), e))
            }
        }
    }
}

/// Small shim translating between epoch-millisecond timestamps (used
/// throughout the core data model) and the `cron` crate's `chrono`-based
/// `upcoming()` iterator.
mod chrono_next_fire {
    use chrono::{DateTime, Utc};
    use cron::Schedule as CronSchedule;
    use std::str::FromStr;

    /// The standard five-field expression this API accepts (minute hour
    /// day-of-month month day-of-week) maps onto the `cron` crate's
    /// seconds-first six-field format by pinning seconds to `0`.
    pub fn to_cron_crate_expr(standard_five_field: &str) -> String {
        format!("0 {standard_five_field}")
    }

    pub fn next_fire_ms(expr: &str, after_epoch_ms: u64) -> Result<u64, String> {
        let schedule = CronSchedule::from_str(&to_cron_crate_expr(expr)).map_err(|e| e.to_string())?;
        let after: DateTime<Utc> = DateTime::from_timestamp_millis(after_epoch_ms as i64)
            .ok_or_else(|| "epoch_ms out of range for DateTime<Utc>".to_string())?;
        schedule
            .after(&after)
            .next()
            .map(|dt| dt.timestamp_millis() as u64)
            .ok_or_else(|| "cron expression never fires again".to_string())
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
