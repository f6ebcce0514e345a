// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Preflight Contributors

use super::*;

#[test]
fn interval_below_one_minute_is_rejected() {
    let err = Schedule::interval(Duration::from_secs(30)).unwrap_err();
    assert_eq!(
        err,
        ScheduleError::IntervalTooShort {
            actual: Duration::from_secs(30)
        }
    );
}

#[test]
fn interval_at_minimum_is_accepted() {
    assert!(Schedule::interval(MIN_INTERVAL).is_ok());
}

#[test]
fn interval_schedule_reports_its_literal_period() {
    let schedule = Schedule::interval(Duration::from_secs(300)).unwrap();
    assert_eq!(schedule.interval_or_sentinel(), Duration::from_secs(300));
}

#[test]
fn cron_schedule_reports_sentinel_interval() {
    let schedule = Schedule::cron("0 * * * *").unwrap();
    assert_eq!(schedule.interval_or_sentinel(), CRON_SENTINEL_INTERVAL);
}

#[test]
fn invalid_cron_expression_is_rejected_at_construction() {
    assert!(Schedule::cron("not a cron expression").is_err());
}

#[test]
fn interval_next_fire_is_exactly_one_period_later() {
    let schedule = Schedule::interval(Duration::from_secs(120)).unwrap();
    let next = schedule.next_fire_after(1_000_000).unwrap();
    assert_eq!(next, 1_000_000 + 120_000);
}

#[test]
fn cron_next_fire_advances_past_the_given_instant() {
    // Fires every hour, on the hour.
    let schedule = Schedule::cron("0 * * * *").unwrap();
    let after = 1_700_000_000_000u64; // arbitrary epoch ms
    let next = schedule.next_fire_after(after).unwrap();
    assert!(next > after);
}
