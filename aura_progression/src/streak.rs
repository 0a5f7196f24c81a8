// SPDX-License-Identifier: MIT OR Apache-2.0
//! Consecutive-day activity tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{StreakConfig, StreakTier};

/// Streak fields of a user's progression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    /// Current run of consecutive active days.
    pub streak_days: u32,
    /// Longest run ever achieved.
    pub longest_streak: u32,
    /// Date of the last counted activity.
    pub last_activity_date: Option<NaiveDate>,
}

/// What an activity did to the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First activity ever recorded.
    Started,
    /// Activity on the day after the last one.
    Extended,
    /// A day or more was missed; the streak restarted at 1.
    Reset,
    /// Already counted today.
    AlreadyCounted,
    /// Dated before the last counted activity; ignored.
    Stale,
}

impl StreakChange {
    /// Whether this activity opened a new active day.
    #[must_use]
    pub const fn is_new_day(&self) -> bool {
        matches!(self, Self::Started | Self::Extended | Self::Reset)
    }
}

/// Applies activity dates to a [`StreakState`] and owns the multiplier table.
#[derive(Debug, Clone)]
pub struct StreakCounter {
    tiers: Vec<StreakTier>,
}

impl Default for StreakCounter {
    fn default() -> Self {
        Self::new(&StreakConfig::default())
    }
}

impl StreakCounter {
    /// Creates a counter from configuration.
    #[must_use]
    pub fn new(config: &StreakConfig) -> Self {
        Self {
            tiers: config.tiers.clone(),
        }
    }

    /// Records activity on `date`.
    pub fn record_activity(&self, state: &mut StreakState, date: NaiveDate) -> StreakChange {
        let change = match state.last_activity_date {
            None => {
                state.streak_days = 1;
                StreakChange::Started
            },
            Some(last) if date == last => return StreakChange::AlreadyCounted,
            Some(last) if date < last => return StreakChange::Stale,
            Some(last) if last.succ_opt() == Some(date) => {
                state.streak_days = state.streak_days.saturating_add(1);
                StreakChange::Extended
            },
            Some(_) => {
                state.streak_days = 1;
                StreakChange::Reset
            },
        };
        state.longest_streak = state.longest_streak.max(state.streak_days);
        state.last_activity_date = Some(date);
        change
    }

    /// XP multiplier for a streak length.
    #[must_use]
    pub fn multiplier_for(&self, streak_days: u32) -> f64 {
        self.tiers
            .iter()
            .rev()
            .find(|tier| streak_days >= tier.min_days)
            .map_or(1.0, |tier| tier.multiplier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_first_activity() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        assert_eq!(
            counter.record_activity(&mut state, day(15)),
            StreakChange::Started
        );
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.longest_streak, 1);
        assert_eq!(state.last_activity_date, Some(day(15)));
    }

    #[test]
    fn test_consecutive_days() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, day(1));
        counter.record_activity(&mut state, day(2));
        assert_eq!(
            counter.record_activity(&mut state, day(3)),
            StreakChange::Extended
        );
        assert_eq!(state.streak_days, 3);
        assert_eq!(state.longest_streak, 3);
    }

    #[test]
    fn test_gap_resets() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, day(1));
        assert_eq!(
            counter.record_activity(&mut state, day(4)),
            StreakChange::Reset
        );
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.last_activity_date, Some(day(4)));
    }

    #[test]
    fn test_longest_survives_reset() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, day(1));
        counter.record_activity(&mut state, day(2));
        counter.record_activity(&mut state, day(5));
        assert_eq!(state.streak_days, 1);
        assert_eq!(state.longest_streak, 2);
        assert!(state.streak_days <= state.longest_streak);
    }

    #[test]
    fn test_same_day_is_noop() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, day(10));
        let before = state;
        assert_eq!(
            counter.record_activity(&mut state, day(10)),
            StreakChange::AlreadyCounted
        );
        assert_eq!(state, before);
    }

    #[test]
    fn test_stale_date_ignored() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, day(10));
        counter.record_activity(&mut state, day(11));
        assert_eq!(
            counter.record_activity(&mut state, day(3)),
            StreakChange::Stale
        );
        assert_eq!(state.streak_days, 2);
        assert_eq!(state.last_activity_date, Some(day(11)));
    }

    #[test]
    fn test_month_and_year_rollover() {
        let counter = StreakCounter::default();
        let mut state = StreakState::default();
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(state.streak_days, 2);

        let mut state = StreakState::default();
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(state.streak_days, 2);

        let mut state = StreakState::default();
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        counter.record_activity(&mut state, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(state.streak_days, 1, "2024 is a leap year");
    }

    #[test]
    fn test_multiplier_steps() {
        let counter = StreakCounter::default();
        assert_eq!(counter.multiplier_for(0), 1.0);
        assert_eq!(counter.multiplier_for(6), 1.0);
        assert_eq!(counter.multiplier_for(7), 1.25);
        assert_eq!(counter.multiplier_for(13), 1.25);
        assert_eq!(counter.multiplier_for(14), 1.5);
        assert_eq!(counter.multiplier_for(30), 1.75);
        assert_eq!(counter.multiplier_for(99), 2.0);
        assert_eq!(counter.multiplier_for(100), 2.5);
        assert_eq!(counter.multiplier_for(1_000), 2.5);
    }

    #[test]
    fn test_empty_table() {
        let counter = StreakCounter::new(&StreakConfig { tiers: Vec::new() });
        assert_eq!(counter.multiplier_for(365), 1.0);
    }

    #[test]
    fn test_change_is_new_day() {
        assert!(StreakChange::Started.is_new_day());
        assert!(StreakChange::Reset.is_new_day());
        assert!(!StreakChange::AlreadyCounted.is_new_day());
        assert!(!StreakChange::Stale.is_new_day());
    }
}
