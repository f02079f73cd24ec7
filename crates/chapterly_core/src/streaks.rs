//! crates/chapterly_core/src/streaks.rs
//!
//! The streak engine: a pure derivation over the per-day log of minutes
//! read. The only mutator is the upsert of today's record; everything else
//! walks or windows the log.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{DailyStreakRecord, StreakDay};
use crate::ports::{DailyStreakUpsert, PortError, StreakStore};

#[derive(Debug, thiserror::Error)]
pub enum StreakError {
    #[error(transparent)]
    Persistence(#[from] PortError),
}

/// Sunday-first single-letter day labels, as shown on the weekly strip.
const DAY_LABELS: [char; 7] = ['S', 'M', 'T', 'W', 'T', 'F', 'S'];

/// Length of the unbroken run of goal-met days ending at today or yesterday.
///
/// A day with a record whose goal is not yet met does not count, and when
/// that day is today it does not break the run either: the walk just starts
/// from yesterday. Any older day without a goal-met record (missing or
/// goal_met = false) terminates the run; streaks do not skip gaps.
pub fn streak_length(records: &[DailyStreakRecord], today: NaiveDate) -> u32 {
    let by_date: HashMap<NaiveDate, &DailyStreakRecord> =
        records.iter().map(|r| (r.date, r)).collect();

    let today_met = by_date.get(&today).map(|r| r.goal_met).unwrap_or(false);
    let mut cursor = if today_met {
        today
    } else {
        today - Days::new(1)
    };

    let mut streak = 0;
    while let Some(record) = by_date.get(&cursor) {
        if !record.goal_met {
            break;
        }
        streak += 1;
        cursor = cursor - Days::new(1);
    }
    streak
}

/// The seven calendar days ending today, oldest first. Days without a
/// record default to zero minutes and an unmet goal.
pub fn week_view(records: &[DailyStreakRecord], today: NaiveDate) -> Vec<StreakDay> {
    let by_date: HashMap<NaiveDate, &DailyStreakRecord> =
        records.iter().map(|r| (r.date, r)).collect();

    (0..7u64)
        .rev()
        .map(|offset| {
            let date = today - Days::new(offset);
            let record = by_date.get(&date);
            StreakDay {
                label: DAY_LABELS[date.weekday().num_days_from_sunday() as usize],
                date,
                goal_reached: record.map(|r| r.goal_met).unwrap_or(false),
                minutes_read: record.map(|r| r.minutes_read).unwrap_or(0),
            }
        })
        .collect()
}

/// Owns the per-day streak records and the derived views over them.
#[derive(Clone)]
pub struct StreakEngine {
    store: Arc<dyn StreakStore>,
}

impl StreakEngine {
    pub fn new(store: Arc<dyn StreakStore>) -> Self {
        Self { store }
    }

    /// Replaces today's record with the given minute total, snapshotting
    /// whether the goal in effect right now was met. Historical records are
    /// never revisited when the goal later changes.
    pub async fn upsert_today(
        &self,
        user_id: Uuid,
        minutes_read: u32,
        daily_goal: u32,
    ) -> Result<(), StreakError> {
        let today = Utc::now().date_naive();
        let goal_met = minutes_read >= daily_goal;
        self.store
            .upsert_day(DailyStreakUpsert {
                user_id,
                date: today,
                minutes_read,
                goal_met,
            })
            .await?;
        debug!(%user_id, %today, minutes_read, goal_met, "upserted today's streak record");
        Ok(())
    }

    pub async fn current_streak(&self, user_id: Uuid) -> Result<u32, StreakError> {
        let records = self.store.list_days(user_id).await?;
        Ok(streak_length(&records, Utc::now().date_naive()))
    }

    pub async fn weekly_view(&self, user_id: Uuid) -> Result<Vec<StreakDay>, StreakError> {
        let records = self.store.list_days(user_id).await?;
        Ok(week_view(&records, Utc::now().date_naive()))
    }

    /// Minutes recorded for today. A failed fetch reports 0; this feeds a
    /// display value only.
    pub async fn today_minutes(&self, user_id: Uuid) -> u32 {
        match self.store.list_days(user_id).await {
            Ok(records) => {
                let today = Utc::now().date_naive();
                records
                    .iter()
                    .find(|r| r.date == today)
                    .map(|r| r.minutes_read)
                    .unwrap_or(0)
            }
            Err(e) => {
                warn!(%user_id, error = %e, "failed to load streak records; reporting 0");
                0
            }
        }
    }

    /// Sum of minutes across the weekly view. A failed fetch reports 0.
    pub async fn weekly_minutes(&self, user_id: Uuid) -> u32 {
        match self.store.list_days(user_id).await {
            Ok(records) => week_view(&records, Utc::now().date_naive())
                .iter()
                .map(|d| d.minutes_read)
                .sum(),
            Err(e) => {
                warn!(%user_id, error = %e, "failed to load streak records; reporting 0");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryStreakStore;
    use proptest::prelude::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(date: NaiveDate, minutes: u32, goal_met: bool) -> DailyStreakRecord {
        DailyStreakRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            date,
            minutes_read: minutes,
            goal_met,
        }
    }

    #[test]
    fn yesterday_miss_breaks_the_streak() {
        // Goal met three and two days ago, missed yesterday, nothing today.
        let today = day(2025, 3, 15);
        let records = vec![
            record(today - Days::new(3), 45, true),
            record(today - Days::new(2), 40, true),
            record(today - Days::new(1), 10, false),
        ];
        assert_eq!(streak_length(&records, today), 0);
    }

    #[test]
    fn unfinished_today_does_not_break_the_chain() {
        // Two goal-met days, then 10 minutes so far today: the streak stands
        // at 2 and today will join once its goal is met.
        let today = day(2025, 3, 15);
        let records = vec![
            record(today - Days::new(2), 35, true),
            record(today - Days::new(1), 30, true),
            record(today, 10, false),
        ];
        assert_eq!(streak_length(&records, today), 2);
    }

    #[test]
    fn goal_met_today_counts_immediately() {
        let today = day(2025, 3, 15);
        let records = vec![
            record(today - Days::new(1), 30, true),
            record(today, 30, true),
        ];
        assert_eq!(streak_length(&records, today), 2);
    }

    #[test]
    fn a_missing_day_is_a_gap_not_a_skip() {
        let today = day(2025, 3, 15);
        let records = vec![
            record(today - Days::new(3), 30, true),
            // no record two days ago
            record(today - Days::new(1), 30, true),
            record(today, 30, true),
        ];
        assert_eq!(streak_length(&records, today), 2);
    }

    #[test]
    fn empty_log_means_no_streak() {
        assert_eq!(streak_length(&[], day(2025, 3, 15)), 0);
    }

    #[test]
    fn week_view_is_seven_days_oldest_first() {
        let today = day(2025, 3, 15); // a Saturday
        let records = vec![record(today, 25, false)];
        let week = week_view(&records, today);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, today - Days::new(6));
        assert_eq!(week[6].date, today);
        assert_eq!(week[6].minutes_read, 25);
        // Sunday-first labels: the strip runs Sun..Sat for this week.
        let labels: Vec<char> = week.iter().map(|d| d.label).collect();
        assert_eq!(labels, vec!['S', 'M', 'T', 'W', 'T', 'F', 'S']);
    }

    #[test]
    fn week_view_defaults_missing_days_to_zero() {
        let week = week_view(&[], day(2025, 3, 15));
        assert!(week.iter().all(|d| d.minutes_read == 0 && !d.goal_reached));
    }

    proptest! {
        /// The walk never counts more days than have goal-met records, and
        /// matches a naive re-walk over the generated week.
        #[test]
        fn streak_matches_naive_walk(met in proptest::collection::vec(any::<bool>(), 0..14)) {
            let today = day(2025, 3, 15);
            let records: Vec<DailyStreakRecord> = met
                .iter()
                .enumerate()
                .map(|(i, &m)| record(today - Days::new(i as u64), 30, m))
                .collect();

            let mut expected = 0;
            let mut offset = if met.first().copied().unwrap_or(false) { 0 } else { 1 };
            while let Some(&m) = met.get(offset) {
                if !m {
                    break;
                }
                expected += 1;
                offset += 1;
            }
            prop_assert_eq!(streak_length(&records, today), expected);
        }

        /// Weekly totals agree between the view and a direct sum.
        #[test]
        fn weekly_sum_matches_view(minutes in proptest::collection::vec(0u32..240, 0..10)) {
            let today = day(2025, 3, 15);
            let records: Vec<DailyStreakRecord> = minutes
                .iter()
                .enumerate()
                .map(|(i, &m)| record(today - Days::new(i as u64), m, m >= 30))
                .collect();
            let view = week_view(&records, today);
            let total: u32 = view.iter().map(|d| d.minutes_read).sum();
            let direct: u32 = records
                .iter()
                .filter(|r| r.date > today - Days::new(7))
                .map(|r| r.minutes_read)
                .sum();
            prop_assert_eq!(total, direct);
        }
    }

    #[tokio::test]
    async fn upsert_is_keyed_on_the_day() {
        let store = Arc::new(MemoryStreakStore::new());
        let engine = StreakEngine::new(store.clone());
        let user = Uuid::new_v4();
        engine.upsert_today(user, 10, 30).await.unwrap();
        engine.upsert_today(user, 35, 30).await.unwrap();
        let days = store.list(user);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].minutes_read, 35);
        assert!(days[0].goal_met);
    }

    #[tokio::test]
    async fn weekly_minutes_equals_view_sum() {
        let store = Arc::new(MemoryStreakStore::new());
        let engine = StreakEngine::new(store.clone());
        let user = Uuid::new_v4();
        engine.upsert_today(user, 42, 30).await.unwrap();
        let view = engine.weekly_view(user).await.unwrap();
        let from_view: u32 = view.iter().map(|d| d.minutes_read).sum();
        assert_eq!(engine.weekly_minutes(user).await, from_view);
        assert_eq!(engine.today_minutes(user).await, 42);
    }

    #[tokio::test]
    async fn failed_reads_degrade_to_zero() {
        let store = Arc::new(MemoryStreakStore::new());
        let engine = StreakEngine::new(store.clone());
        let user = Uuid::new_v4();
        engine.upsert_today(user, 42, 30).await.unwrap();
        store.fail_reads(true);
        assert_eq!(engine.today_minutes(user).await, 0);
        assert_eq!(engine.weekly_minutes(user).await, 0);
        assert!(engine.current_streak(user).await.is_err());
    }
}
