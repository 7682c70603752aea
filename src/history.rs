//! Cycle history aggregation
//!
//! Folds a newest-first list of recorded cycles into display statistics:
//! rounded averages, the next predicted period start, and a binary
//! regularity classification over the three most recent cycles.

use chrono::NaiveDate;

use crate::dates::{add_days, days_between};
use crate::types::{CycleHistorySummary, CycleRecord, Regularity};

/// Number of most recent cycles considered for regularity
pub const REGULARITY_WINDOW: usize = 3;

/// Period lengths at or below this are irregular
pub const MIN_REGULAR_PERIOD_EXCLUSIVE: u32 = 2;

/// Period lengths above this are irregular
pub const MAX_REGULAR_PERIOD: u32 = 7;

/// Cycle lengths below this are irregular
pub const MIN_REGULAR_CYCLE: u32 = 21;

/// Cycle lengths above this are irregular
pub const MAX_REGULAR_CYCLE: u32 = 35;

/// Largest allowed difference between consecutive cycle lengths
pub const MAX_CYCLE_SWING: u32 = 7;

/// Summarize a history ordered newest first.
///
/// `today` anchors the next predicted date; pass [`crate::dates::today`]
/// outside of tests.
pub fn summarize_history(records: &[CycleRecord], today: NaiveDate) -> CycleHistorySummary {
    CycleHistorySummary {
        total_cycles: records.len(),
        average_cycle_length: average_cycle_length(records),
        average_period_length: average_period_length(records),
        next_predicted_date: next_predicted_date(records, today),
        regularity: classify_regularity(records),
    }
}

/// Mean cycle length rounded to the nearest day, `None` when empty
pub fn average_cycle_length(records: &[CycleRecord]) -> Option<u32> {
    rounded_mean(records.iter().map(|r| r.cycle_length))
}

/// Mean period length rounded to the nearest day, `None` when empty
pub fn average_period_length(records: &[CycleRecord]) -> Option<u32> {
    rounded_mean(records.iter().map(|r| r.period_length))
}

/// First period start strictly after `today`, stepping from the most
/// recent record by its own cycle length.
///
/// Returns `None` for an empty history or a zero cycle length, which
/// would never advance.
pub fn next_predicted_date(records: &[CycleRecord], today: NaiveDate) -> Option<NaiveDate> {
    let latest = records.first()?;
    let step = i64::from(latest.cycle_length);
    if step == 0 {
        return None;
    }

    let first = add_days(latest.start_date, step);
    if first > today {
        return Some(first);
    }

    // Jump straight to the first multiple of `step` past today
    let elapsed = days_between(latest.start_date, today);
    let cycles = elapsed / step + 1;
    Some(add_days(latest.start_date, cycles.saturating_mul(step)))
}

/// Classify the three most recent cycles.
///
/// Any cycle with an out-of-range period or cycle length makes the history
/// irregular outright. Otherwise the largest swing between consecutive
/// cycle lengths decides. An empty history counts as regular.
pub fn classify_regularity(records: &[CycleRecord]) -> Regularity {
    let recent = &records[..records.len().min(REGULARITY_WINDOW)];

    let out_of_range = recent
        .iter()
        .any(|r| !period_in_regular_range(r.period_length) || !cycle_in_regular_range(r.cycle_length));
    if out_of_range {
        return Regularity::Irregular;
    }

    let max_swing = recent
        .windows(2)
        .map(|pair| pair[0].cycle_length.abs_diff(pair[1].cycle_length))
        .max()
        .unwrap_or(0);

    if max_swing <= MAX_CYCLE_SWING {
        Regularity::Regular
    } else {
        Regularity::Irregular
    }
}

fn period_in_regular_range(period_length: u32) -> bool {
    period_length > MIN_REGULAR_PERIOD_EXCLUSIVE && period_length <= MAX_REGULAR_PERIOD
}

fn cycle_in_regular_range(cycle_length: u32) -> bool {
    (MIN_REGULAR_CYCLE..=MAX_REGULAR_CYCLE).contains(&cycle_length)
}

/// Order records newest first by start date
pub fn sort_newest_first(records: &mut [CycleRecord]) {
    records.sort_by(|a, b| b.start_date.cmp(&a.start_date));
}

/// Arithmetic mean rounded half up
fn rounded_mean(values: impl Iterator<Item = u32>) -> Option<u32> {
    let (sum, count) = values.fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        return None;
    }
    Some(((sum * 2 + count) / (count * 2)) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CycleId, CycleInput};
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(start: NaiveDate, period: u32, cycle: u32) -> CycleRecord {
        CycleRecord::from_input(
            Some(CycleId(start.to_string())),
            &CycleInput::new(start, period, cycle),
        )
    }

    #[test]
    fn test_empty_history() {
        let summary = summarize_history(&[], d(2024, 6, 1));

        assert_eq!(
            summary,
            CycleHistorySummary {
                total_cycles: 0,
                average_cycle_length: None,
                average_period_length: None,
                next_predicted_date: None,
                regularity: Regularity::Regular,
            }
        );
    }

    #[test]
    fn test_steady_history_is_regular() {
        let records = vec![
            record(d(2024, 3, 26), 4, 28),
            record(d(2024, 2, 26), 5, 29),
            record(d(2024, 1, 29), 3, 28),
        ];
        assert_eq!(classify_regularity(&records), Regularity::Regular);
    }

    #[test]
    fn test_out_of_range_cycle_is_irregular() {
        let records = vec![
            record(d(2024, 3, 1), 5, 20),
            record(d(2024, 2, 1), 5, 40),
            record(d(2024, 1, 1), 5, 22),
        ];
        assert_eq!(classify_regularity(&records), Regularity::Irregular);
    }

    #[test]
    fn test_period_bounds() {
        let at = |period| vec![record(d(2024, 1, 1), period, 28)];
        assert_eq!(classify_regularity(&at(2)), Regularity::Irregular);
        assert_eq!(classify_regularity(&at(3)), Regularity::Regular);
        assert_eq!(classify_regularity(&at(7)), Regularity::Regular);
        assert_eq!(classify_regularity(&at(8)), Regularity::Irregular);
        // A missing length normalizes to zero at the boundary
        assert_eq!(classify_regularity(&at(0)), Regularity::Irregular);
    }

    #[test]
    fn test_cycle_bounds() {
        let at = |cycle| vec![record(d(2024, 1, 1), 5, cycle)];
        assert_eq!(classify_regularity(&at(20)), Regularity::Irregular);
        assert_eq!(classify_regularity(&at(21)), Regularity::Regular);
        assert_eq!(classify_regularity(&at(35)), Regularity::Regular);
        assert_eq!(classify_regularity(&at(36)), Regularity::Irregular);
    }

    #[test]
    fn test_swing_threshold() {
        let seven = vec![
            record(d(2024, 3, 1), 5, 22),
            record(d(2024, 2, 1), 5, 29),
            record(d(2024, 1, 1), 5, 29),
        ];
        assert_eq!(classify_regularity(&seven), Regularity::Regular);

        let eight = vec![
            record(d(2024, 3, 1), 5, 22),
            record(d(2024, 2, 1), 5, 30),
            record(d(2024, 1, 1), 5, 30),
        ];
        assert_eq!(classify_regularity(&eight), Regularity::Irregular);
    }

    #[test]
    fn test_only_three_most_recent_count() {
        let records = vec![
            record(d(2024, 4, 1), 5, 28),
            record(d(2024, 3, 1), 5, 28),
            record(d(2024, 2, 1), 5, 28),
            record(d(2024, 1, 1), 12, 60),
        ];
        assert_eq!(classify_regularity(&records), Regularity::Regular);
    }

    #[test]
    fn test_averages_round_to_nearest() {
        let records = vec![
            record(d(2024, 3, 1), 4, 28),
            record(d(2024, 2, 1), 5, 29),
        ];
        // 28.5 rounds up, 4.5 rounds up
        assert_eq!(average_cycle_length(&records), Some(29));
        assert_eq!(average_period_length(&records), Some(5));

        let records = vec![
            record(d(2024, 3, 1), 4, 28),
            record(d(2024, 2, 1), 4, 28),
            record(d(2024, 1, 1), 5, 29),
        ];
        assert_eq!(average_cycle_length(&records), Some(28));
        assert_eq!(average_period_length(&records), Some(4));
    }

    #[test]
    fn test_next_predicted_advances_past_today() {
        let today = d(2024, 6, 1);
        let start = add_days(today, -70);
        let records = vec![record(start, 5, 28)];

        assert_eq!(next_predicted_date(&records, today), Some(add_days(today, 14)));
    }

    #[test]
    fn test_next_predicted_is_strictly_after_today() {
        let today = d(2024, 6, 1);
        let records = vec![record(add_days(today, -28), 5, 28)];
        assert_eq!(next_predicted_date(&records, today), Some(add_days(today, 28)));

        let records = vec![record(add_days(today, -10), 5, 28)];
        assert_eq!(next_predicted_date(&records, today), Some(add_days(today, 18)));
    }

    #[test]
    fn test_next_predicted_uses_most_recent_record() {
        let today = d(2024, 6, 1);
        let records = vec![
            record(d(2024, 5, 20), 5, 30),
            record(d(2024, 4, 20), 5, 21),
        ];
        assert_eq!(next_predicted_date(&records, today), Some(d(2024, 6, 19)));
    }

    #[test]
    fn test_next_predicted_zero_cycle_does_not_loop() {
        let records = vec![record(d(2024, 1, 1), 5, 0)];
        assert_eq!(next_predicted_date(&records, d(2024, 6, 1)), None);
    }

    #[test]
    fn test_sort_newest_first() {
        let mut records = vec![
            record(d(2024, 1, 1), 5, 28),
            record(d(2024, 3, 1), 5, 28),
            record(d(2024, 2, 1), 5, 28),
        ];
        sort_newest_first(&mut records);
        let starts: Vec<NaiveDate> = records.iter().map(|r| r.start_date).collect();
        assert_eq!(starts, vec![d(2024, 3, 1), d(2024, 2, 1), d(2024, 1, 1)]);
    }
}
