//! Reminder rules
//!
//! Decides which notifications are due for a user on a given day. Delivery
//! belongs to the notification collaborator; this module only answers
//! "should we send, and with what figures".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::standard_probability_log;
use crate::dates::{add_days, days_between};
use crate::types::{CycleRecord, DailyProbability};

/// Figures for a high-fertility reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PregnancyReminder {
    pub ovulation_date: NaiveDate,
    /// `today - ovulation_date`; negative before ovulation
    pub days_from_ovulation: i64,
    /// Today's chance in percent, 0 when today has no entry
    pub probability: f64,
}

/// A reminder that is due today
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reminder {
    /// Ovulation is tomorrow
    Ovulation { ovulation_date: NaiveDate },
    /// Today sits inside the high-fertility span
    Pregnancy(PregnancyReminder),
}

/// Record with the latest start date strictly before `today`
pub fn latest_cycle_before(records: &[CycleRecord], today: NaiveDate) -> Option<&CycleRecord> {
    records
        .iter()
        .filter(|r| r.start_date < today)
        .max_by_key(|r| r.start_date)
}

/// True on the day before ovulation when reminders are enabled
pub fn ovulation_reminder_due(record: &CycleRecord, today: NaiveDate) -> bool {
    record.reminder_enabled && today == add_days(record.ovulation_date, -1)
}

/// High-fertility reminder for `today`, if one is due.
///
/// Fires only while today lies strictly inside the span covered by the
/// probability entries, so the first and last entry days stay silent.
pub fn pregnancy_reminder(record: &CycleRecord, today: NaiveDate) -> Option<PregnancyReminder> {
    if !record.reminder_enabled {
        return None;
    }

    let standard;
    let log: &[DailyProbability] = if record.probability_log.is_empty() {
        standard = standard_probability_log(record.ovulation_date);
        &standard
    } else {
        &record.probability_log
    };

    let (mut start, mut end, mut probability) = (today, today, 0.0);
    for entry in log {
        start = start.min(entry.date);
        end = end.max(entry.date);
        if entry.date == today {
            probability = entry.probability;
        }
    }

    if today > start && today < end {
        Some(PregnancyReminder {
            ovulation_date: record.ovulation_date,
            days_from_ovulation: days_between(record.ovulation_date, today),
            probability,
        })
    } else {
        None
    }
}

/// All reminders due today for the latest cycle that began before today
pub fn due_reminders(records: &[CycleRecord], today: NaiveDate) -> Vec<Reminder> {
    let Some(latest) = latest_cycle_before(records, today) else {
        return Vec::new();
    };

    let mut due = Vec::new();
    if ovulation_reminder_due(latest, today) {
        due.push(Reminder::Ovulation {
            ovulation_date: latest.ovulation_date,
        });
    }
    if let Some(reminder) = pregnancy_reminder(latest, today) {
        due.push(Reminder::Pregnancy(reminder));
    }
    due
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CycleInput;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(start: NaiveDate, reminders: bool) -> CycleRecord {
        CycleRecord::from_input(None, &CycleInput::new(start, 5, 28).with_reminder(reminders))
    }

    #[test]
    fn test_latest_cycle_before_excludes_today() {
        let records = vec![
            record(d(2024, 2, 1), true),
            record(d(2024, 1, 1), true),
            record(d(2024, 1, 15), true),
        ];
        let latest = latest_cycle_before(&records, d(2024, 2, 1)).unwrap();
        assert_eq!(latest.start_date, d(2024, 1, 15));
        assert!(latest_cycle_before(&records, d(2024, 1, 1)).is_none());
    }

    #[test]
    fn test_ovulation_reminder_day_before() {
        let r = record(d(2024, 1, 1), true);
        assert!(ovulation_reminder_due(&r, d(2024, 1, 14)));
        assert!(!ovulation_reminder_due(&r, d(2024, 1, 15)));
        assert!(!ovulation_reminder_due(&record(d(2024, 1, 1), false), d(2024, 1, 14)));
    }

    #[test]
    fn test_pregnancy_reminder_window_is_exclusive() {
        let r = record(d(2024, 1, 1), true);
        // Standard log spans Jan 10..=Jan 16
        assert!(pregnancy_reminder(&r, d(2024, 1, 10)).is_none());
        assert!(pregnancy_reminder(&r, d(2024, 1, 16)).is_none());

        let reminder = pregnancy_reminder(&r, d(2024, 1, 13)).unwrap();
        assert_eq!(
            reminder,
            PregnancyReminder {
                ovulation_date: d(2024, 1, 15),
                days_from_ovulation: -2,
                probability: 19.3,
            }
        );
    }

    #[test]
    fn test_pregnancy_reminder_disabled() {
        let r = record(d(2024, 1, 1), false);
        assert!(pregnancy_reminder(&r, d(2024, 1, 13)).is_none());
    }

    #[test]
    fn test_due_reminders_combines_rules() {
        let records = vec![record(d(2024, 1, 1), true)];
        let due = due_reminders(&records, d(2024, 1, 14));

        assert_eq!(due.len(), 2);
        assert_eq!(
            due[0],
            Reminder::Ovulation {
                ovulation_date: d(2024, 1, 15)
            }
        );
        assert!(matches!(due[1], Reminder::Pregnancy(_)));
        assert!(due_reminders(&records, d(2024, 1, 25)).is_empty());
    }
}
