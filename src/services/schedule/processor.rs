use serde::Serialize;
use time::PrimitiveDateTime;

use super::time_utils::{
    current_day, current_minutes, progress_between, split_time_range, status_between,
    time_to_minutes, DEFAULT_UPCOMING_WINDOW, INVALID_MINUTES,
};
use crate::models::{ClassStatus, ClassifiedEntry, ScheduleEntry};

/// Today's sessions that are running or still ahead.
///
/// `active` is ordered by start time, `upcoming` by minutes until start.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActiveClasses {
    pub active: Vec<ClassifiedEntry>,
    pub upcoming: Vec<ClassifiedEntry>,
}

impl ActiveClasses {
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.upcoming.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len() + self.upcoming.len()
    }

    /// Active entries first, then upcoming, each in their list order.
    pub fn iter(&self) -> impl Iterator<Item = &ClassifiedEntry> {
        self.active.iter().chain(self.upcoming.iter())
    }
}

/// Classifies schedule rows against a reference instant.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleProcessor {
    upcoming_window: i32,
}

impl Default for ScheduleProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_UPCOMING_WINDOW)
    }
}

impl ScheduleProcessor {
    pub fn new(upcoming_window: i32) -> Self {
        Self { upcoming_window }
    }

    pub fn upcoming_window(&self) -> i32 {
        self.upcoming_window
    }

    /// Buckets today's rows into active and upcoming sessions.
    ///
    /// Rows for other weekdays are ignored. Rows whose `time` is not a
    /// two-sided range of parseable times are skipped without error: one bad
    /// row must not take down the whole pass. Finished sessions are dropped.
    pub fn get_active_classes(
        &self,
        entries: &[ScheduleEntry],
        now: PrimitiveDateTime,
    ) -> ActiveClasses {
        let today = current_day(now);
        let now_min = current_minutes(now);
        let mut result = ActiveClasses::default();
        let mut skipped = 0usize;

        for entry in entries {
            if !entry.day.trim().eq_ignore_ascii_case(today) {
                continue;
            }
            let Some((start_str, end_str)) = split_time_range(&entry.time) else {
                skipped += 1;
                continue;
            };
            let start = time_to_minutes(start_str);
            let end = time_to_minutes(end_str);
            if start == INVALID_MINUTES || end == INVALID_MINUTES {
                skipped += 1;
                continue;
            }

            let status = status_between(start, end, self.upcoming_window, now_min);
            let classified = |progress, time_left, starts_in| ClassifiedEntry {
                entry: entry.clone(),
                status,
                progress,
                time_left,
                starts_in,
                start_time: start_str.to_string(),
                end_time: end_str.to_string(),
                start_minutes: start,
            };

            match status {
                ClassStatus::Active => result.active.push(classified(
                    progress_between(start, end, now_min),
                    Some(end - now_min),
                    None,
                )),
                ClassStatus::Upcoming | ClassStatus::Future => {
                    result
                        .upcoming
                        .push(classified(0.0, None, Some(start - now_min)))
                }
                ClassStatus::Finished => {}
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, day = today, "skipped rows with malformed time ranges");
        }

        result.active.sort_by_key(|e| e.start_minutes);
        result.upcoming.sort_by_key(|e| e.starts_in);
        result
    }
}
