use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use time::PrimitiveDateTime;
use tokio::sync::watch;

use super::processor::{ActiveClasses, ScheduleProcessor};
use super::time_utils::{split_time_range, time_to_minutes, INVALID_MINUTES};
use crate::core::config::ScheduleConfig;
use crate::core::errors::Result;
use crate::models::{EntryField, ScheduleEntry, Suggestion};
use crate::services::filters::FilterManager;
use crate::services::search::SearchChannel;

/// Queries shorter than this skip the worker entirely.
pub const MIN_QUERY_CHARS: usize = 2;

const WEEK_ORDER: [&str; 7] = [
    "Saturday",
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
];

pub type Dataset = Arc<[ScheduleEntry]>;

/// Holds the loaded timetable and announces every replacement to
/// subscribers such as the live view.
pub struct ScheduleStore {
    entries: Dataset,
    processor: ScheduleProcessor,
    time_overrides: HashMap<String, String>,
    publisher: watch::Sender<Dataset>,
}

impl ScheduleStore {
    pub fn new(config: &ScheduleConfig) -> Self {
        let entries: Dataset = Arc::from(Vec::new());
        let (publisher, _) = watch::channel(entries.clone());
        Self {
            entries,
            processor: ScheduleProcessor::new(config.live.upcoming_window_minutes),
            time_overrides: config.time_overrides.clone(),
            publisher,
        }
    }

    /// Replaces the dataset with `rows`, applying any time overrides.
    /// Returns how many rows were loaded.
    pub fn replace(&mut self, rows: Vec<ScheduleEntry>) -> usize {
        let mut overridden = 0usize;
        let rows: Vec<ScheduleEntry> = rows
            .into_iter()
            .map(|mut row| {
                if let Some(replacement) = self.time_overrides.get(&row.time) {
                    let original = std::mem::replace(&mut row.time, replacement.clone());
                    row.original_time = Some(original);
                    overridden += 1;
                }
                row
            })
            .collect();

        let count = rows.len();
        self.entries = Arc::from(rows);
        self.publisher.send_replace(self.entries.clone());
        tracing::info!(entries = count, overridden, "schedule dataset replaced");
        count
    }

    /// Loads a JSON array of dataset rows.
    pub fn load_json_str(&mut self, raw: &str) -> Result<usize> {
        let rows: Vec<ScheduleEntry> = serde_json::from_str(raw)?;
        Ok(self.replace(rows))
    }

    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), bytes = raw.len(), "reading schedule file");
        self.load_json_str(&raw)
    }

    pub fn all_data(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Shared handle to the current dataset.
    pub fn dataset(&self) -> Dataset {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Receives the current dataset and every later replacement.
    pub fn subscribe(&self) -> watch::Receiver<Dataset> {
        self.publisher.subscribe()
    }

    pub fn processor(&self) -> ScheduleProcessor {
        self.processor
    }

    pub fn get_active_classes(&self, now: PrimitiveDateTime) -> ActiveClasses {
        self.processor.get_active_classes(&self.entries, now)
    }

    /// Distinct non-empty values of `field`, ordered for a dropdown.
    ///
    /// Days follow the Saturday-first academic week, times their start
    /// minute, everything else a case-insensitive natural order.
    pub fn unique_values(&self, field: EntryField) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut values: Vec<String> = self
            .entries
            .iter()
            .map(|e| e.field(field))
            .filter(|v| !v.is_empty() && seen.insert(*v))
            .map(str::to_string)
            .collect();

        match field {
            EntryField::Day => values.sort_by_key(|d| day_rank(d)),
            EntryField::Time => values.sort_by_key(|t| start_minutes(t)),
            _ => values.sort_by(|a, b| natural_order(a, b)),
        }
        values
    }

    /// Hands the current dataset to the search worker.
    pub async fn init_search(&self, channel: &SearchChannel) -> Result<()> {
        channel.init(self.entries.to_vec()).await
    }

    /// Text search composed with the structural filters, in search
    /// relevance order. A query under [`MIN_QUERY_CHARS`] matches
    /// everything and never reaches the worker.
    pub async fn query(
        &self,
        channel: &SearchChannel,
        filters: &FilterManager,
    ) -> Result<Vec<ScheduleEntry>> {
        let search = filters.filters().search;
        let query = search.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(filters.apply_filters(&self.entries));
        }
        let hits = channel.search(query).await?;
        Ok(hits.into_iter().filter(|e| filters.matches(e)).collect())
    }

    /// "Did you mean" prompts; empty for queries under [`MIN_QUERY_CHARS`].
    pub async fn suggest(&self, channel: &SearchChannel, query: &str) -> Result<Vec<Suggestion>> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Ok(Vec::new());
        }
        channel.suggest(query).await
    }
}

fn day_rank(day: &str) -> usize {
    WEEK_ORDER
        .iter()
        .position(|d| d.eq_ignore_ascii_case(day.trim()))
        .unwrap_or(WEEK_ORDER.len())
}

/// Start of a `"start – end"` range, or of a lone time token. Unparseable
/// values sort last.
fn start_minutes(time: &str) -> i32 {
    let start = split_time_range(time).map_or(time, |(start, _)| start);
    match time_to_minutes(start) {
        INVALID_MINUTES => i32::MAX,
        minutes => minutes,
    }
}

fn natural_order(a: &str, b: &str) -> Ordering {
    natord::compare_ignore_case(a, b).then_with(|| a.cmp(b))
}
