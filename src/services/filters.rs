use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::ScheduleEntry;

/// Value of a structural filter that matches every row.
pub const ALL: &str = "all";

/// The five filter dimensions a caller may set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Search,
    Subject,
    Group,
    Day,
    Time,
}

impl FilterKey {
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Search,
        FilterKey::Subject,
        FilterKey::Group,
        FilterKey::Day,
        FilterKey::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Search => "search",
            FilterKey::Subject => "subject",
            FilterKey::Group => "group",
            FilterKey::Day => "day",
            FilterKey::Time => "time",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown filter key {s:?}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub search: String,
    pub subject: String,
    pub group: String,
    pub day: String,
    pub time: String,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            search: String::new(),
            subject: ALL.to_string(),
            group: ALL.to_string(),
            day: ALL.to_string(),
            time: ALL.to_string(),
        }
    }
}

impl FilterState {
    fn slot(&mut self, key: FilterKey) -> &mut String {
        match key {
            FilterKey::Search => &mut self.search,
            FilterKey::Subject => &mut self.subject,
            FilterKey::Group => &mut self.group,
            FilterKey::Day => &mut self.day,
            FilterKey::Time => &mut self.time,
        }
    }
}

/// Current dropdown and search-box selections.
#[derive(Debug, Clone, Default)]
pub struct FilterManager {
    state: FilterState,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of the current selections.
    pub fn filters(&self) -> FilterState {
        self.state.clone()
    }

    /// Sets one dimension. Unknown keys return `false` and change nothing.
    pub fn update(&mut self, key: &str, value: impl Into<String>) -> bool {
        match key.parse::<FilterKey>() {
            Ok(key) => {
                self.set(key, value);
                true
            }
            Err(reason) => {
                tracing::debug!(%reason, "filter update rejected");
                false
            }
        }
    }

    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        *self.state.slot(key) = value.into();
    }

    pub fn reset(&mut self) {
        self.state = FilterState::default();
    }

    /// Rows matching the subject, group and day selections.
    ///
    /// Text search is not applied here; compose with
    /// [`SearchChannel::search`](crate::services::search::SearchChannel::search)
    /// results instead.
    pub fn apply_filters(&self, entries: &[ScheduleEntry]) -> Vec<ScheduleEntry> {
        entries
            .iter()
            .filter(|e| self.matches(e))
            .cloned()
            .collect()
    }

    pub fn matches(&self, entry: &ScheduleEntry) -> bool {
        let FilterState {
            subject, group, day, ..
        } = &self.state;
        selected(subject, &entry.subject) && selected(group, &entry.group) && selected(day, &entry.day)
    }
}

fn selected(filter: &str, value: &str) -> bool {
    filter == ALL || filter == value
}
