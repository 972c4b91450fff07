use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Tuning knobs for both fuzzy indices and the request channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Fraction of a query token's length it may be misspelled by. A token
    /// of `n` characters gets `round(n * threshold)` edits, clamped to
    /// `1..=2`. Tokens under four characters or carrying digits get none.
    pub search_threshold: f32,
    pub search_min_token_len: usize,
    pub suggest_threshold: f32,
    pub suggest_min_token_len: usize,
    pub max_suggestions: usize,
    pub max_results: usize,
    /// Also match indexed terms that merely start within the edit budget.
    pub prefix_matching: bool,
    /// Also match a plain-word token anywhere inside an indexed term.
    pub substring_matching: bool,
    /// `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    pub subject_acronyms: HashMap<String, String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_threshold: 0.2,
            search_min_token_len: 3,
            suggest_threshold: 0.4,
            suggest_min_token_len: 2,
            max_suggestions: 5,
            max_results: 500,
            prefix_matching: true,
            substring_matching: true,
            request_timeout_ms: Some(30_000),
            subject_acronyms: default_acronyms(),
        }
    }
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Short display form of a subject, or the subject itself.
    pub fn subject_display<'a>(&'a self, subject: &'a str) -> &'a str {
        self.subject_acronyms
            .get(subject)
            .map(String::as_str)
            .unwrap_or(subject)
    }
}

fn default_acronyms() -> HashMap<String, String> {
    [
        ("Management Information Systems", "MIS"),
        ("Operations Research", "OR"),
        ("Advanced Database", "Adv. Database"),
        ("Economics of Information", "Econ. of Info"),
        ("Internet Applications", "Internet Apps"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub poll_interval_secs: u64,
    pub upcoming_window_minutes: i32,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            upcoming_window_minutes: 15,
        }
    }
}

impl LiveConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

/// Top-level configuration, usually read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub search: SearchConfig,
    pub live: LiveConfig,
    /// Seasonal timetable: original `time` string -> replacement.
    pub time_overrides: HashMap<String, String>,
}

impl ScheduleConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}
