use serde::Serialize;

use crate::models::ClassifiedEntry;
use crate::services::schedule::ActiveClasses;

/// Upcoming cards that share a start time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeGroup {
    pub start_time: String,
    pub cards: Vec<ClassifiedEntry>,
}

/// Everything a full render draws: the live-now cards and the upcoming
/// cards grouped by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveBoard {
    pub active: Vec<ClassifiedEntry>,
    pub upcoming: Vec<TimeGroup>,
}

impl LiveBoard {
    /// Groups keep the order in which their start time first appears in
    /// `classes.upcoming`.
    pub fn from_classes(classes: &ActiveClasses) -> Self {
        let mut upcoming: Vec<TimeGroup> = Vec::new();
        for card in &classes.upcoming {
            match upcoming.iter_mut().find(|g| g.start_time == card.start_time) {
                Some(group) => group.cards.push(card.clone()),
                None => upcoming.push(TimeGroup {
                    start_time: card.start_time.clone(),
                    cards: vec![card.clone()],
                }),
            }
        }
        Self {
            active: classes.active.clone(),
            upcoming,
        }
    }

    /// An empty board is drawn as the explicit "nothing right now" state.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.upcoming.is_empty()
    }

    pub fn card_count(&self) -> usize {
        self.active.len() + self.upcoming.iter().map(|g| g.cards.len()).sum::<usize>()
    }
}

/// Field-level refresh for an already drawn card, keyed by its code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardUpdate {
    pub code: String,
    /// Only active cards carry a progress bar.
    pub progress: Option<f64>,
    pub label: String,
}

impl CardUpdate {
    pub fn for_entry(entry: &ClassifiedEntry) -> Self {
        Self {
            code: entry.code().to_string(),
            progress: entry.is_active().then_some(entry.progress),
            label: card_label(entry),
        }
    }
}

/// `"12m left"` for running sessions, `"In 1h 5m"` / `"In 5m"` otherwise.
pub fn card_label(entry: &ClassifiedEntry) -> String {
    if entry.is_active() {
        return format!("{}m left", entry.time_left.unwrap_or(0));
    }
    let starts_in = entry.starts_in.unwrap_or(0).max(0);
    let (hours, minutes) = (starts_in / 60, starts_in % 60);
    if hours > 0 {
        format!("In {hours}h {minutes}m")
    } else {
        format!("In {minutes}m")
    }
}

/// Whatever draws the live board.
pub trait LiveRenderer: Send + 'static {
    /// Discards what is drawn and draws `board` from scratch.
    fn render_full(&mut self, board: &LiveBoard);

    /// Refreshes progress and countdown text of cards already drawn.
    fn update_fields(&mut self, updates: &[CardUpdate]);
}

/// Headless renderer that reports the board through `tracing`.
#[derive(Debug, Default)]
pub struct TracingRenderer;

impl LiveRenderer for TracingRenderer {
    fn render_full(&mut self, board: &LiveBoard) {
        if board.is_empty() {
            tracing::info!("no classes running or starting soon");
            return;
        }
        for card in &board.active {
            tracing::info!(code = card.code(), subject = %card.entry.subject, label = %card_label(card), "live now");
        }
        for group in &board.upcoming {
            tracing::info!(start = %group.start_time, cards = group.cards.len(), "upcoming");
        }
    }

    fn update_fields(&mut self, updates: &[CardUpdate]) {
        for update in updates {
            tracing::debug!(code = %update.code, progress = ?update.progress, label = %update.label, "card refreshed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassStatus, ScheduleEntry};

    fn card(code: &str, status: ClassStatus, start: &str, left: Option<i32>, starts_in: Option<i32>) -> ClassifiedEntry {
        ClassifiedEntry {
            entry: ScheduleEntry {
                code: code.into(),
                ..Default::default()
            },
            status,
            progress: if status == ClassStatus::Active { 40.0 } else { 0.0 },
            time_left: left,
            starts_in,
            start_time: start.into(),
            end_time: String::new(),
            start_minutes: 0,
        }
    }

    #[test]
    fn labels() {
        assert_eq!(card_label(&card("A", ClassStatus::Active, "08:00 AM", Some(12), None)), "12m left");
        assert_eq!(card_label(&card("B", ClassStatus::Upcoming, "10:00 AM", None, Some(5))), "In 5m");
        assert_eq!(card_label(&card("C", ClassStatus::Future, "11:00 AM", None, Some(65))), "In 1h 5m");
        assert_eq!(card_label(&card("D", ClassStatus::Future, "12:00 PM", None, Some(120))), "In 2h 0m");
    }

    #[test]
    fn updates_only_carry_progress_for_active_cards() {
        let active = CardUpdate::for_entry(&card("A", ClassStatus::Active, "08:00 AM", Some(12), None));
        assert_eq!(active.progress, Some(40.0));
        let soon = CardUpdate::for_entry(&card("B", ClassStatus::Upcoming, "10:00 AM", None, Some(5)));
        assert_eq!(soon.progress, None);
        assert_eq!(soon.code, "B");
    }

    #[test]
    fn upcoming_is_grouped_by_start_time_in_first_seen_order() {
        let classes = ActiveClasses {
            active: vec![card("A", ClassStatus::Active, "08:00 AM", Some(30), None)],
            upcoming: vec![
                card("B", ClassStatus::Upcoming, "10:00 AM", None, Some(10)),
                card("C", ClassStatus::Upcoming, "10:00 AM", None, Some(10)),
                card("D", ClassStatus::Future, "11:00 AM", None, Some(70)),
            ],
        };
        let board = LiveBoard::from_classes(&classes);
        assert_eq!(board.card_count(), 4);
        let starts: Vec<&str> = board.upcoming.iter().map(|g| g.start_time.as_str()).collect();
        assert_eq!(starts, vec!["10:00 AM", "11:00 AM"]);
        assert_eq!(board.upcoming[0].cards.len(), 2);
        assert!(LiveBoard::default().is_empty());
    }
}
