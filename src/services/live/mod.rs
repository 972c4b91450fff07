pub mod render;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::config::LiveConfig;
use crate::models::ClassifiedEntry;
use crate::services::schedule::store::Dataset;
use crate::services::schedule::time_utils::Clock;
use crate::services::schedule::{ActiveClasses, ScheduleProcessor};

pub use render::{card_label, CardUpdate, LiveBoard, LiveRenderer, TimeGroup, TracingRenderer};

/// Signature of a tick with nothing running or upcoming.
pub const EMPTY_SIGNATURE: &str = "empty";

/// What a single tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No data loaded yet and nothing drawn so far.
    Waiting,
    /// The set of cards changed; the board was redrawn.
    FullRender { signature: String },
    /// Same cards as last time; only their fields were refreshed.
    Incremental { updated: usize },
}

/// Codes of the active cards, then of the upcoming ones, in list order.
///
/// A card moving from upcoming to active changes the signature even when
/// the set of codes stays the same.
pub fn signature(classes: &ActiveClasses) -> String {
    if classes.is_empty() {
        return EMPTY_SIGNATURE.to_string();
    }
    format!("{}|{}", codes(&classes.active), codes(&classes.upcoming))
}

fn codes(cards: &[ClassifiedEntry]) -> String {
    cards.iter().map(|c| c.code()).collect::<Vec<_>>().join(",")
}

struct LiveCore<R> {
    renderer: R,
    processor: ScheduleProcessor,
    clock: Arc<dyn Clock>,
    dataset: watch::Receiver<Dataset>,
    rendered: Option<String>,
}

impl<R: LiveRenderer> LiveCore<R> {
    fn tick(&mut self, force: bool) -> TickOutcome {
        let data = self.dataset.borrow_and_update().clone();
        if data.is_empty() && self.rendered.is_none() {
            tracing::trace!("live view waiting for data");
            return TickOutcome::Waiting;
        }

        let now = self.clock.now();
        let classes = self.processor.get_active_classes(&data, now);
        let sig = signature(&classes);

        if force || self.rendered.as_deref() != Some(sig.as_str()) {
            let board = LiveBoard::from_classes(&classes);
            self.renderer.render_full(&board);
            tracing::debug!(signature = %sig, cards = board.card_count(), "live board rebuilt");
            self.rendered = Some(sig.clone());
            return TickOutcome::FullRender { signature: sig };
        }

        let updates: Vec<CardUpdate> = classes.iter().map(CardUpdate::for_entry).collect();
        self.renderer.update_fields(&updates);
        tracing::trace!(updated = updates.len(), "live board refreshed in place");
        TickOutcome::Incremental {
            updated: updates.len(),
        }
    }
}

/// Polls the schedule on a fixed interval and keeps a renderer in sync,
/// redrawing only when the set of cards changes.
pub struct LiveStatusView<R: LiveRenderer> {
    core: Arc<Mutex<LiveCore<R>>>,
    dataset: watch::Receiver<Dataset>,
    interval: Duration,
    task: Option<JoinHandle<()>>,
}

impl<R: LiveRenderer> LiveStatusView<R> {
    pub fn new(
        renderer: R,
        dataset: watch::Receiver<Dataset>,
        clock: Arc<dyn Clock>,
        config: &LiveConfig,
    ) -> Self {
        let core = LiveCore {
            renderer,
            processor: ScheduleProcessor::new(config.upcoming_window_minutes),
            clock,
            dataset: dataset.clone(),
            rendered: None,
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            dataset,
            interval: config.poll_interval(),
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Ticks once right away, then every poll interval and whenever the
    /// dataset is replaced. Calling it while running does nothing.
    /// Must be called inside a tokio runtime.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        self.tick();

        let core = Arc::clone(&self.core);
        let mut dataset = self.dataset.clone();
        let period = self.interval;
        tracing::info!(interval = ?period, "live view started");
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut watching = true;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = dataset.changed(), if watching => {
                        if changed.is_err() {
                            watching = false;
                            continue;
                        }
                        tracing::debug!("dataset replaced, refreshing live view");
                    }
                }
                lock(&core).tick(false);
            }
        }));
    }

    /// Cancels the timer. The last render stays as it is.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::info!("live view stopped");
        }
    }

    /// Runs one tick now, outside the timer.
    pub fn tick(&self) -> TickOutcome {
        lock(&self.core).tick(false)
    }

    /// Like [`tick`](Self::tick) but always redraws the whole board.
    pub fn refresh(&self) -> TickOutcome {
        lock(&self.core).tick(true)
    }

    /// Signature of the board currently drawn, if any.
    pub fn rendered_signature(&self) -> Option<String> {
        lock(&self.core).rendered.clone()
    }

    pub fn with_renderer<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&lock(&self.core).renderer)
    }
}

impl<R: LiveRenderer> Drop for LiveStatusView<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<R>(core: &Mutex<LiveCore<R>>) -> MutexGuard<'_, LiveCore<R>> {
    core.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScheduleEntry;
    use crate::services::schedule::time_utils::FixedClock;
    use time::macros::datetime;

    #[derive(Default)]
    struct Counting {
        full: usize,
        updates: usize,
        last_board: LiveBoard,
    }

    impl LiveRenderer for Counting {
        fn render_full(&mut self, board: &LiveBoard) {
            self.full += 1;
            self.last_board = board.clone();
        }

        fn update_fields(&mut self, _updates: &[CardUpdate]) {
            self.updates += 1;
        }
    }

    fn monday_row(code: &str, time: &str) -> ScheduleEntry {
        ScheduleEntry {
            day: "Monday".into(),
            time: time.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    fn view(rows: Vec<ScheduleEntry>) -> (LiveStatusView<Counting>, watch::Sender<Dataset>) {
        let (tx, rx) = watch::channel::<Dataset>(Arc::from(rows));
        let clock = Arc::new(FixedClock(datetime!(2024-01-01 08:30)));
        let view = LiveStatusView::new(Counting::default(), rx, clock, &LiveConfig::default());
        (view, tx)
    }

    #[test]
    fn waits_until_data_arrives() {
        let (view, tx) = view(Vec::new());
        assert_eq!(view.tick(), TickOutcome::Waiting);
        assert_eq!(view.with_renderer(|r| r.full), 0);

        tx.send_replace(Arc::from(vec![monday_row("A", "08:00 AM – 10:00 AM")]));
        assert!(matches!(view.tick(), TickOutcome::FullRender { .. }));
    }

    #[test]
    fn same_cards_update_in_place() {
        let (view, _tx) = view(vec![monday_row("A", "08:00 AM – 10:00 AM")]);
        assert_eq!(
            view.tick(),
            TickOutcome::FullRender {
                signature: "A|".into()
            }
        );
        assert_eq!(view.tick(), TickOutcome::Incremental { updated: 1 });
        assert_eq!(view.with_renderer(|r| (r.full, r.updates)), (1, 1));
    }

    #[test]
    fn loaded_but_nothing_matching_renders_empty_state() {
        let (view, tx) = view(vec![monday_row("A", "08:00 AM – 10:00 AM")]);
        view.tick();
        tx.send_replace(Arc::from(vec![monday_row("B", "06:00 AM – 07:00 AM")]));
        assert_eq!(
            view.tick(),
            TickOutcome::FullRender {
                signature: EMPTY_SIGNATURE.into()
            }
        );
        assert!(view.with_renderer(|r| r.last_board.is_empty()));

        // Data cleared after a render still draws rather than waiting.
        tx.send_replace(Arc::from(Vec::new()));
        assert_eq!(view.tick(), TickOutcome::Incremental { updated: 0 });
    }

    #[test]
    fn refresh_forces_full_render() {
        let (view, _tx) = view(vec![monday_row("A", "08:00 AM – 10:00 AM")]);
        view.tick();
        assert!(matches!(view.refresh(), TickOutcome::FullRender { .. }));
        assert_eq!(view.with_renderer(|r| r.full), 2);
    }
}
