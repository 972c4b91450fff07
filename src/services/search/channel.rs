use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::protocol::{WorkerRequest, WorkerResponse};
use super::worker::SearchWorker;
use crate::core::config::SearchConfig;
use crate::core::errors::{Error, Result};
use crate::models::{ScheduleEntry, Suggestion};

const RESPONSE_BUFFER: usize = 64;

/// Lifecycle of the index behind a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    Uninitialized = 0,
    Initializing = 1,
    Ready = 2,
}

impl ChannelState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => ChannelState::Initializing,
            2 => ChannelState::Ready,
            _ => ChannelState::Uninitialized,
        }
    }
}

type Reply = oneshot::Sender<Result<WorkerResponse>>;

enum Command {
    Submit { request: WorkerRequest, reply: Reply },
    Cancel { id: u64 },
}

struct PendingRequest {
    kind: &'static str,
    reply: Reply,
}

/// Async front of the search worker.
///
/// Every call gets a fresh correlation id and waits for the response that
/// carries it, whatever order the worker answers in. The pending table is
/// owned by a dispatcher task; callers only ever send it commands.
pub struct SearchChannel {
    commands: mpsc::UnboundedSender<Command>,
    next_id: AtomicU64,
    state: AtomicU8,
    timeout: Option<Duration>,
    dispatcher: JoinHandle<()>,
    worker: Option<JoinHandle<()>>,
}

impl SearchChannel {
    /// Starts a worker on the blocking pool. Must be called inside a tokio
    /// runtime.
    pub fn spawn(config: SearchConfig) -> Self {
        let timeout = config.request_timeout();
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::channel(RESPONSE_BUFFER);
        let worker = SearchWorker::spawn(config, request_rx, response_tx);
        let mut channel = Self::connect(request_tx, response_rx, timeout);
        channel.worker = Some(worker);
        channel
    }

    /// Talks to whatever sits on the other end of `requests`/`responses`
    /// instead of a spawned [`SearchWorker`].
    pub fn with_transport(
        requests: mpsc::UnboundedSender<WorkerRequest>,
        responses: mpsc::Receiver<WorkerResponse>,
        timeout: Option<Duration>,
    ) -> Self {
        Self::connect(requests, responses, timeout)
    }

    fn connect(
        requests: mpsc::UnboundedSender<WorkerRequest>,
        responses: mpsc::Receiver<WorkerResponse>,
        timeout: Option<Duration>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch(command_rx, requests, responses));
        Self {
            commands,
            next_id: AtomicU64::new(1),
            state: AtomicU8::new(ChannelState::Uninitialized as u8),
            timeout,
            dispatcher,
            worker: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ChannelState::Ready
    }

    /// Builds (or rebuilds) the worker's indices from `entries`.
    ///
    /// Queries fail with [`Error::NotReady`] until this resolves. A second
    /// `init` while one is in flight fails with [`Error::InitInProgress`].
    pub async fn init(&self, entries: Vec<ScheduleEntry>) -> Result<()> {
        let current = self.state.load(Ordering::Acquire);
        if current == ChannelState::Initializing as u8
            || self
                .state
                .compare_exchange(
                    current,
                    ChannelState::Initializing as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_err()
        {
            return Err(Error::InitInProgress);
        }
        let mut guard = InitGuard {
            state: &self.state,
            committed: false,
        };

        let count = entries.len();
        match self.request(|id| WorkerRequest::init(id, entries)).await? {
            WorkerResponse::Ready { id } => {
                guard.committed = true;
                self.state
                    .store(ChannelState::Ready as u8, Ordering::Release);
                tracing::info!(id, entries = count, "search channel ready");
                Ok(())
            }
            other => Err(unexpected("INIT", &other)),
        }
    }

    /// Entries fuzzy-matching `query`, best match first.
    pub async fn search(&self, query: &str) -> Result<Vec<ScheduleEntry>> {
        self.ensure_ready()?;
        match self.request(|id| WorkerRequest::search(id, query)).await? {
            WorkerResponse::SearchResults { payload, .. } => Ok(payload),
            other => Err(unexpected("SEARCH", &other)),
        }
    }

    /// "Did you mean" prompts for `query`.
    pub async fn suggest(&self, query: &str) -> Result<Vec<Suggestion>> {
        self.ensure_ready()?;
        match self.request(|id| WorkerRequest::suggest(id, query)).await? {
            WorkerResponse::SuggestResults { payload, .. } => Ok(payload),
            other => Err(unexpected("SUGGEST", &other)),
        }
    }

    /// Stops the dispatcher and waits for the worker to exit.
    pub async fn shutdown(self) {
        let SearchChannel {
            commands,
            dispatcher,
            worker,
            ..
        } = self;
        drop(commands);
        if let Err(e) = dispatcher.await {
            tracing::warn!(error = %e, "search dispatcher ended abnormally");
        }
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "search worker ended abnormally");
            }
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    async fn request(&self, build: impl FnOnce(u64) -> WorkerRequest) -> Result<WorkerResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = build(id);
        let kind = request.kind();
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Submit { request, reply })
            .map_err(|_| Error::ChannelClosed)?;
        tracing::debug!(id, kind, "search request sent");

        let outcome = match self.timeout {
            Some(after) => match tokio::time::timeout(after, response).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let _ = self.commands.send(Command::Cancel { id });
                    tracing::warn!(id, kind, ?after, "search request timed out");
                    return Err(Error::Timeout { id, after });
                }
            },
            None => response.await,
        };

        match outcome.map_err(|_| Error::ChannelClosed)?? {
            WorkerResponse::Error { payload, .. } => Err(Error::Worker(payload)),
            response => Ok(response),
        }
    }
}

/// Resets the channel to `Uninitialized` unless the init it guards
/// completed, including when the init future is dropped mid-flight.
struct InitGuard<'a> {
    state: &'a AtomicU8,
    committed: bool,
}

impl Drop for InitGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.state
                .store(ChannelState::Uninitialized as u8, Ordering::Release);
        }
    }
}

fn unexpected(expected: &str, got: &WorkerResponse) -> Error {
    Error::Other(format!(
        "unexpected {} reply to {expected} request {}",
        got.kind(),
        got.id()
    ))
}

async fn dispatch(
    mut commands: mpsc::UnboundedReceiver<Command>,
    requests: mpsc::UnboundedSender<WorkerRequest>,
    mut responses: mpsc::Receiver<WorkerResponse>,
) {
    let mut pending: HashMap<u64, PendingRequest> = HashMap::new();
    let mut worker_alive = true;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Submit { request, reply }) => {
                    if !worker_alive {
                        let _ = reply.send(Err(Error::ChannelClosed));
                        continue;
                    }
                    let id = request.id();
                    let kind = request.kind();
                    if pending.contains_key(&id) {
                        let _ = reply.send(Err(Error::Other(format!("request id {id} already pending"))));
                        continue;
                    }
                    pending.insert(id, PendingRequest { kind, reply });
                    if requests.send(request).is_err() {
                        if let Some(entry) = pending.remove(&id) {
                            let _ = entry.reply.send(Err(Error::ChannelClosed));
                        }
                    }
                }
                Some(Command::Cancel { id }) => {
                    pending.remove(&id);
                }
                None => break,
            },
            response = responses.recv(), if worker_alive => match response {
                Some(response) => {
                    let id = response.id();
                    match pending.remove(&id) {
                        Some(entry) => {
                            tracing::debug!(id, request = entry.kind, response = response.kind(), "search response matched");
                            let _ = entry.reply.send(Ok(response));
                        }
                        None => {
                            tracing::debug!(id, response = response.kind(), "ignoring stray search response");
                        }
                    }
                }
                None => {
                    worker_alive = false;
                    if !pending.is_empty() {
                        tracing::warn!(pending = pending.len(), "search worker exited with requests in flight");
                    }
                    for (_, entry) in pending.drain() {
                        let _ = entry.reply.send(Err(Error::ChannelClosed));
                    }
                }
            },
        }
    }
    tracing::debug!("search dispatcher stopped");
}
