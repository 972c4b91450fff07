use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::protocol::{WorkerRequest, WorkerResponse};
use super::SearchIndex;
use crate::core::config::SearchConfig;
use crate::core::errors::{Error, Result};

/// Owns the dataset and both fuzzy indices. Only ever touched from the
/// worker's own thread.
pub struct SearchWorker {
    config: SearchConfig,
    index: Option<SearchIndex>,
}

impl SearchWorker {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            config,
            index: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.index.is_some()
    }

    /// Runs one request to completion. Failures and panics become a
    /// correlated `Error` response; this never unwinds into the caller.
    pub fn handle(&mut self, request: WorkerRequest) -> WorkerResponse {
        let id = request.id();
        let kind = request.kind();
        match panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(request))) {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(id, kind, error = %e, "search worker request failed");
                WorkerResponse::Error {
                    id,
                    payload: e.to_string(),
                }
            }
            Err(cause) => {
                let message = panic_message(cause.as_ref());
                tracing::error!(id, kind, %message, "search worker panicked");
                if kind == "INIT" {
                    self.index = None;
                }
                WorkerResponse::Error { id, payload: message }
            }
        }
    }

    fn dispatch(&mut self, request: WorkerRequest) -> Result<WorkerResponse> {
        match request {
            WorkerRequest::Init { id, payload } => {
                let started = Instant::now();
                let count = payload.data.len();
                self.index = None;
                self.index = Some(SearchIndex::build(payload.data, self.config.clone())?);
                tracing::info!(
                    id,
                    entries = count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "search indices built"
                );
                Ok(WorkerResponse::Ready { id })
            }
            WorkerRequest::Search { id, payload } => {
                let results = self.index()?.search(&payload.query)?;
                tracing::debug!(id, hits = results.len(), "search answered");
                Ok(WorkerResponse::SearchResults {
                    id,
                    payload: results,
                })
            }
            WorkerRequest::Suggest { id, payload } => {
                let items = self.index()?.suggest(&payload.query)?;
                Ok(WorkerResponse::SuggestResults { id, payload: items })
            }
        }
    }

    fn index(&self) -> Result<&SearchIndex> {
        self.index.as_ref().ok_or(Error::NotReady)
    }

    /// Runs the worker loop on the blocking pool until the request channel
    /// closes or the orchestrator stops listening.
    pub fn spawn(
        config: SearchConfig,
        mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
        responses: mpsc::Sender<WorkerResponse>,
    ) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || {
            let mut worker = SearchWorker::new(config);
            while let Some(request) = requests.blocking_recv() {
                let response = worker.handle(request);
                if responses.blocking_send(response).is_err() {
                    tracing::debug!("orchestrator dropped, stopping search worker");
                    break;
                }
            }
            tracing::debug!("search worker stopped");
        })
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "search worker panicked".to_string()
    }
}
