//! Messages exchanged between [`SearchChannel`](super::SearchChannel) and the
//! search worker. Both directions are JSON-serializable and carry the
//! correlation id of the request they belong to.

use serde::{Deserialize, Serialize};

use crate::models::{ScheduleEntry, Suggestion};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    pub data: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub query: String,
}

/// Orchestrator -> worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    Init { id: u64, payload: InitPayload },
    Search { id: u64, payload: QueryPayload },
    Suggest { id: u64, payload: QueryPayload },
}

impl WorkerRequest {
    pub fn init(id: u64, data: Vec<ScheduleEntry>) -> Self {
        WorkerRequest::Init {
            id,
            payload: InitPayload { data },
        }
    }

    pub fn search(id: u64, query: impl Into<String>) -> Self {
        WorkerRequest::Search {
            id,
            payload: QueryPayload {
                query: query.into(),
            },
        }
    }

    pub fn suggest(id: u64, query: impl Into<String>) -> Self {
        WorkerRequest::Suggest {
            id,
            payload: QueryPayload {
                query: query.into(),
            },
        }
    }

    pub fn id(&self) -> u64 {
        match self {
            WorkerRequest::Init { id, .. }
            | WorkerRequest::Search { id, .. }
            | WorkerRequest::Suggest { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkerRequest::Init { .. } => "INIT",
            WorkerRequest::Search { .. } => "SEARCH",
            WorkerRequest::Suggest { .. } => "SUGGEST",
        }
    }
}

/// Worker -> orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    Ready { id: u64 },
    SearchResults { id: u64, payload: Vec<ScheduleEntry> },
    SuggestResults { id: u64, payload: Vec<Suggestion> },
    Error { id: u64, payload: String },
}

impl WorkerResponse {
    pub fn id(&self) -> u64 {
        match self {
            WorkerResponse::Ready { id }
            | WorkerResponse::SearchResults { id, .. }
            | WorkerResponse::SuggestResults { id, .. }
            | WorkerResponse::Error { id, .. } => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkerResponse::Ready { .. } => "READY",
            WorkerResponse::SearchResults { .. } => "SEARCH_RESULTS",
            WorkerResponse::SuggestResults { .. } => "SUGGEST_RESULTS",
            WorkerResponse::Error { .. } => "ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_shape() {
        let value = serde_json::to_value(WorkerRequest::search(7, "ahmd")).unwrap();
        assert_eq!(
            value,
            json!({ "type": "SEARCH", "id": 7, "payload": { "query": "ahmd" } })
        );
    }

    #[test]
    fn response_reads_from_json() {
        let raw = r#"{ "type": "ERROR", "id": 3, "payload": "index exploded" }"#;
        let response: WorkerResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            response,
            WorkerResponse::Error {
                id: 3,
                payload: "index exploded".into()
            }
        );
        assert_eq!(response.kind(), "ERROR");

        let ready: WorkerResponse = serde_json::from_str(r#"{ "type": "READY", "id": 1 }"#).unwrap();
        assert_eq!(ready.id(), 1);
    }

    #[test]
    fn suggest_results_use_type_field_per_item() {
        let raw = r#"{ "type": "SUGGEST_RESULTS", "id": 2,
                       "payload": [{ "type": "subject", "text": "OR", "display": "OR" }] }"#;
        let response: WorkerResponse = serde_json::from_str(raw).unwrap();
        match response {
            WorkerResponse::SuggestResults { payload, .. } => assert_eq!(payload[0].text, "OR"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
