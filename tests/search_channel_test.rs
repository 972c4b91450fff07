use std::time::Duration;

use anyhow::Result;
use classboard::core::config::SearchConfig;
use classboard::core::errors::Error;
use classboard::models::ScheduleEntry;
use classboard::services::search::protocol::{WorkerRequest, WorkerResponse};
use classboard::services::search::SearchChannel;
use tokio::sync::mpsc;

fn tagged(code: &str) -> ScheduleEntry {
    ScheduleEntry {
        code: code.to_string(),
        ..Default::default()
    }
}

fn fake_channel(
    timeout: Option<Duration>,
) -> (
    SearchChannel,
    mpsc::UnboundedReceiver<WorkerRequest>,
    mpsc::Sender<WorkerResponse>,
) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::channel(16);
    (
        SearchChannel::with_transport(request_tx, response_rx, timeout),
        request_rx,
        response_tx,
    )
}

/// Answers with one entry whose code echoes the query.
fn echo(id: u64, query: &str) -> WorkerResponse {
    WorkerResponse::SearchResults {
        id,
        payload: vec![tagged(query)],
    }
}

async fn answer_init(
    requests: &mut mpsc::UnboundedReceiver<WorkerRequest>,
    responses: &mpsc::Sender<WorkerResponse>,
) {
    match requests.recv().await {
        Some(WorkerRequest::Init { id, .. }) => {
            let _ = responses.send(WorkerResponse::Ready { id }).await;
        }
        other => panic!("expected INIT, got {other:?}"),
    }
}

#[tokio::test]
async fn queries_before_init_are_not_ready() -> Result<()> {
    let channel = SearchChannel::spawn(SearchConfig::default());
    assert!(matches!(channel.search("ahmed").await, Err(Error::NotReady)));
    assert!(matches!(channel.suggest("ah").await, Err(Error::NotReady)));

    channel.init(vec![tagged("A")]).await?;
    assert!(channel.is_ready());
    channel.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn out_of_order_replies_reach_their_callers() -> Result<()> {
    let (channel, mut requests, responses) = fake_channel(None);
    tokio::spawn(async move {
        answer_init(&mut requests, &responses).await;
        let mut held = Vec::new();
        while held.len() < 2 {
            match requests.recv().await {
                Some(WorkerRequest::Search { id, payload }) => held.push((id, payload.query)),
                other => panic!("expected SEARCH, got {other:?}"),
            }
        }
        // Newest first.
        for (id, query) in held.into_iter().rev() {
            let _ = responses.send(echo(id, &query)).await;
        }
        while requests.recv().await.is_some() {}
    });

    channel.init(Vec::new()).await?;
    let (alpha, beta) = tokio::join!(channel.search("alpha"), channel.search("beta"));
    assert_eq!(alpha?, vec![tagged("alpha")]);
    assert_eq!(beta?, vec![tagged("beta")]);
    Ok(())
}

#[tokio::test]
async fn stray_and_duplicate_replies_are_ignored() -> Result<()> {
    let (channel, mut requests, responses) = fake_channel(None);
    tokio::spawn(async move {
        answer_init(&mut requests, &responses).await;
        while let Some(request) = requests.recv().await {
            let WorkerRequest::Search { id, payload } = request else {
                continue;
            };
            let _ = responses.send(WorkerResponse::Ready { id: 9_999 }).await;
            let _ = responses.send(echo(id + 1_000, "nobody")).await;
            let _ = responses.send(echo(id, &payload.query)).await;
            let _ = responses.send(echo(id, "duplicate")).await;
        }
    });

    channel.init(Vec::new()).await?;
    assert_eq!(channel.search("first").await?, vec![tagged("first")]);
    assert_eq!(channel.search("second").await?, vec![tagged("second")]);
    Ok(())
}

#[tokio::test]
async fn worker_error_keeps_its_message() -> Result<()> {
    let (channel, mut requests, responses) = fake_channel(None);
    tokio::spawn(async move {
        answer_init(&mut requests, &responses).await;
        while let Some(request) = requests.recv().await {
            let _ = responses
                .send(WorkerResponse::Error {
                    id: request.id(),
                    payload: "index exploded".into(),
                })
                .await;
        }
    });

    channel.init(Vec::new()).await?;
    match channel.suggest("ah").await {
        Err(Error::Worker(message)) => assert_eq!(message, "index exploded"),
        other => panic!("expected worker error, got {other:?}"),
    }
    // The channel stays usable after a failed request.
    assert!(channel.is_ready());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn timed_out_request_is_dropped_and_late_reply_ignored() -> Result<()> {
    let (channel, mut requests, responses) = fake_channel(Some(Duration::from_millis(100)));
    tokio::spawn(async move {
        answer_init(&mut requests, &responses).await;
        let mut late = None;
        while let Some(request) = requests.recv().await {
            let WorkerRequest::Search { id, payload } = request else {
                continue;
            };
            if payload.query == "slow" {
                late = Some(id);
                continue;
            }
            if let Some(late_id) = late.take() {
                let _ = responses.send(echo(late_id, "slow")).await;
            }
            let _ = responses.send(echo(id, &payload.query)).await;
        }
    });

    channel.init(Vec::new()).await?;
    match channel.search("slow").await {
        Err(Error::Timeout { id, after }) => {
            assert_eq!(id, 2);
            assert_eq!(after, Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(channel.search("fast").await?, vec![tagged("fast")]);
    Ok(())
}

#[tokio::test]
async fn dead_worker_rejects_pending_and_later_requests() -> Result<()> {
    let (channel, mut requests, responses) = fake_channel(None);
    tokio::spawn(async move {
        answer_init(&mut requests, &responses).await;
        let _ = requests.recv().await;
        drop(responses);
        while requests.recv().await.is_some() {}
    });

    channel.init(Vec::new()).await?;
    assert!(matches!(
        channel.search("anything").await,
        Err(Error::ChannelClosed)
    ));
    assert!(matches!(
        channel.suggest("anything").await,
        Err(Error::ChannelClosed)
    ));
    Ok(())
}

#[tokio::test]
async fn reinit_replaces_dataset() -> Result<()> {
    let channel = SearchChannel::spawn(SearchConfig::default());
    let mut first = tagged("OLD");
    first.doctor_en = "Dr. Ahmed Hassan".into();
    channel.init(vec![first]).await?;
    assert_eq!(channel.search("hassan").await?.len(), 1);

    let mut second = tagged("NEW");
    second.doctor_en = "Dr. Mona Salem".into();
    channel.init(vec![second]).await?;
    assert!(channel.search("hassan").await?.is_empty());
    assert_eq!(channel.search("salem").await?[0].code, "NEW");

    channel.shutdown().await;
    Ok(())
}
