// NDJSON streaming of one refinement run
//
// The run executes on its own task. Stage events become lines as they arrive;
// when the client disconnects the event receiver is dropped and the
// orchestrator stops after its in-flight stage.

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::orchestrator::{RefinementOrchestrator, StageEvent};
use crate::ports::TaskContext;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

const EVENT_BUFFER: usize = 16;

/// Start `orchestrator` on `task` and stream its stage events.
///
/// `scratch_dir`, when given, is removed once the run is over.
pub fn stream_run<X>(
    orchestrator: RefinementOrchestrator<X>,
    task: TaskContext,
    scratch_dir: Option<PathBuf>,
) -> Response
where
    X: Clone + Default + Serialize + Send + Sync + 'static,
{
    let (line_tx, line_rx) = mpsc::channel::<String>(EVENT_BUFFER);

    tokio::spawn(async move {
        let (event_tx, event_rx) = mpsc::channel::<StageEvent>(EVENT_BUFFER);
        let forward_tx = line_tx.clone();
        let forward = async move {
            let mut event_rx = event_rx;
            while let Some(event) = event_rx.recv().await {
                if forward_tx.send(event.to_json_line()).await.is_err() {
                    break;
                }
            }
        };

        let (result, ()) = tokio::join!(orchestrator.run_streaming(task, event_tx), forward);

        match result {
            Ok(outcome) => {
                tracing::info!(
                    "Streamed run finished: {} after {} iteration(s)",
                    outcome.terminal,
                    outcome.iterations()
                );
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!("Client disconnected: {}", e);
            }
            Err(e) => {
                tracing::error!("Run failed: {}", e);
                let line = format!("{}\n", json!({ "error": e.to_string() }));
                let _ = line_tx.send(line).await;
            }
        }

        if let Some(dir) = scratch_dir {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                tracing::debug!("Failed to remove scratch dir {}: {}", dir.display(), e);
            }
        }
    });

    let lines = futures::stream::unfold(line_rx, |mut rx| async move {
        rx.recv().await.map(|line| (Ok::<_, Infallible>(line), rx))
    });

    ([(CONTENT_TYPE, NDJSON_CONTENT_TYPE)], Body::from_stream(lines)).into_response()
}
