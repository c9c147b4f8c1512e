//! Process endpoint handler.

use axum::{extract::State, http::StatusCode, Json};
use tracing::{debug, error, instrument};

use crate::state::SharedState;
use system_monitor::process::ProcessEntry;

/// Handler for /api/v1/process.
///
/// Walks /proc on the blocking pool; the table stays locked for the walk.
#[instrument(skip(state))]
pub async fn process_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ProcessEntry>>, (StatusCode, String)> {
    debug!("Processing /api/v1/process request");

    let entries = tokio::task::spawn_blocking(move || {
        let mut table = state.process_table();
        table.entries()
    })
    .await
    .map_err(|e| {
        error!("Process enumeration task failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    debug!("Reporting {} processes", entries.len());
    Ok(Json(entries))
}
