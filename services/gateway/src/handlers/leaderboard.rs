use crate::error::AppError;
use crate::models::{LeaderboardResponse, SaveResultsRequest};
use crate::state::AppState;
use axum::{Json, extract::State};
use persistence::leaderboard::TOP_N;
use tracing::info;

/// Top stored results across all sessions.
pub async fn get_global(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let store = state.leaderboard.clone();
    let leaderboard = tokio::task::spawn_blocking(move || store.top(TOP_N))
        .await
        .map_err(|e| AppError::InternalError(e.into()))?;

    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// Append results by hand; answers with the new top rows.
pub async fn save_results(
    State(state): State<AppState>,
    Json(payload): Json<SaveResultsRequest>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    if payload.results.is_empty() {
        return Err(AppError::BadRequest("No results to save".into()));
    }
    if let Some(row) = payload.results.iter().find(|row| !row.networth.is_finite()) {
        return Err(AppError::BadRequest(format!(
            "Invalid networth for {}",
            row.player_id
        )));
    }

    let results: Vec<_> = payload
        .results
        .into_iter()
        .map(|row| (row.player_id, row.networth))
        .collect();
    let count = results.len();

    let store = state.leaderboard.clone();
    let leaderboard = tokio::task::spawn_blocking(move || store.append_and_rank(&results))
        .await
        .map_err(|e| AppError::InternalError(e.into()))??;

    info!(count, "Saved results via API");
    Ok(Json(LeaderboardResponse { leaderboard }))
}
