use crate::error::AppError;
use crate::models::StocksResponse;
use crate::state::AppState;
use axum::{Json, extract::State};

pub async fn list_stocks(State(state): State<AppState>) -> Result<Json<StocksResponse>, AppError> {
    let stocks = state.session.available_symbols().await?;
    Ok(Json(StocksResponse { stocks }))
}

pub async fn health() -> &'static str {
    "ok"
}
