use crate::handlers::{leaderboard, stocks, ws};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/leaderboard/global", get(leaderboard::get_global))
        .route("/leaderboard/save", post(leaderboard::save_results))
        .route("/stocks", get(stocks::list_stocks));

    Router::new()
        .route("/health", get(stocks::health))
        .nest("/v1", api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use persistence::GlobalLeaderboardStore;
    use serde_json::{Value, json};
    use session::{InMemoryFeed, SessionConfig, SessionEngine};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn app(tmp: &TempDir) -> Router {
        let feed = InMemoryFeed::new()
            .with_prices("aaba.us", &[10.0])
            .with_prices("cvx.us", &[20.0]);
        let (session, _task) = session::spawn(
            SessionEngine::new(SessionConfig::default(), Arc::new(feed)),
            None,
        );
        let store = Arc::new(GlobalLeaderboardStore::new(
            tmp.path().join("global_leaderboard.json"),
        ));
        create_router(AppState::new(session, store))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn save_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/leaderboard/save")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let tmp = TempDir::new().unwrap();
        let response = app(&tmp)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_global_leaderboard() {
        let tmp = TempDir::new().unwrap();
        let response = app(&tmp)
            .oneshot(
                Request::get("/v1/leaderboard/global")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "leaderboard": [] }));
    }

    #[tokio::test]
    async fn test_save_then_read() {
        let tmp = TempDir::new().unwrap();
        let app = app(&tmp);

        let response = app
            .clone()
            .oneshot(save_request(json!({
                "results": [
                    { "player_id": "Ann", "networth": 9000.0 },
                    { "player_id": "AI", "networth": 12000.0 }
                ]
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let saved = body_json(response).await;
        assert_eq!(saved["leaderboard"][0]["player_id"], "AI");

        let response = app
            .oneshot(
                Request::get("/v1/leaderboard/global")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let read = body_json(response).await;
        assert_eq!(read["leaderboard"].as_array().unwrap().len(), 2);
        assert_eq!(read["leaderboard"][1]["player_id"], "Ann");
    }

    #[tokio::test]
    async fn test_save_rejects_empty_results() {
        let tmp = TempDir::new().unwrap();
        let response = app(&tmp)
            .oneshot(save_request(json!({ "results": [] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_list_stocks() {
        let tmp = TempDir::new().unwrap();
        let response = app(&tmp)
            .oneshot(Request::get("/v1/stocks").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "stocks": ["aaba.us", "cvx.us"] })
        );
    }
}
