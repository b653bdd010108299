//! Readiness endpoint

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use axum_helpers::server::{run_health_checks, HealthCheckFuture};

use crate::state::AppState;

async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let mut checks: Vec<(&str, HealthCheckFuture)> = Vec::new();

    if let Some(mongo) = &state.mongo {
        let client = mongo.client.clone();
        checks.push((
            "mongodb",
            Box::pin(async move {
                database::mongodb::ping(&client)
                    .await
                    .map_err(|e| e.to_string())
            }),
        ));
    }

    run_health_checks(checks).await
}

/// Router exposing `GET /ready`
pub fn router(state: AppState) -> Router {
    Router::new().route("/ready", get(ready)).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn memory_state() -> AppState {
        temp_env::with_vars(
            [
                ("CATALOG_STORE", Some("memory")),
                ("MONGODB_URL", None::<&str>),
            ],
            || AppState {
                config: crate::config::Config::from_env().unwrap(),
                mongo: None,
            },
        )
    }

    #[tokio::test]
    async fn test_ready_without_database_checks() {
        let response = router(memory_state())
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ready");
        assert!(body.get("mongodb").is_none());
    }
}
