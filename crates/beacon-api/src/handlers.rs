//! REST API handlers.
//!
//! Each handler reads from the shared monitors and returns JSON, except
//! `/metrics` which returns Prometheus text.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use tracing::warn;

use beacon_metrics::render_prometheus;
use beacon_registry::LifecycleEvent;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// A gauge with its current value.
#[derive(serde::Serialize)]
pub struct GaugeValue {
    pub name: String,
    pub value: f64,
}

/// GET /api/v1/preservation
pub async fn get_preservation(State(state): State<ApiState>) -> impl IntoResponse {
    let status = state.status.borrow().clone();
    ApiResponse::ok(status).into_response()
}

/// GET /api/v1/gauges
pub async fn list_gauges(State(state): State<ApiState>) -> impl IntoResponse {
    let gauges: Vec<GaugeValue> = state
        .board
        .sample()
        .into_iter()
        .map(|(name, value)| GaugeValue { name, value })
        .collect();
    ApiResponse::ok(gauges).into_response()
}

/// GET /api/v1/applications
pub async fn list_applications(State(state): State<ApiState>) -> impl IntoResponse {
    match state.source.list_applications() {
        Ok(apps) => ApiResponse::ok(apps).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE).into_response(),
    }
}

/// POST /api/v1/events
pub async fn post_event(
    State(state): State<ApiState>,
    Json(event): Json<LifecycleEvent>,
) -> impl IntoResponse {
    match state.events.send(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            warn!(error = %e, "lifecycle event channel closed");
            error_response("event channel closed", StatusCode::SERVICE_UNAVAILABLE)
                .into_response()
        }
    }
}

/// GET /metrics — Prometheus exposition.
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = render_prometheus(&state.board.sample());
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::{mpsc, watch};

    use beacon_metrics::GaugeBoard;
    use beacon_preservation::PreservationStatus;
    use beacon_registry::{InMemoryRegistry, InstanceStatus};

    fn test_state() -> (ApiState, mpsc::Receiver<LifecycleEvent>, Arc<InMemoryRegistry>) {
        let registry = Arc::new(InMemoryRegistry::new());
        let board = Arc::new(GaugeBoard::new());
        let (_status_tx, status_rx) = watch::channel(PreservationStatus::pending());
        let (events_tx, events_rx) = mpsc::channel(16);

        (
            ApiState {
                source: registry.clone(),
                board,
                status: status_rx,
                events: events_tx,
            },
            events_rx,
            registry,
        )
    }

    #[tokio::test]
    async fn preservation_returns_latest_status() {
        let (state, _rx, _registry) = test_state();
        let resp = get_preservation(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn gauges_lists_registered_values() {
        let (state, _rx, _registry) = test_state();
        state.board.register("registry_instances_total", || 4.0);

        let resp = list_gauges(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn applications_reflect_registry() {
        let (state, _rx, registry) = test_state();
        registry.upsert_instance("orders", "i-1", InstanceStatus::Up);

        let resp = list_applications(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn post_event_forwards_to_channel() {
        let (state, mut rx, _registry) = test_state();
        let event = LifecycleEvent::Registered {
            app_name: "orders".to_string(),
            instance_id: "i-1".to_string(),
        };

        let resp = post_event(State(state), Json(event.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn post_event_when_channel_closed() {
        let (state, rx, _registry) = test_state();
        drop(rx);

        let event = LifecycleEvent::Renewed {
            app_name: "orders".to_string(),
        };
        let resp = post_event(State(state), Json(event)).await.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn metrics_renders_prometheus_text() {
        let (state, _rx, _registry) = test_state();
        state.board.register("registry_peer_nodes_total", || 2.0);

        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("text/plain"));
    }
}
