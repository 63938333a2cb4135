//! beacon-api — REST surface for operators and scrapers.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/preservation` | Latest self-preservation status |
//! | GET | `/api/v1/gauges` | All gauges with current values (JSON) |
//! | GET | `/api/v1/applications` | Registry application view |
//! | POST | `/api/v1/events` | Inject a lifecycle event (standalone mode) |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::sync::{mpsc, watch};

use beacon_metrics::GaugeBoard;
use beacon_preservation::PreservationStatus;
use beacon_registry::{LifecycleEvent, RegistrySource};

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub source: Arc<dyn RegistrySource>,
    pub board: Arc<GaugeBoard>,
    pub status: watch::Receiver<PreservationStatus>,
    pub events: mpsc::Sender<LifecycleEvent>,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/preservation", get(handlers::get_preservation))
        .route("/gauges", get(handlers::list_gauges))
        .route("/applications", get(handlers::list_applications))
        .route("/events", post(handlers::post_event))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
