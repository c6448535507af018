//! netwatch-api — HTTP surface for netwatch.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Device and transition counts |
//! | GET | `/status` | Every device, keyed by address |
//! | GET | `/events` | Newest 100 transitions, most recent first |
//! | POST | `/add` | Register a device (form-encoded) |
//! | GET | `/export` | Full transition log as CSV |
//! | GET | `/healthz` | Liveness |

pub mod export;
pub mod handlers;

use axum::Router;
use axum::routing::{get, post};
use netwatch_monitor::Monitor;

pub use export::render_csv;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub monitor: Monitor,
}

/// Build the complete API router.
pub fn build_router(monitor: Monitor) -> Router {
    let state = ApiState { monitor };

    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/events", get(handlers::events))
        .route("/add", post(handlers::add_device))
        .route("/export", get(handlers::export))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}
