//! HTTP API over [`App`].
//!
//! JSON in, JSON out, plus the RSS export. Feed URLs travel as a `url` query
//! parameter (or body field for `POST /feeds`) rather than a path segment.

mod error;
mod handlers;

use axum::routing::get;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::app::App;

pub use error::{ApiError, ApiResult};

/// Build the axum application router.
///
/// Separated from [`run_server`] to enable testing without TCP binding.
pub fn build_app(app: Arc<App>) -> Router {
    Router::new()
        .route(
            "/feeds",
            get(handlers::list_feeds).post(handlers::add_feed),
        )
        .route(
            "/feed",
            get(handlers::get_feed).delete(handlers::remove_feed),
        )
        .route("/export", get(handlers::export_feed))
        .route("/health", get(handlers::health))
        .with_state(app)
}

/// Serve until `shutdown` resolves, then let in-flight requests finish.
pub async fn run_server<F>(addr: &str, app: Arc<App>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "feedroom listening");

    axum::serve(listener, build_app(app))
        .with_graceful_shutdown(shutdown)
        .await
}
