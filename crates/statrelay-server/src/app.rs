use crate::state::AppState;
use crate::{gzip, handlers, logging};
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;

/// Assembles the collector's HTTP surface.
///
/// Layer order (outermost first): request logging, panic recovery, response
/// compression, request gzip inflation, then the routes.
pub fn build_http_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::list))
        .route("/ping", get(handlers::ping))
        .route("/update/{kind}/{name}/{value}", post(handlers::update_path))
        .route("/update/", post(handlers::update_json))
        .route("/updates/", post(handlers::updates_json))
        .route("/value/{kind}/{name}", get(handlers::value_path))
        .route("/value/", post(handlers::value_json))
        .with_state(state)
        .layer(middleware::from_fn(gzip::decompress_request))
        .layer(CompressionLayer::new())
        .layer(CatchPanicLayer::new())
        .layer(middleware::from_fn(logging::request_logging))
}
