//! HTTP surface of the gateway.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::put,
};
use std::{future::Future, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{gateway::Gateway, model::SearchRequest};

pub const SEARCH_ROUTE: &str = "/insertSearchTerm";

/// Body of every failed search, whatever went wrong.
pub const SEARCH_FAILED_BODY: &str = "Error inserting search term";

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new().route(SEARCH_ROUTE, put(insert_search_term)).with_state(gateway)
}

async fn insert_search_term(
    State(gateway): State<Arc<Gateway>>,
    Json(request): Json<SearchRequest>,
) -> Response {
    match gateway.submit_search(&request.search_term).await {
        Ok(bundle) => (StatusCode::OK, Json(bundle)).into_response(),
        Err(e) => {
            error!(search_term = %request.search_term, error = %e, cause = ?e, "search failed");
            (StatusCode::INTERNAL_SERVER_ERROR, SEARCH_FAILED_BODY).into_response()
        }
    }
}

/// Serve the gateway on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    gateway: Arc<Gateway>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "forecast gateway listening");
    }

    axum::serve(listener, router(gateway)).with_graceful_shutdown(shutdown).await
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
