//! HTTP routes
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | GET | `/` | 301 to `/index.html` |
//! | GET | `/index.html` | landing page |
//! | GET | `/stream.mjpg` | MJPEG stream |
//! | POST | `/zoom` | 204, zooms the camera crop out one step |
//! | any | other | 404 |
//!
//! A known path with the wrong method is a 404 as well, not a 405.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};

use crate::control::ZoomControl;
use crate::frame::FrameSlot;
use crate::http::INDEX_HTML;
use crate::server::connection::ClientInfo;
use crate::server::stream::MjpegStream;
use crate::stats::ServerStats;

/// Path of the MJPEG stream
pub const STREAM_PATH: &str = "/stream.mjpg";
/// Path of the landing page
pub const INDEX_PATH: &str = "/index.html";
/// Path of the zoom control
pub const ZOOM_PATH: &str = "/zoom";

/// Shared handles every handler can reach
pub struct AppState<Z> {
    pub slot: Arc<FrameSlot>,
    pub zoom: Arc<Z>,
    pub stats: Arc<ServerStats>,
}

impl<Z> AppState<Z> {
    pub fn new(slot: Arc<FrameSlot>, zoom: Arc<Z>, stats: Arc<ServerStats>) -> Self {
        Self { slot, zoom, stats }
    }
}

impl<Z> Clone for AppState<Z> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            zoom: Arc::clone(&self.zoom),
            stats: Arc::clone(&self.stats),
        }
    }
}

/// Build the router serving every route
///
/// Handlers expect a [`ClientInfo`] request extension, which
/// [`Connection`](crate::server::Connection) inserts.
pub fn router<Z: ZoomControl>(state: AppState<Z>) -> Router {
    Router::new()
        .route("/", get(redirect_to_index).fallback(not_found::<Z>))
        .route(INDEX_PATH, get(index_page).fallback(not_found::<Z>))
        .route(STREAM_PATH, get(stream::<Z>).fallback(not_found::<Z>))
        .route(ZOOM_PATH, post(zoom::<Z>).fallback(not_found::<Z>))
        .fallback(not_found::<Z>)
        .with_state(state)
}

async fn redirect_to_index() -> impl IntoResponse {
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, INDEX_PATH)])
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn stream<Z: ZoomControl>(
    State(state): State<AppState<Z>>,
    Extension(client): Extension<ClientInfo>,
) -> MjpegStream {
    MjpegStream::new(state.slot.subscribe(), client, Arc::clone(&state.stats))
}

async fn zoom<Z: ZoomControl>(
    State(state): State<AppState<Z>>,
    Extension(client): Extension<ClientInfo>,
) -> Response {
    state.stats.zoom_requested();

    match state.zoom.increment_zoom() {
        Ok(crop) => {
            tracing::info!(
                session_id = client.session_id,
                peer = %client.peer_addr,
                crop = %crop,
                "Zoom out"
            );
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            tracing::error!(
                session_id = client.session_id,
                peer = %client.peer_addr,
                error = %e,
                "Zoom failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Zoom failed").into_response()
        }
    }
}

async fn not_found<Z: ZoomControl>(
    State(state): State<AppState<Z>>,
    Extension(client): Extension<ClientInfo>,
    method: Method,
    uri: Uri,
) -> impl IntoResponse {
    state.stats.route_not_found();

    tracing::debug!(
        session_id = client.session_id,
        method = %method,
        path = uri.path(),
        "Not found"
    );

    (StatusCode::NOT_FOUND, "Not Found")
}
