//! HTTP server: browsing, player page and range streaming routes

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::listing;
use crate::pages::{self, ARCHIVE_TITLE};
use crate::state::ServerState;
use crate::stream::VideoStream;
use crate::token::PathToken;
use crate::watch::{client_address, WatchEvent};

/// File server API for managing the HTTP server
#[derive(Clone)]
pub struct FileServerApi {
    state: ServerState,
}

impl FileServerApi {
    /// Create a new file server API around prepared state
    pub fn new(state: ServerState) -> Self {
        Self { state }
    }

    /// Get the server state
    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Create the axum router with all routes configured
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(browse))
            .route("/player", get(player))
            .route("/video-stream", get(video_stream))
            .route("/health", get(health_check))
            .with_state(self.state.clone())
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Start the file server and run until Ctrl-C
    ///
    /// # Arguments
    /// * `host` - Host to bind to (e.g., "0.0.0.0")
    /// * `port` - Port to bind to (e.g., 3000)
    pub async fn serve(self, host: &str, port: u16) -> crate::Result<()> {
        let addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        tracing::info!("Movie Archive running: http://{}", addr);

        axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[derive(Debug, Deserialize)]
struct BrowseQuery {
    dir: Option<PathToken>,
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    path: Option<PathToken>,
}

/// Decode a token from the query and check it against the root policy
fn resolve(state: &ServerState, token: &PathToken) -> Result<PathBuf, AppError> {
    let path = token.decode()?;
    if !state.allows(&path) {
        tracing::warn!("Refusing path outside configured roots: {}", path.display());
        return Err(AppError::Forbidden("Path not allowed".to_string()));
    }
    Ok(path)
}

fn required(token: Option<PathToken>) -> Result<PathToken, AppError> {
    token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing path parameter".to_string()))
}

/// Health check endpoint
async fn health_check(State(state): State<ServerState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        format!("Movie archive running. Roots: {}", state.roots().len()),
    )
}

/// Directory listing, or the configured roots when no `dir` is given
async fn browse(
    State(state): State<ServerState>,
    Query(query): Query<BrowseQuery>,
) -> Result<Html<String>, AppError> {
    let dir = match query.dir.filter(|t| !t.is_empty()) {
        Some(token) => Some(resolve(&state, &token)?),
        None => None,
    };

    let listing = listing::list(state.roots(), dir.as_deref(), state.storage_timeout()).await?;

    let title = dir
        .as_deref()
        .map(|d| d.display().to_string())
        .unwrap_or_else(|| ARCHIVE_TITLE.to_string());

    Ok(Html(pages::render_listing(&title, &listing)))
}

/// Player page with the sorted playlist of sibling videos
async fn player(
    State(state): State<ServerState>,
    Query(query): Query<PathQuery>,
) -> Result<Html<String>, AppError> {
    let token = required(query.path)?;
    let path = resolve(&state, &token)?;

    let playlist = listing::build_playlist(&path, state.storage_timeout()).await?;
    let current = playlist.current().ok_or_else(|| {
        tracing::debug!("{} is not in its folder's playlist", path.display());
        AppError::NotFound("File not found".to_string())
    })?;

    Ok(Html(pages::render_player(&current.name, &token, &playlist)))
}

/// Stream a video with range request support
async fn video_stream(
    State(state): State<ServerState>,
    Query(query): Query<PathQuery>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let token = required(query.path)?;
    let path = resolve(&state, &token)?;

    let range = headers
        .get(header::RANGE)
        .map(|v| v.to_str().unwrap_or_default());

    let stream = VideoStream::open(&path, range, state.storage_timeout()).await?;

    if stream.is_playback_start() {
        record_watch(&state, &path, &headers, peer.map(|ConnectInfo(addr)| addr)).await;
    }

    Ok(stream.into_response())
}

async fn record_watch(
    state: &ServerState,
    path: &Path,
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
) {
    let event = WatchEvent::now(path, client_address(headers, peer));
    state.watch_log().record(&event).await;
}
