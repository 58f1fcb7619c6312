//! Append-only log of playback starts

use axum::http::HeaderMap;
use chrono::{DateTime, Local};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Header set by reverse proxies with the original client address
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// One playback start
#[derive(Debug, Clone)]
pub struct WatchEvent {
    pub file: PathBuf,
    pub client: String,
    pub time: DateTime<Local>,
}

impl WatchEvent {
    /// Create an event stamped with the current local time
    pub fn now(file: &Path, client: String) -> Self {
        Self {
            file: file.to_path_buf(),
            client,
            time: Local::now(),
        }
    }
}

impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[WATCHED] File: {} | IP: {} | Time: {}",
            self.file.display(),
            self.client,
            self.time.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Address of the requesting client
///
/// Prefers the first hop of `X-Forwarded-For`, then the socket peer.
pub fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Shared sink for watch events
///
/// Every event is emitted as a `tracing` event. When a file is configured
/// the formatted line is also appended there with a single write while the
/// lock is held, so concurrent records never interleave.
#[derive(Clone, Default)]
pub struct WatchLog {
    file: Option<Arc<Mutex<File>>>,
}

impl WatchLog {
    /// Log to `tracing` only
    pub fn tracing_only() -> Self {
        Self::default()
    }

    /// Log to `tracing` and append to `path`, creating it if needed
    pub async fn with_file(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            file: Some(Arc::new(Mutex::new(file))),
        })
    }

    /// Record one playback start
    ///
    /// A failed file append is logged and swallowed; it never fails the
    /// stream it belongs to.
    pub async fn record(&self, event: &WatchEvent) {
        tracing::info!(
            target: "watched",
            file = %event.file.display(),
            client = %event.client,
            "{}",
            event
        );

        if let Some(file) = &self.file {
            let line = format!("{}\n", event);
            let mut file = file.lock().await;
            if let Err(e) = file.write_all(line.as_bytes()).await {
                tracing::error!("Failed to append watch event: {}", e);
                return;
            }
            if let Err(e) = file.flush().await {
                tracing::error!("Failed to flush watch log: {}", e);
            }
        }
    }
}
