//! Range streaming engine
//!
//! Resolves a video file, works out which byte window to serve and hands
//! back a lazily read body. The file handle lives inside the body stream, so
//! a client disconnect drops the stream and closes the file. Body reads are
//! bounded by the same storage timeout as the calls made while opening.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::range::{parse_range, RangeError, RangeWindow};
use crate::storage::{bounded, StorageError, TimedReader};

/// Content type sent for every streamed video
pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Read buffer size for the body stream
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Errors raised before any byte of the body is sent
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// File is missing or is not a regular file
    #[error("video not found: {0}")]
    NotFound(PathBuf),
    /// Range header cannot be served
    #[error(transparent)]
    Range(#[from] RangeError),
    /// File exists but could not be opened or read
    #[error("video not readable: {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Storage did not answer in time
    #[error("storage unavailable while opening {0}")]
    StorageUnavailable(PathBuf),
}

impl StreamError {
    fn from_storage(path: &Path, err: StorageError) -> Self {
        match err {
            StorageError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StreamError::NotFound(path.to_path_buf())
            }
            StorageError::Io(source) => StreamError::Io {
                path: path.to_path_buf(),
                source,
            },
            StorageError::TimedOut(_) => StreamError::StorageUnavailable(path.to_path_buf()),
        }
    }
}

/// An opened video ready to be sent as a full or partial response
pub struct VideoStream {
    file: File,
    file_size: u64,
    window: Option<RangeWindow>,
    /// Bound on each body read
    limit: Duration,
}

impl VideoStream {
    /// Open `path` and position it for the requested range
    ///
    /// With no `range` header the whole file is served.
    pub async fn open(
        path: &Path,
        range: Option<&str>,
        limit: Duration,
    ) -> Result<Self, StreamError> {
        let metadata = bounded(limit, tokio::fs::metadata(path))
            .await
            .map_err(|e| StreamError::from_storage(path, e))?;
        if !metadata.is_file() {
            return Err(StreamError::NotFound(path.to_path_buf()));
        }
        let file_size = metadata.len();

        let window = range.map(|h| parse_range(h, file_size)).transpose()?;

        let mut file = bounded(limit, File::open(path))
            .await
            .map_err(|e| StreamError::from_storage(path, e))?;

        if let Some(window) = window {
            bounded(limit, file.seek(SeekFrom::Start(window.start)))
                .await
                .map_err(|e| StreamError::from_storage(path, e))?;
        }

        Ok(Self {
            file,
            file_size,
            window,
            limit,
        })
    }

    /// Total size of the file on disk
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Window being served, `None` for a full response
    pub fn window(&self) -> Option<RangeWindow> {
        self.window
    }

    /// Number of body bytes this response carries
    pub fn content_length(&self) -> u64 {
        self.window.map_or(self.file_size, |w| w.len())
    }

    /// Whether this request looks like the start of a playback
    ///
    /// True for a request without a range or one starting at byte 0. Seeks
    /// mid-stream come in with a later start offset.
    pub fn is_playback_start(&self) -> bool {
        self.window.map_or(true, |w| w.start == 0)
    }
}

impl IntoResponse for VideoStream {
    fn into_response(self) -> Response {
        let content_length = self.content_length();
        let reader = TimedReader::new(self.file.take(content_length), self.limit);
        let body = Body::from_stream(ReaderStream::with_capacity(reader, STREAM_CHUNK_SIZE));

        let mut builder = Response::builder()
            .header(header::CONTENT_TYPE, VIDEO_CONTENT_TYPE)
            .header(header::CONTENT_LENGTH, content_length)
            .header(header::ACCEPT_RANGES, "bytes");

        builder = match self.window {
            Some(window) => builder
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_RANGE, window.content_range(self.file_size)),
            None => builder.status(StatusCode::OK),
        };

        match builder.body(body) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to build stream response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    const LIMIT: Duration = Duration::from_secs(5);

    fn fixture(len: usize) -> (TempDir, PathBuf, Vec<u8>) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();
        (dir, path, data)
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    #[tokio::test]
    async fn test_full_response() {
        let (_dir, path, data) = fixture(10_000);
        let stream = VideoStream::open(&path, None, LIMIT).await.unwrap();
        assert!(stream.is_playback_start());
        assert_eq!(stream.window(), None);

        let response = stream.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "10000");
        assert_eq!(response.headers()[header::CONTENT_TYPE], VIDEO_CONTENT_TYPE);
        assert!(response.headers().get(header::CONTENT_RANGE).is_none());
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_partial_response() {
        let (_dir, path, data) = fixture(200_000);
        let stream = VideoStream::open(&path, Some("bytes=1000-150999"), LIMIT)
            .await
            .unwrap();
        assert!(!stream.is_playback_start());
        assert_eq!(stream.content_length(), 150_000);

        let response = stream.into_response();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(
            response.headers()[header::CONTENT_RANGE],
            "bytes 1000-150999/200000"
        );
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "150000");
        assert_eq!(response.headers()[header::ACCEPT_RANGES], "bytes");
        assert_eq!(body_bytes(response).await, &data[1000..=150_999]);
    }

    #[tokio::test]
    async fn test_open_range_from_zero_is_playback_start() {
        let (_dir, path, data) = fixture(4096);
        let stream = VideoStream::open(&path, Some("bytes=0-"), LIMIT).await.unwrap();
        assert!(stream.is_playback_start());

        let response = stream.into_response();
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[header::CONTENT_RANGE], "bytes 0-4095/4096");
        assert_eq!(body_bytes(response).await, data);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = VideoStream::open(&dir.path().join("gone.mp4"), None, LIMIT).await;
        assert!(matches!(result, Err(StreamError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_directory_is_not_a_video() {
        let dir = TempDir::new().unwrap();
        let result = VideoStream::open(dir.path(), None, LIMIT).await;
        assert!(matches!(result, Err(StreamError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let (_dir, path, _data) = fixture(100);
        let result = VideoStream::open(&path, Some("bytes=50-100"), LIMIT).await;
        match result {
            Err(StreamError::Range(e)) => assert_eq!(e.content_range(), "bytes */100"),
            _ => panic!("expected range error"),
        }
    }

    #[tokio::test]
    async fn test_empty_file_full_response() {
        let (_dir, path, _data) = fixture(0);
        let response = VideoStream::open(&path, None, LIMIT)
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "0");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_body_mid_stream() {
        let (_dir, path, data) = fixture(1024 * 1024);
        let response = VideoStream::open(&path, None, LIMIT)
            .await
            .unwrap()
            .into_response();

        let mut body = response.into_body();
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(first.len() <= STREAM_CHUNK_SIZE);
        assert_eq!(&first[..], &data[..first.len()]);
        drop(body);

        let again = VideoStream::open(&path, Some("bytes=0-9"), LIMIT)
            .await
            .unwrap()
            .into_response();
        assert_eq!(body_bytes(again).await, &data[..10]);
    }
}
