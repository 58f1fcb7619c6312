//! Time-bounded filesystem calls
//!
//! `tokio::fs` already moves blocking calls onto the blocking pool. The
//! timeout keeps a hung network mount from holding a request forever.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

/// Failure of a single bounded filesystem call
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("storage did not respond within {0:?}")]
    TimedOut(Duration),
}

impl StorageError {
    /// Whether the underlying error is "no such file or directory"
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}

/// Run a filesystem future, giving up after `limit`
pub async fn bounded<T, F>(limit: Duration, op: F) -> Result<T, StorageError>
where
    F: Future<Output = io::Result<T>>,
{
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result.map_err(StorageError::Io),
        Err(_) => {
            tracing::warn!("Storage call timed out after {:?}", limit);
            Err(StorageError::TimedOut(limit))
        }
    }
}

/// Reader that fails any single read stalling longer than `limit`
///
/// The clock only runs while a read is pending on the inner reader, so a
/// client that pauses consuming the body is never cut off.
pub struct TimedReader<R> {
    inner: R,
    limit: Duration,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl<R> TimedReader<R> {
    pub fn new(inner: R, limit: Duration) -> Self {
        Self {
            inner,
            limit,
            deadline: None,
        }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for TimedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Poll::Ready(result) = Pin::new(&mut this.inner).poll_read(cx, buf) {
            this.deadline = None;
            return Poll::Ready(result);
        }

        let limit = this.limit;
        let deadline = this
            .deadline
            .get_or_insert_with(|| Box::pin(tokio::time::sleep(limit)));
        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                this.deadline = None;
                tracing::warn!("Storage read timed out after {:?}", limit);
                Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::TimedOut,
                    StorageError::TimedOut(limit),
                )))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
