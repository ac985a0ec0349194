//! Spreadsheet export delivery.
//!
//! Export bytes are written to a uniquely named file under the configured
//! directory, streamed out as the response body, and removed once the
//! stream is dropped.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use chrono::Utc;
use futures::Stream;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::warn;
use uuid::Uuid;

/// A written export file ready to be streamed to the caller.
///
/// The delete-on-drop guard is created together with the file, so the
/// file is removed on every exit path: after streaming, or when the
/// export is dropped before a response was ever built.
pub struct ExportFile {
    guard: DeleteOnDrop,
    filename: String,
    size: u64,
}

impl ExportFile {
    /// Writes `bytes` to a fresh file under `dir`. The filename carries a
    /// discriminator, a timestamp and a random suffix so concurrent
    /// exports never collide.
    pub async fn write(dir: &str, discriminator: &str, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let filename = format!(
            "{}_{}_{}.csv",
            discriminator,
            Utc::now().format("%Y%m%d_%H%M%S"),
            Uuid::new_v4().simple()
        );
        let path = Path::new(dir).join(&filename);
        tokio::fs::write(&path, bytes).await?;

        Ok(Self {
            guard: DeleteOnDrop { path },
            filename,
            size: bytes.len() as u64,
        })
    }

    /// Streams the file as a `text/csv` attachment, deleting it once the
    /// body stream is dropped. When the open fails the guard is dropped
    /// here and the file is removed immediately.
    pub async fn into_response(self) -> io::Result<Response> {
        let file = File::open(&self.guard.path).await?;
        let stream = CleanupStream {
            inner: ReaderStream::new(file),
            _guard: self.guard,
        };

        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = StatusCode::OK;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/csv; charset=utf-8"),
        );
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.size));
        if let Ok(value) = HeaderValue::from_str(&disposition) {
            headers.insert(header::CONTENT_DISPOSITION, value);
        }
        Ok(response)
    }
}

/// Removes the export file when dropped.
struct DeleteOnDrop {
    path: PathBuf,
}

impl Drop for DeleteOnDrop {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %err, "Failed to remove export file");
        }
    }
}

/// File stream that owns the delete-on-drop guard.
struct CleanupStream {
    inner: ReaderStream<File>,
    _guard: DeleteOnDrop,
}

impl Stream for CleanupStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
