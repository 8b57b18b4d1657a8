//! Streaming handle for datastream reads.
//!
//! A [`Datastream`] is consumed once, front to back. Errors from the
//! underlying connection surface on the chunk where they happen.

use crate::client::backends::{BackendError, BackendResult};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use std::fmt;
use std::io;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

pub struct Datastream {
    content_type: Option<String>,
    content_length: Option<u64>,
    chunks: BoxStream<'static, BackendResult<Bytes>>,
}

impl Datastream {
    pub(crate) fn from_response(response: Response) -> Self {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let content_length = response.content_length();

        Self {
            content_type,
            content_length,
            chunks: response.bytes_stream().map_err(BackendError::from).boxed(),
        }
    }

    /// Wrap an in-memory buffer, mostly useful as a stand-in for a backend
    #[must_use]
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            content_type: None,
            content_length: Some(data.len() as u64),
            chunks: futures::stream::once(async move { Ok(data) }).boxed(),
        }
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Length announced by the server, if any
    #[must_use]
    pub const fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Next chunk of the body, or `None` once the stream is finished
    pub async fn next_chunk(&mut self) -> Option<BackendResult<Bytes>> {
        self.chunks.next().await
    }

    /// Read the remainder of the stream into memory
    pub async fn bytes(self) -> BackendResult<Bytes> {
        let chunks: Vec<Bytes> = self.chunks.try_collect().await?;
        if chunks.len() == 1 {
            return Ok(chunks.into_iter().next().unwrap_or_default());
        }
        Ok(Bytes::from(chunks.concat()))
    }

    pub async fn into_vec(self) -> BackendResult<Vec<u8>> {
        self.bytes().await.map(|b| b.to_vec())
    }

    /// Adapt the stream to [`AsyncRead`], e.g. for `tokio::io::copy` into a
    /// file
    pub fn into_async_read(self) -> impl AsyncRead + Send + Unpin {
        StreamReader::new(
            self.chunks
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
        )
    }
}

impl fmt::Debug for Datastream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Datastream")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
