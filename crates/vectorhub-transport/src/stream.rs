use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use vectorhub_core::VectorHubError;

/// Wraps a byte stream and keeps a copy of every chunk it yields.
///
/// Polling is forwarded to the inner stream unchanged; the captured bytes
/// are available through [`answer`](CapturingStream::answer) once the
/// caller has consumed the stream, e.g. to store a streamed chat reply.
pub struct CapturingStream<S> {
    inner: S,
    captured: Vec<u8>,
}

impl<S> CapturingStream<S>
where
    S: Stream<Item = Result<Bytes, VectorHubError>> + Unpin,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            captured: Vec::new(),
        }
    }

    /// Everything consumed so far, decoded as UTF-8 (lossy).
    pub fn answer(&self) -> String {
        String::from_utf8_lossy(&self.captured).into_owned()
    }

    pub fn captured(&self) -> &[u8] {
        &self.captured
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Drain the remaining stream and return the text read by this call.
    pub async fn read_to_string(&mut self) -> Result<String, VectorHubError> {
        let start = self.captured.len();
        while let Some(chunk) = self.next().await {
            chunk?;
        }
        Ok(String::from_utf8_lossy(&self.captured[start..]).into_owned())
    }
}

impl<S> Stream for CapturingStream<S>
where
    S: Stream<Item = Result<Bytes, VectorHubError>> + Unpin,
{
    type Item = Result<Bytes, VectorHubError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_next(cx);
        if let Poll::Ready(Some(Ok(chunk))) = &polled {
            this.captured.extend_from_slice(chunk);
        }
        polled
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
