use bytes::Buf;
use hyper::body::Body;
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Upper bound on the up-front allocation, the declared length is server-supplied.
const MAX_PREALLOC: usize = 64 * 1024;

pin_project! {
    /// Collects every data frame of a body into one buffer, trailers are skipped.
    pub struct DrainBodyFuture<B: Body> {
        #[pin]
        body: B,
        buf: Vec<u8>
    }
}

impl<B> DrainBodyFuture<B>
where
    B: Body,
{
    /// `content_length` only sizes the initial buffer, a body may be longer or shorter.
    #[inline]
    #[must_use]
    pub fn new_trusted_length(body: B, content_length: usize) -> Self {
        Self {
            body,
            buf: Vec::with_capacity(content_length.min(MAX_PREALLOC)),
        }
    }
}

impl<B> Future for DrainBodyFuture<B>
where
    B: Body,
{
    type Output = Result<Vec<u8>, anyhow::Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut slf = self.project();
        loop {
            if slf.body.is_end_stream() {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            }
            let Some(next_res) = ready!(slf.body.as_mut().poll_frame(cx)) else {
                return Poll::Ready(Ok(std::mem::take(slf.buf)));
            };
            let Ok(next_frame) = next_res else {
                return Poll::Ready(Err(anyhow::anyhow!("Failed to poll next frame")));
            };
            if let Ok(mut data) = next_frame.into_data() {
                while data.has_remaining() {
                    let chunk = data.chunk();
                    let len = chunk.len();
                    slf.buf.extend_from_slice(chunk);
                    data.advance(len);
                }
            }
        }
    }
}
