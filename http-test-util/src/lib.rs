pub mod drain;
pub mod server;

use bytes::Bytes;
use http_body_util::Full;

pub use server::{ReceivedRequest, StubRoutes, StubServer};

#[inline]
pub fn empty_body() -> Full<Bytes> {
    Full::new(Bytes::new())
}

#[inline]
pub fn byte_body<B: Into<Bytes>>(bytes: B) -> Full<Bytes> {
    Full::new(bytes.into())
}
