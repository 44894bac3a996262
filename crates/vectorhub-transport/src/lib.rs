//! Transport port for vectorhub adapters.
//!
//! Adapters never talk to an HTTP client directly. They build an
//! [`HttpRequest`] and hand it to a [`Transport`]; [`HttpTransport`] is the
//! reqwest-backed default and [`FakeTransport`] replays queued responses in
//! tests.

pub mod transport;
pub use transport::{
    Body, ByteStream, FakeTransport, HttpRequest, HttpResponse, HttpTransport, Method, Transport,
};

mod stream;
pub use stream::CapturingStream;
