//! Adapters for hosts that deliver the body as a stream of chunks.
//!
//! [`BodyDemux`](crate::BodyDemux) reads from any [`AsyncRead`]. Hosts that
//! push chunks instead can hand over a [`BodyStream`], usually created with
//! [`body_channel`], wrapped in a [`BodyReader`].
//!
//! ```
//! use bodyfield::body::{BodyReader, body_channel};
//! use bodyfield::{BodyDemux, FieldDescriptor};
//! use bytes::Bytes;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (tx, stream) = body_channel(4);
//! tokio::spawn(async move {
//!     for chunk in [&b"{\"name\": \"Ad"[..], &b"a\"}"[..]] {
//!         let _ = tx.send(Ok(Bytes::copy_from_slice(chunk))).await;
//!     }
//! });
//!
//! let demux = BodyDemux::new(BodyReader::new(stream));
//! demux
//!     .initialize("greet-1", [FieldDescriptor::of::<String>("name")])
//!     .expect("registry initialized");
//! let name = demux.read_field::<String>("name").await.expect("body is valid");
//! assert_eq!(name.value().as_deref(), Some("Ada"));
//! # }
//! ```

use std::{
    io,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tokio::{
    io::{AsyncRead, ReadBuf},
    sync::mpsc,
};
use tokio_util::io::StreamReader;

/// Chunked JSON body fed to a drain.
///
/// Chunk boundaries are arbitrary; a property value may span any number of
/// items. The first `Err` item fails the drain and is cached for every field
/// read as [`crate::StructuralError::Io`] carrying the error's kind and
/// message. End of stream before the root object closes reads as
/// [`crate::StructuralError::TruncatedBody`].
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send + 'static>>;

/// Chunks a [`body_channel`] holds before the host's `send` waits for the
/// drain to catch up.
pub const DEFAULT_BODY_CHANNEL_CAPACITY: usize = 16;

/// Bounded channel from a chunk-pushing host to a [`BodyDemux`](crate::BodyDemux).
///
/// Nothing is received until the first field read starts the drain, so a
/// host pushing more than `capacity` chunks must do so from its own task.
/// Dropping the sender marks the end of the body.
///
/// # Panics
///
/// Panics if `capacity` is zero, mirroring [`tokio::sync::mpsc::channel`].
#[must_use]
pub fn body_channel(capacity: usize) -> (mpsc::Sender<Result<Bytes, io::Error>>, BodyStream) {
    let (tx, rx) = mpsc::channel(capacity);
    let stream = tokio_stream::wrappers::ReceiverStream::new(rx);
    (tx, Box::pin(stream))
}

/// [`AsyncRead`] view of a [`BodyStream`], the source type a
/// [`BodyDemux`](crate::BodyDemux) drains.
pub struct BodyReader {
    inner: StreamReader<BodyStream, Bytes>,
}

impl BodyReader {
    /// Wrap `stream` for draining.
    #[must_use]
    pub fn new(stream: BodyStream) -> Self {
        Self {
            inner: StreamReader::new(stream),
        }
    }

    /// Recover the stream, dropping any chunk remainder already pulled from it.
    #[must_use]
    pub fn into_inner(self) -> BodyStream { self.inner.into_inner() }
}

impl AsyncRead for BodyReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl From<BodyStream> for BodyReader {
    fn from(stream: BodyStream) -> Self { Self::new(stream) }
}
