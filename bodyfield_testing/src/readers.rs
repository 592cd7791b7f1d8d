//! Byte sources with controlled chunking and failure behaviour.

use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use bytes::{Buf, Bytes};
use tokio::io::{AsyncRead, ReadBuf};

/// Shared count of `poll_read` calls that produced a result.
#[derive(Clone, Debug, Default)]
pub struct ReadCounter(Arc<AtomicUsize>);

impl ReadCounter {
    /// Number of reads so far, including the final zero-length read.
    #[must_use]
    pub fn get(&self) -> usize { self.0.load(Ordering::SeqCst) }

    fn bump(&self) { self.0.fetch_add(1, Ordering::SeqCst); }
}

/// Reader that delivers a body in preset chunks, never more than one chunk
/// per read.
#[derive(Debug)]
pub struct ChunkedReader {
    chunks: VecDeque<Bytes>,
    reads: ReadCounter,
}

impl ChunkedReader {
    /// Deliver `body` in reads of at most `chunk` bytes (zero is treated as
    /// one).
    #[must_use]
    pub fn new(body: impl Into<Bytes>, chunk: usize) -> Self {
        let mut body = body.into();
        let chunk = chunk.max(1);
        let mut chunks = VecDeque::new();
        while !body.is_empty() {
            chunks.push_back(body.split_to(chunk.min(body.len())));
        }
        Self::from_chunks(chunks)
    }

    /// Deliver exactly the given chunks, one per read. Empty chunks are
    /// skipped since a zero-length read means end of stream.
    #[must_use]
    pub fn from_chunks<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Self {
            chunks: chunks.into_iter().filter(|chunk| !chunk.is_empty()).collect(),
            reads: ReadCounter::default(),
        }
    }

    /// Handle observing the number of reads performed.
    #[must_use]
    pub fn read_counter(&self) -> ReadCounter { self.reads.clone() }
}

impl AsyncRead for ChunkedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.reads.bump();
        if let Some(front) = self.chunks.front_mut() {
            let n = front.len().min(buf.remaining());
            buf.put_slice(&front[..n]);
            front.advance(n);
            if front.is_empty() {
                self.chunks.pop_front();
            }
        }
        Poll::Ready(Ok(()))
    }
}

/// Reader that delivers a prefix and then fails.
#[derive(Debug)]
pub struct FailingReader {
    prefix: ChunkedReader,
    kind: io::ErrorKind,
    message: &'static str,
}

impl FailingReader {
    /// Deliver `prefix` in one read, then fail every read with `kind`.
    #[must_use]
    pub fn new(prefix: impl Into<Bytes>, kind: io::ErrorKind, message: &'static str) -> Self {
        Self {
            prefix: ChunkedReader::from_chunks([prefix.into()]),
            kind,
            message,
        }
    }

    /// Handle observing the number of reads performed.
    #[must_use]
    pub fn read_counter(&self) -> ReadCounter { self.prefix.read_counter() }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.prefix.chunks.is_empty() {
            self.prefix.reads.bump();
            return Poll::Ready(Err(io::Error::new(self.kind, self.message)));
        }
        Pin::new(&mut self.prefix).poll_read(cx, buf)
    }
}

/// Reader that delivers a prefix and then never completes another read.
///
/// Useful for cancelling a drain mid-body.
#[derive(Debug)]
pub struct PendingReader {
    prefix: ChunkedReader,
}

impl PendingReader {
    /// Deliver `prefix` in one read, then stay pending forever.
    #[must_use]
    pub fn new(prefix: impl Into<Bytes>) -> Self {
        Self {
            prefix: ChunkedReader::from_chunks([prefix.into()]),
        }
    }

    /// Handle observing the number of completed reads.
    #[must_use]
    pub fn read_counter(&self) -> ReadCounter { self.prefix.read_counter() }
}

impl AsyncRead for PendingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.prefix.chunks.is_empty() {
            return Poll::Pending;
        }
        Pin::new(&mut self.prefix).poll_read(cx, buf)
    }
}
