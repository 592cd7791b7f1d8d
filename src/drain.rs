//! One-time drain of a body reader through the [`Splitter`].
//!
//! The drain owns a single growable buffer. Every read lands in the free
//! tail; the splitter is then shown the whole unconsumed window. Bytes the
//! splitter has finished with are compacted away, and the buffer doubles
//! only when the unconsumed tail (one partial token) occupies more than half
//! of it.

use std::num::NonZeroUsize;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    config::DemuxConfig,
    error::StructuralError,
    splitter::Splitter,
    store::CompletedFields,
};

/// Byte window shared between reads and the splitter.
#[derive(Debug)]
struct DrainBuffer {
    buf: Vec<u8>,
    filled: usize,
    max: NonZeroUsize,
}

impl DrainBuffer {
    fn new(initial: usize, max: NonZeroUsize) -> Self {
        Self {
            buf: vec![0; initial.clamp(1, max.get())],
            filled: 0,
            max,
        }
    }

    fn window(&self) -> &[u8] { &self.buf[..self.filled] }

    fn spare(&mut self) -> &mut [u8] { &mut self.buf[self.filled..] }

    fn capacity(&self) -> usize { self.buf.len() }

    /// Drop the first `consumed` bytes and make room for the next read.
    ///
    /// Returns true if the buffer grew.
    fn release(&mut self, consumed: usize) -> Result<bool, StructuralError> {
        let consumed = consumed.min(self.filled);
        self.buf.copy_within(consumed..self.filled, 0);
        self.filled -= consumed;

        let len = self.buf.len();
        if self.filled.saturating_mul(2) <= len {
            return Ok(false);
        }
        if len < self.max.get() {
            self.buf.resize(len.saturating_mul(2).min(self.max.get()), 0);
            return Ok(true);
        }
        if self.filled == len {
            return Err(StructuralError::BodyTooLarge {
                attempted: len.saturating_add(1),
                limit: self.max,
            });
        }
        Ok(false)
    }
}

/// Read `reader` to its end and split the body into raw property values.
///
/// # Errors
///
/// Returns a [`StructuralError`] if the body is malformed, exceeds a
/// configured limit, or the reader fails.
pub(crate) async fn drain<R>(
    reader: &mut R,
    config: &DemuxConfig,
) -> Result<CompletedFields, StructuralError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    match drain_inner(reader, config).await {
        Err(StructuralError::EmptyBody) if config.empty_body_allowed() => {
            tracing::debug!("empty body accepted as an object with no properties");
            Ok(CompletedFields::default())
        }
        other => other,
    }
}

async fn drain_inner<R>(
    reader: &mut R,
    config: &DemuxConfig,
) -> Result<CompletedFields, StructuralError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut splitter = Splitter::new(config.comments_allowed());
    let mut buffer = DrainBuffer::new(config.initial_buffer_len(), config.max_buffer_len());
    let mut total = 0usize;

    loop {
        let read = reader.read(buffer.spare()).await?;
        total = total.saturating_add(read);
        if let Some(limit) = config.body_limit()
            && total > limit.get()
        {
            return Err(StructuralError::BodyTooLarge {
                attempted: total,
                limit,
            });
        }
        buffer.filled += read;

        let eof = read == 0;
        let result = splitter.feed(buffer.window(), eof)?;
        if result.completed {
            let fields = splitter.into_fields();
            tracing::debug!(
                bytes = total,
                fields = fields.len(),
                buffer = buffer.capacity(),
                "body drained"
            );
            return Ok(fields);
        }
        if eof {
            return Err(StructuralError::TruncatedBody { received: total });
        }

        let before = buffer.capacity();
        if buffer.release(result.consumed)? {
            crate::metrics::inc_buffer_growths();
            tracing::debug!(from = before, to = buffer.capacity(), "drain buffer grown");
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn max(size: usize) -> NonZeroUsize { NonZeroUsize::new(size).expect("non-zero") }

    #[test]
    fn release_compacts_small_tails_in_place() {
        let mut buffer = DrainBuffer::new(8, max(64));
        buffer.spare()[..6].copy_from_slice(b"abcdef");
        buffer.filled = 6;
        assert!(!buffer.release(4).expect("compacts"));
        assert_eq!(buffer.window(), b"ef");
        assert_eq!(buffer.capacity(), 8);
    }

    #[test]
    fn release_doubles_when_tail_exceeds_half() {
        let mut buffer = DrainBuffer::new(8, max(64));
        buffer.spare().copy_from_slice(b"abcdefgh");
        buffer.filled = 8;
        assert!(buffer.release(2).expect("grows"));
        assert_eq!(buffer.window(), b"cdefgh");
        assert_eq!(buffer.capacity(), 16);
    }

    #[test]
    fn release_growth_is_capped_at_maximum() {
        let mut buffer = DrainBuffer::new(48, max(64));
        buffer.filled = 48;
        assert!(buffer.release(0).expect("grows"));
        assert_eq!(buffer.capacity(), 64);
    }

    #[test]
    fn full_maximum_buffer_is_too_large() {
        let mut buffer = DrainBuffer::new(64, max(64));
        buffer.filled = 64;
        assert_eq!(
            buffer.release(0),
            Err(StructuralError::BodyTooLarge {
                attempted: 65,
                limit: max(64),
            })
        );
    }

    #[rstest]
    #[case(64)]
    #[case(4096)]
    #[tokio::test]
    async fn drains_body_from_reader(#[case] initial: usize) {
        let body = br#"{"a": {"x":1,"y":[1,2,{"z":true}]}, "b": "hello", "c": null}"#;
        let config = DemuxConfig::default().initial_buffer_size(initial);
        let fields = drain(&mut body.as_slice(), &config).await.expect("drained");
        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields.get("b").map(|raw| raw.as_bytes()),
            Some(br#""hello""#.as_slice())
        );
    }

    #[tokio::test]
    async fn long_token_grows_buffer() {
        let text = "y".repeat(1_000);
        let body = format!(r#"{{"long": "{text}"}}"#);
        let config = DemuxConfig::default().initial_buffer_size(64);
        let fields = drain(&mut body.as_bytes(), &config).await.expect("drained");
        assert_eq!(fields.get("long").map(|raw| raw.len()), Some(1_002));
    }

    #[tokio::test]
    async fn token_larger_than_maximum_buffer_is_rejected() {
        let body = format!(r#"{{"long": "{}"}}"#, "z".repeat(500));
        let config = DemuxConfig::default()
            .initial_buffer_size(64)
            .max_buffer_size(128);
        let err = drain(&mut body.as_bytes(), &config)
            .await
            .expect_err("token exceeds buffer");
        assert!(matches!(err, StructuralError::BodyTooLarge { limit, .. } if limit.get() == 128));
    }

    #[tokio::test]
    async fn total_body_limit_is_enforced() {
        let body = br#"{"a": 1, "b": 2, "c": 3}"#;
        let config = DemuxConfig::default().max_body_size(NonZeroUsize::new(10));
        let err = drain(&mut body.as_slice(), &config)
            .await
            .expect_err("body exceeds limit");
        assert!(matches!(err, StructuralError::BodyTooLarge { limit, .. } if limit.get() == 10));
    }

    #[rstest]
    #[case(false, Err(StructuralError::EmptyBody))]
    #[case(true, Ok(0))]
    #[tokio::test]
    async fn empty_body_follows_configuration(
        #[case] allow: bool,
        #[case] expected: Result<usize, StructuralError>,
    ) {
        let config = DemuxConfig::default().allow_empty_body(allow);
        let result = drain(&mut b"  \n".as_slice(), &config).await;
        assert_eq!(result.map(|fields| fields.len()), expected);
    }

    #[tokio::test]
    async fn truncated_reader_is_reported() {
        let body = br#"{"a": [1, 2"#;
        let err = drain(&mut body.as_slice(), &DemuxConfig::default())
            .await
            .expect_err("truncated");
        assert_eq!(err, StructuralError::TruncatedBody {
            received: body.len()
        });
    }
}
