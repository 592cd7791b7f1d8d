//! Helpers for cutting a body into chunks.

use std::io;

use bodyfield::BodyStream;
use bytes::Bytes;

/// Split `body` into single-byte chunks.
#[must_use]
pub fn byte_chunks(body: &[u8]) -> Vec<Bytes> {
    body.iter().map(|&byte| Bytes::copy_from_slice(&[byte])).collect()
}

/// Split `body` at the given offsets.
///
/// Offsets are sorted and deduplicated first; offsets past the end are
/// ignored. No chunk is empty.
#[must_use]
pub fn chunks_at(body: &[u8], cuts: &[usize]) -> Vec<Bytes> {
    let mut cuts: Vec<usize> = cuts
        .iter()
        .copied()
        .filter(|&cut| cut > 0 && cut < body.len())
        .collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(body.len())) {
        if cut > start {
            chunks.push(Bytes::copy_from_slice(&body[start..cut]));
            start = cut;
        }
    }
    chunks
}

/// Wrap chunks as a [`BodyStream`].
#[must_use]
pub fn stream_of(chunks: Vec<Bytes>) -> BodyStream {
    Box::pin(futures::stream::iter(
        chunks.into_iter().map(Ok::<Bytes, io::Error>),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_at_ignores_out_of_range_and_repeated_cuts() {
        let chunks = chunks_at(b"abcdef", &[4, 2, 2, 0, 9]);
        assert_eq!(chunks, vec![
            Bytes::from_static(b"ab"),
            Bytes::from_static(b"cd"),
            Bytes::from_static(b"ef"),
        ]);
    }

    #[test]
    fn byte_chunks_are_single_bytes() {
        assert_eq!(byte_chunks(b"ab").len(), 2);
    }
}
