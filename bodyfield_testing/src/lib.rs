//! Test helpers for driving a [`BodyDemux`](bodyfield::BodyDemux) with
//! controlled byte sources.
//!
//! The readers here deliver a body in chosen chunk sizes, count how often
//! they are polled, fail on demand or stall forever, so that tests can
//! observe exactly how the demultiplexer consumes its input.
//!
//! ```rust
//! use bodyfield::{BodyDemux, FieldDescriptor};
//! use bodyfield_testing::ChunkedReader;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let reader = ChunkedReader::new(br#"{"a": [1, 2]}"#.as_slice(), 1);
//! let reads = reader.read_counter();
//! let demux = BodyDemux::new(reader);
//! demux
//!     .initialize("doc", [FieldDescriptor::of::<Vec<u8>>("a")])
//!     .expect("registry initialized");
//! let a = demux.read_field::<Vec<u8>>("a").await.expect("valid body");
//! assert_eq!(a.value(), Some(vec![1, 2]));
//! // One read per byte plus the final zero-length read.
//! assert_eq!(reads.get(), 14);
//! # }
//! ```

pub mod chunks;
pub mod logging;
pub mod macros;
pub mod metrics;
pub mod readers;

pub use chunks::{byte_chunks, chunks_at, stream_of};
pub use logging::{LoggerHandle, logger};
pub use metrics::{counter_value, debugging_recorder};
pub use readers::{ChunkedReader, FailingReader, PendingReader, ReadCounter};

/// Shared result type for integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
