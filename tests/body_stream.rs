//! Demultiplexing bodies delivered as chunk streams.

use std::io;

use bodyfield::{
    BodyDemux,
    BodyReader,
    FieldDescriptor,
    StructuralError,
    body::DEFAULT_BODY_CHANNEL_CAPACITY,
    body_channel,
};
use bodyfield_testing::{TestResult, byte_chunks, read_value, stream_of};
use bytes::Bytes;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn stream_of_single_bytes_is_demultiplexed() -> TestResult {
    let body = br#"{"greeting": "hi", "count": 3}"#;
    let demux = BodyDemux::new(BodyReader::new(stream_of(byte_chunks(body))));
    demux.initialize("stream", [
        FieldDescriptor::of::<String>("greeting"),
        FieldDescriptor::of::<u32>("count"),
    ])?;

    assert_eq!(read_value!(demux, u32, "count"), 3);
    assert_eq!(read_value!(demux, String, "greeting"), "hi");
    Ok(())
}

#[rstest]
#[tokio::test]
async fn channel_body_is_read_while_sender_produces() -> TestResult {
    let (tx, stream) = body_channel(DEFAULT_BODY_CHANNEL_CAPACITY);
    let producer = tokio::spawn(async move {
        for part in [r#"{"items": ["#, r#"1, 2, "#, r#"3], "done": tr"#, "ue}"] {
            if tx.send(Ok(Bytes::from(part))).await.is_err() {
                break;
            }
        }
    });

    let demux = BodyDemux::new(BodyReader::from(stream));
    demux.initialize("channel", [
        FieldDescriptor::of::<Vec<u8>>("items"),
        FieldDescriptor::of::<bool>("done"),
    ])?;
    assert_eq!(read_value!(demux, Vec<u8>, "items"), vec![1, 2, 3]);
    assert!(read_value!(demux, bool, "done"));
    producer.await?;
    Ok(())
}

#[rstest]
#[tokio::test]
async fn stream_error_becomes_structural_io_error() -> TestResult {
    let (tx, stream) = body_channel(2);
    tx.send(Ok(Bytes::from_static(b"{\"a\": "))).await?;
    tx.send(Err(io::Error::new(io::ErrorKind::TimedOut, "client stalled")))
        .await?;
    drop(tx);

    let demux = BodyDemux::new(BodyReader::new(stream));
    demux.initialize("timeout", [FieldDescriptor::of::<u8>("a")])?;
    let err = demux.read_raw("a").await.expect_err("stream failed");
    assert!(matches!(
        err.as_structural(),
        Some(StructuralError::Io { kind: io::ErrorKind::TimedOut, .. })
    ));
    Ok(())
}

#[rstest]
#[tokio::test]
async fn closed_channel_mid_body_is_truncation() -> TestResult {
    let (tx, stream) = body_channel(1);
    tx.send(Ok(Bytes::from_static(b"{\"a\": [1"))).await?;
    drop(tx);

    let demux = BodyDemux::new(BodyReader::new(stream));
    demux.initialize("short", [FieldDescriptor::of::<Vec<u8>>("a")])?;
    let err = demux.read_raw("a").await.expect_err("body ended early");
    assert_eq!(
        err.as_structural(),
        Some(&StructuralError::TruncatedBody { received: 8 })
    );
    Ok(())
}
