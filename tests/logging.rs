//! Diagnostics emitted for structural, contract and field failures.

use bodyfield::{BodyDemux, FieldDescriptor};
use bodyfield_testing::{LoggerHandle, TestResult, logger};
use log::Level;
use rstest::rstest;
use serial_test::serial;

#[rstest]
#[tokio::test]
#[serial]
async fn structural_failure_is_logged_once(mut logger: LoggerHandle) -> TestResult {
    let demux = BodyDemux::new(br#"{"a": 1} 2"#.as_slice());
    demux.initialize("trailing", [FieldDescriptor::of::<u8>("a")])?;
    for _ in 0..3 {
        assert!(demux.read_raw("a").await.is_err());
    }

    let failures = logger
        .take_records()
        .into_iter()
        .filter(|(level, message)| {
            *level == Level::Warn && message.contains("body drain failed: invocation=trailing")
        })
        .count();
    assert_eq!(failures, 1);
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn contract_violation_is_logged_as_error(mut logger: LoggerHandle) -> TestResult {
    let demux = BodyDemux::new(br#"{"a": 1}"#.as_slice());
    demux.initialize("contract", [FieldDescriptor::of::<u8>("a")])?;
    assert!(demux.read_raw("b").await.is_err());

    assert!(logger.contains(
        Level::Error,
        "contract violation: invocation=contract, error=field 'b' is not registered"
    ));
    Ok(())
}

#[rstest]
#[tokio::test]
#[serial]
async fn invalid_field_is_logged_as_warning(mut logger: LoggerHandle) -> TestResult {
    let demux = BodyDemux::new(br#"{"a": "one"}"#.as_slice());
    demux.initialize("field", [FieldDescriptor::of::<u8>("a")])?;
    assert!(!demux.read_field::<u8>("a").await?.is_value());

    assert!(logger.contains(Level::Warn, "failed to deserialize field 'a'"));
    Ok(())
}

#[rstest]
#[serial]
fn registry_initialization_is_logged(mut logger: LoggerHandle) -> TestResult {
    let demux = BodyDemux::new(b"{}".as_slice());
    demux.initialize("declared", [
        FieldDescriptor::of::<u8>("a"),
        FieldDescriptor::of::<u8>("b"),
    ])?;

    assert!(logger.contains(
        Level::Debug,
        "field registry initialized: invocation=declared, fields=2"
    ));
    Ok(())
}
