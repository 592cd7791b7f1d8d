//! Assertion macros shared by integration tests.

/// Await a field read and return the value, panicking with contextual
/// diagnostics for any other outcome.
#[macro_export]
macro_rules! read_value {
    ($demux:expr, $ty:ty, $name:expr) => {{
        match $demux.read_field::<$ty>($name).await {
            Ok(::bodyfield::FieldRead::Value(value)) => value,
            other => panic!(
                "reading '{}' at {}:{} gave {:?}",
                $name,
                file!(),
                line!(),
                other
            ),
        }
    }};
}

/// Await a field read and panic unless it reports no value.
#[macro_export]
macro_rules! read_no_value {
    ($demux:expr, $ty:ty, $name:expr) => {{
        match $demux.read_field::<$ty>($name).await {
            Ok(::bodyfield::FieldRead::NoValue) => {}
            other => panic!(
                "expected no value for '{}' at {}:{}, got {:?}",
                $name,
                file!(),
                line!(),
                other
            ),
        }
    }};
}

pub use crate::{read_no_value, read_value};
