//! Shared fixtures for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use bodyfield::FieldDescriptor;
use rstest::fixture;
use serde::Deserialize;

/// Body with nested, scalar and `null` properties.
pub const EXAMPLE_BODY: &[u8] = br#"{"a": {"x":1,"y":[1,2,{"z":true}]}, "b": "hello", "c": null}"#;

/// Typed shape of property `a` in [`EXAMPLE_BODY`].
#[derive(Debug, Deserialize, PartialEq)]
pub struct Nested {
    pub x: i64,
    pub y: Vec<serde_json::Value>,
}

/// Declarations matching [`EXAMPLE_BODY`] plus an undeclared-in-body `d`.
#[fixture]
pub fn example_fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::of::<Nested>("a"),
        FieldDescriptor::of::<String>("b"),
        FieldDescriptor::of::<Option<String>>("c"),
        FieldDescriptor::of::<i32>("d"),
    ]
}
