//! Field deserialization traits.
//!
//! This module defines the [`FieldDeserializer`] trait enabling applications
//! to plug in their own decoding of raw field values. A [`JsonDeserializer`]
//! backed by `serde_json` is provided as the default.

use std::error::Error;

use serde::de::DeserializeOwned;

/// Trait for turning one raw field value into a typed value.
///
/// The bytes handed to [`FieldDeserializer::deserialize`] are always the
/// complete JSON text of a single value.
///
/// # Object Safety
///
/// This trait is not object-safe because `deserialize` is generic. Use
/// concrete deserializer types in API bounds.
pub trait FieldDeserializer: Send + Sync {
    /// Deserialize `bytes` into a `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be parsed into a `T`.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, Box<dyn Error + Send + Sync>>
    where
        T: DeserializeOwned;
}

/// Deserializer using `serde_json`.
///
/// # Examples
///
/// ```
/// use bodyfield::{FieldDeserializer, JsonDeserializer};
///
/// let point: (i32, i32) = JsonDeserializer.deserialize(b"[1, 2]").expect("valid pair");
/// assert_eq!(point, (1, 2));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonDeserializer;

impl FieldDeserializer for JsonDeserializer {
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, Box<dyn Error + Send + Sync>>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(bytes).map_err(|error| Box::new(error) as Box<dyn Error + Send + Sync>)
    }
}
