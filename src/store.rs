//! Raw field values and the completed-fields store.

use std::collections::{HashMap, hash_map::Entry};

use bytes::Bytes;

use crate::error::StructuralError;

/// Exact JSON text of one top-level property value.
///
/// Nested objects and arrays are kept verbatim; comments inside the value are
/// removed.
///
/// # Examples
///
/// ```
/// use bodyfield::RawFieldValue;
///
/// let raw = RawFieldValue::from_static(br#"{"x":1}"#);
/// assert_eq!(raw.as_bytes(), br#"{"x":1}"#);
/// assert!(!raw.is_null());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFieldValue(Bytes);

impl RawFieldValue {
    /// Wrap bytes already known to hold one JSON value.
    #[must_use]
    pub fn new(bytes: Bytes) -> Self { Self(bytes) }

    /// Wrap a static byte string.
    #[must_use]
    pub fn from_static(bytes: &'static [u8]) -> Self { Self(Bytes::from_static(bytes)) }

    /// Borrow the raw bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.0 }

    /// Take the raw bytes.
    #[must_use]
    pub fn into_bytes(self) -> Bytes { self.0 }

    /// Returns true if the value is the literal `null`.
    #[must_use]
    pub fn is_null(&self) -> bool { self.0.as_ref() == b"null" }

    /// Length of the raw text in bytes.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Returns true if the raw text is empty. Values produced by a drain
    /// never are.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl AsRef<[u8]> for RawFieldValue {
    fn as_ref(&self) -> &[u8] { &self.0 }
}

/// Raw values of every top-level property found in one body.
///
/// Entries are only ever added; a name is never overwritten or removed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompletedFields {
    values: HashMap<String, RawFieldValue>,
    order: Vec<String>,
}

impl CompletedFields {
    /// Record `value` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::DuplicateField`] if `name` is already
    /// present.
    pub(crate) fn insert(&mut self, name: String, value: RawFieldValue) -> Result<(), StructuralError> {
        match self.values.entry(name) {
            Entry::Occupied(entry) => Err(StructuralError::DuplicateField {
                name: entry.key().clone(),
            }),
            Entry::Vacant(entry) => {
                self.order.push(entry.key().clone());
                entry.insert(value);
                Ok(())
            }
        }
    }

    /// Raw value for `name`, if the body contained it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RawFieldValue> { self.values.get(name) }

    /// Returns true if the body contained `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool { self.values.contains_key(name) }

    /// Property names in the order they appeared in the body.
    pub fn names(&self) -> impl Iterator<Item = &str> { self.order.iter().map(String::as_str) }

    /// Number of captured properties.
    #[must_use]
    pub fn len(&self) -> usize { self.values.len() }

    /// Returns true if the body object had no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicates_without_overwriting() {
        let mut fields = CompletedFields::default();
        fields
            .insert("a".to_owned(), RawFieldValue::from_static(b"1"))
            .expect("first insert");
        let err = fields
            .insert("a".to_owned(), RawFieldValue::from_static(b"2"))
            .expect_err("duplicate");
        assert_eq!(err, StructuralError::DuplicateField {
            name: "a".to_owned()
        });
        assert_eq!(fields.get("a").map(RawFieldValue::as_bytes), Some(b"1".as_slice()));
    }

    #[test]
    fn names_keep_body_order() {
        let mut fields = CompletedFields::default();
        for name in ["z", "a", "m"] {
            fields
                .insert(name.to_owned(), RawFieldValue::from_static(b"0"))
                .expect("unique names");
        }
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["z", "a", "m"]);
    }
}
