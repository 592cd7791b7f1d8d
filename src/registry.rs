//! Per-invocation registry of expected body fields.
//!
//! The binding layer declares every field it intends to read, together with
//! the Rust type it will be read as. The first declaration fixes the
//! invocation the registry belongs to; later declarations from the same
//! invocation are no-ops, and declarations from any other invocation are
//! rejected.

use std::{
    any::{TypeId, type_name},
    collections::{HashMap, hash_map::Entry},
    fmt,
    sync::{PoisonError, RwLock},
};

use crate::error::ContractError;

/// Identifier of one logical invocation (for example, one request).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvocationId(String);

impl InvocationId {
    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for InvocationId {
    fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl From<String> for InvocationId {
    fn from(value: String) -> Self { Self(value) }
}

impl fmt::Display for InvocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Handle naming the Rust type a field is bound to.
///
/// Two handles are equal when they name the same type.
///
/// # Examples
///
/// ```
/// use bodyfield::TargetType;
///
/// assert_eq!(TargetType::of::<u32>(), TargetType::of::<u32>());
/// assert_ne!(TargetType::of::<u32>(), TargetType::of::<i32>());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    /// Handle for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Rust type name, for diagnostics only.
    #[must_use]
    pub fn name(&self) -> &'static str { self.name }

    /// Returns true if this handle names `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool { self.id == TypeId::of::<T>() }
}

impl PartialEq for TargetType {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for TargetType {}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name) }
}

/// A named field and the type it is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    target: TargetType,
}

impl FieldDescriptor {
    /// Describe a field called `name` bound to `T`.
    #[must_use]
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self::new(name, TargetType::of::<T>())
    }

    /// Describe a field from an existing type handle.
    #[must_use]
    pub fn new(name: impl Into<String>, target: TargetType) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// Field name (case-sensitive).
    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Declared type.
    #[must_use]
    pub fn target(&self) -> TargetType { self.target }
}

#[derive(Debug)]
struct Registered {
    invocation: InvocationId,
    fields: HashMap<String, FieldDescriptor>,
}

/// One-shot registry of the fields an invocation expects.
///
/// The registry is shared by reference between every field read of one
/// invocation; all methods take `&self`.
///
/// # Examples
///
/// ```
/// use bodyfield::{FieldDescriptor, FieldRegistry};
///
/// let registry = FieldRegistry::new();
/// registry
///     .initialize("req-1", [
///         FieldDescriptor::of::<i64>("x"),
///         FieldDescriptor::of::<i64>("y"),
///     ])
///     .expect("first initialization succeeds");
/// // A second binder of the same invocation re-declares; nothing changes.
/// registry
///     .initialize("req-1", [FieldDescriptor::of::<i64>("x")])
///     .expect("same invocation is idempotent");
/// assert!(registry.contains("y"));
/// assert!(registry.initialize("req-2", []).is_err());
/// ```
#[derive(Debug, Default)]
pub struct FieldRegistry {
    state: RwLock<Option<Registered>>,
}

impl FieldRegistry {
    /// Create an empty, uninitialized registry.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Record the fields for `invocation`.
    ///
    /// Only the first successful call has an effect. Duplicate names with the
    /// same type are merged.
    ///
    /// # Errors
    ///
    /// - [`ContractError::InvocationMismatch`] if the registry already belongs to another
    ///   invocation.
    /// - [`ContractError::ConflictingFieldType`] if one name is declared with two types; the
    ///   registry stays uninitialized.
    pub fn initialize<I, F>(&self, invocation: I, fields: F) -> Result<(), ContractError>
    where
        I: Into<InvocationId>,
        F: IntoIterator<Item = FieldDescriptor>,
    {
        let invocation = invocation.into();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = state.as_ref() {
            if existing.invocation == invocation {
                return Ok(());
            }
            return Err(ContractError::InvocationMismatch {
                expected: existing.invocation.to_string(),
                found: invocation.to_string(),
            });
        }

        let mut collected: HashMap<String, FieldDescriptor> = HashMap::new();
        for descriptor in fields {
            match collected.entry(descriptor.name.clone()) {
                Entry::Occupied(entry) => {
                    let existing = entry.get().target;
                    if existing != descriptor.target {
                        return Err(ContractError::ConflictingFieldType {
                            name: descriptor.name,
                            existing: existing.name(),
                            requested: descriptor.target.name(),
                        });
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(descriptor);
                }
            }
        }

        log::debug!(
            "field registry initialized: invocation={invocation}, fields={}",
            collected.len()
        );
        *state = Some(Registered {
            invocation,
            fields: collected,
        });
        Ok(())
    }

    /// Returns true once [`Self::initialize`] has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Invocation the registry belongs to, if initialized.
    #[must_use]
    pub fn invocation_id(&self) -> Option<InvocationId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|registered| registered.invocation.clone())
    }

    /// Look up the descriptor for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractError::NotInitialized`] before initialization and
    /// [`ContractError::UnknownField`] for names that were never declared.
    pub fn descriptor(&self, name: &str) -> Result<FieldDescriptor, ContractError> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let registered = state.as_ref().ok_or(ContractError::NotInitialized)?;
        registered
            .fields
            .get(name)
            .cloned()
            .ok_or_else(|| ContractError::UnknownField {
                name: name.to_owned(),
            })
    }

    /// Returns true if `name` was declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|registered| registered.fields.contains_key(name))
    }

    /// Number of distinct declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |registered| registered.fields.len())
    }

    /// Returns true if no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn registry() -> FieldRegistry { FieldRegistry::new() }

    #[rstest]
    fn duplicates_with_same_type_are_merged(registry: FieldRegistry) {
        registry
            .initialize("a", [
                FieldDescriptor::of::<String>("name"),
                FieldDescriptor::of::<String>("name"),
            ])
            .expect("same-type duplicates are accepted");
        assert_eq!(registry.len(), 1);
    }

    #[rstest]
    fn duplicates_with_different_types_are_rejected(registry: FieldRegistry) {
        let err = registry
            .initialize("a", [
                FieldDescriptor::of::<String>("name"),
                FieldDescriptor::of::<u8>("name"),
            ])
            .expect_err("conflicting types must fail");
        assert!(matches!(err, ContractError::ConflictingFieldType { ref name, .. } if name == "name"));
        assert!(!registry.is_initialized());
    }

    #[rstest]
    fn reinitialization_with_same_id_is_a_no_op(registry: FieldRegistry) {
        registry
            .initialize("a", [FieldDescriptor::of::<u8>("x")])
            .expect("first call");
        registry
            .initialize("a", [FieldDescriptor::of::<String>("x")])
            .expect("second call ignored");
        let descriptor = registry.descriptor("x").expect("x is declared");
        assert!(descriptor.target().is::<u8>());
    }

    #[rstest]
    fn other_invocation_is_rejected(registry: FieldRegistry) {
        registry.initialize("a", []).expect("first call");
        let err = registry.initialize("b", []).expect_err("mismatch");
        assert_eq!(err, ContractError::InvocationMismatch {
            expected: "a".to_owned(),
            found: "b".to_owned(),
        });
    }

    #[rstest]
    fn lookups_before_initialization_fail(registry: FieldRegistry) {
        assert_eq!(
            registry.descriptor("x"),
            Err(ContractError::NotInitialized)
        );
        assert!(registry.invocation_id().is_none());
        assert!(!registry.contains("x"));
    }

    #[rstest]
    fn unknown_names_are_reported(registry: FieldRegistry) {
        registry.initialize("a", []).expect("first call");
        assert_eq!(
            registry.descriptor("Missing"),
            Err(ContractError::UnknownField {
                name: "Missing".to_owned()
            })
        );
    }

    #[rstest]
    fn names_are_case_sensitive(registry: FieldRegistry) {
        registry
            .initialize("a", [FieldDescriptor::of::<u8>("x")])
            .expect("first call");
        assert!(registry.contains("x"));
        assert!(!registry.contains("X"));
    }
}
