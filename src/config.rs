//! Demultiplexer configuration.
//!
//! [`DemuxConfig`] controls buffer sizing, body limits and the policies that
//! decide how `null` values, comments, empty bodies and undeclared properties
//! are treated.

use std::num::NonZeroUsize;

/// Smallest buffer the drain will allocate.
///
/// Initial buffer sizes are clamped to at least this value.
pub const MIN_BUFFER_SIZE: usize = 64;

/// Default initial buffer size (4 KiB).
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 4 * 1024;

/// Default ceiling for the drain buffer (16 MiB).
///
/// A single token (for example, one long string) larger than this fails the
/// body with [`crate::StructuralError::BodyTooLarge`].
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// How a property whose value is JSON `null` is reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NullPolicy {
    /// `null` is not a value: the read reports [`crate::FieldRead::NoValue`].
    #[default]
    NoValue,
    /// `null` is handed to the deserializer like any other value, so an
    /// `Option<T>` field reads as `Value(None)` and a non-nullable type fails.
    Deserialize,
}

/// What to do with a body property the registry never declared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UndeclaredPolicy {
    /// Capture it like any other property; it is simply never read.
    #[default]
    Capture,
    /// Fail the body with [`crate::StructuralError::UndeclaredProperty`].
    Reject,
}

/// Configuration for a [`crate::BodyDemux`].
///
/// # Examples
///
/// ```
/// use bodyfield::{DemuxConfig, NullPolicy};
///
/// let config = DemuxConfig::default()
///     .initial_buffer_size(1024)
///     .null_policy(NullPolicy::Deserialize);
/// assert_eq!(config.initial_buffer_len(), 1024);
/// assert_eq!(config.null_handling(), NullPolicy::Deserialize);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DemuxConfig {
    initial_buffer_size: NonZeroUsize,
    max_buffer_size: NonZeroUsize,
    max_body_size: Option<NonZeroUsize>,
    null_policy: NullPolicy,
    undeclared: UndeclaredPolicy,
    allow_comments: bool,
    allow_empty_body: bool,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            initial_buffer_size: non_zero(DEFAULT_INITIAL_BUFFER_SIZE),
            max_buffer_size: non_zero(DEFAULT_MAX_BUFFER_SIZE),
            max_body_size: None,
            null_policy: NullPolicy::default(),
            undeclared: UndeclaredPolicy::default(),
            allow_comments: true,
            allow_empty_body: false,
        }
    }
}

fn non_zero(value: usize) -> NonZeroUsize { NonZeroUsize::new(value).unwrap_or(NonZeroUsize::MIN) }

impl DemuxConfig {
    /// Set the size of the first buffer allocated by the drain.
    ///
    /// Values below [`MIN_BUFFER_SIZE`] are raised to it; values above the
    /// maximum buffer size are lowered to it.
    #[must_use]
    pub fn initial_buffer_size(mut self, size: usize) -> Self {
        let size = size.clamp(MIN_BUFFER_SIZE, self.max_buffer_size.get().max(MIN_BUFFER_SIZE));
        self.initial_buffer_size = non_zero(size);
        self
    }

    /// Set the largest buffer the drain may grow to.
    ///
    /// The initial size is lowered if it would exceed the new maximum.
    #[must_use]
    pub fn max_buffer_size(mut self, size: usize) -> Self {
        let size = size.max(MIN_BUFFER_SIZE);
        self.max_buffer_size = non_zero(size);
        if self.initial_buffer_size.get() > size {
            self.initial_buffer_size = self.max_buffer_size;
        }
        self
    }

    /// Cap the total number of body bytes read, or `None` for no cap.
    #[must_use]
    pub fn max_body_size(mut self, limit: Option<NonZeroUsize>) -> Self {
        self.max_body_size = limit;
        self
    }

    /// Choose how `null` property values are reported.
    #[must_use]
    pub fn null_policy(mut self, policy: NullPolicy) -> Self {
        self.null_policy = policy;
        self
    }

    /// Choose how properties absent from the registry are treated.
    #[must_use]
    pub fn undeclared_properties(mut self, policy: UndeclaredPolicy) -> Self {
        self.undeclared = policy;
        self
    }

    /// Accept `//` and `/* */` comments between tokens.
    #[must_use]
    pub fn allow_comments(mut self, allow: bool) -> Self {
        self.allow_comments = allow;
        self
    }

    /// Treat an empty or whitespace-only body as an object with no
    /// properties instead of failing with [`crate::StructuralError::EmptyBody`].
    #[must_use]
    pub fn allow_empty_body(mut self, allow: bool) -> Self {
        self.allow_empty_body = allow;
        self
    }

    /// Size of the first drain buffer.
    #[must_use]
    pub fn initial_buffer_len(&self) -> usize { self.initial_buffer_size.get() }

    /// Largest drain buffer.
    #[must_use]
    pub fn max_buffer_len(&self) -> NonZeroUsize { self.max_buffer_size }

    /// Total body cap, if any.
    #[must_use]
    pub fn body_limit(&self) -> Option<NonZeroUsize> { self.max_body_size }

    /// Configured null policy.
    #[must_use]
    pub fn null_handling(&self) -> NullPolicy { self.null_policy }

    /// Configured undeclared property policy.
    #[must_use]
    pub fn undeclared_handling(&self) -> UndeclaredPolicy { self.undeclared }

    /// Whether comments are accepted.
    #[must_use]
    pub fn comments_allowed(&self) -> bool { self.allow_comments }

    /// Whether an empty body is accepted.
    #[must_use]
    pub fn empty_body_allowed(&self) -> bool { self.allow_empty_body }
}
