//! Error taxonomy for body field demultiplexing.
//!
//! Failures fall into three groups with different blast radii:
//!
//! - [`StructuralError`]: the body itself is unusable (wrong root shape, duplicate property, trailing
//!   bytes, truncation, size limits, I/O). Fatal for the whole invocation and cached, since the
//!   stream cannot be read again.
//! - [`FieldError`]: one field's raw bytes do not deserialize into the declared type. Local to
//!   that field.
//! - [`ContractError`]: the binding layer misused the registry or demultiplexer. These are
//!   programming errors and are never caused by request data.
//!
//! [`ReadError`] is what a field read returns when it cannot produce a per-field outcome at all.

use std::{error::Error, io, num::NonZeroUsize};

use thiserror::Error;

use crate::lexer::TokenKind;

/// Reason a token or token sequence was rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SyntaxError {
    /// A byte that cannot start any JSON token.
    #[error("unexpected byte 0x{0:02x}")]
    UnexpectedByte(u8),
    /// A `true`, `false` or `null` literal was misspelt.
    #[error("invalid literal")]
    InvalidLiteral,
    /// A number does not follow the JSON number grammar.
    #[error("invalid number")]
    InvalidNumber,
    /// An unknown escape sequence or a malformed `\u` escape.
    #[error("invalid escape sequence in string")]
    InvalidEscape,
    /// An unescaped control character inside a string.
    #[error("control character 0x{0:02x} in string")]
    ControlCharacter(u8),
    /// A property name that could not be decoded as a UTF-8 string.
    #[error("property name is not a valid string")]
    InvalidPropertyName,
    /// A well-formed token in a position the grammar does not allow.
    #[error("unexpected {found}, expected {expected}")]
    UnexpectedToken {
        /// Token that was found.
        found: TokenKind,
        /// Human readable description of what was allowed.
        expected: &'static str,
    },
    /// A closing bracket that does not match the innermost open one.
    #[error("mismatched {found}")]
    MismatchedBracket {
        /// The closing token that did not match.
        found: TokenKind,
    },
}

/// Errors that make the whole body unusable.
///
/// The value is `Clone` so that a single failure can be handed to every
/// pending and future field read of the invocation.
///
/// # Examples
///
/// ```
/// use bodyfield::StructuralError;
///
/// let err = StructuralError::DuplicateField {
///     name: "a".to_owned(),
/// };
/// assert_eq!(err.to_string(), "duplicate property 'a' in body");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StructuralError {
    /// The root value is not an object.
    #[error("body root must be an object, found {found} at offset {offset}")]
    UnexpectedRootShape {
        /// First token of the body.
        found: TokenKind,
        /// Absolute byte offset of that token.
        offset: usize,
    },
    /// The same top-level property name appeared twice.
    #[error("duplicate property '{name}' in body")]
    DuplicateField {
        /// The repeated property name.
        name: String,
    },
    /// Non-comment content after the root object closed.
    #[error("trailing content after root object at offset {offset}")]
    TrailingContent {
        /// Absolute byte offset of the first trailing token.
        offset: usize,
    },
    /// The stream ended before the root object closed.
    #[error("body truncated after {received} bytes")]
    TruncatedBody {
        /// Bytes received before end of stream.
        received: usize,
    },
    /// A single token outgrew the buffer limit, or the body outgrew the
    /// total size limit.
    #[error("body exceeds size limit: {attempted} bytes > {limit} bytes")]
    BodyTooLarge {
        /// Size that triggered the guard.
        attempted: usize,
        /// Configured cap.
        limit: NonZeroUsize,
    },
    /// The body contained no JSON tokens at all.
    #[error("body is empty")]
    EmptyBody,
    /// A property absent from the registry, rejected by configuration.
    #[error("undeclared property '{name}' in body")]
    UndeclaredProperty {
        /// Name of the property.
        name: String,
    },
    /// Malformed JSON.
    #[error("syntax error at offset {offset}: {reason}")]
    Syntax {
        /// Absolute byte offset of the offending token.
        offset: usize,
        /// What was wrong with it.
        reason: SyntaxError,
    },
    /// Reading the underlying stream failed.
    #[error("I/O error while reading body ({kind:?}): {message}")]
    Io {
        /// Kind of the original I/O error.
        kind: io::ErrorKind,
        /// Rendered message of the original I/O error.
        message: String,
    },
    /// A previous drain was cancelled after taking the stream.
    #[error("body drain was abandoned before completion")]
    DrainAbandoned,
}

impl From<io::Error> for StructuralError {
    fn from(error: io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Misuse of the registry or demultiplexer by the binding layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    /// The requested field was never declared in the registry.
    #[error("field '{name}' is not registered for this invocation")]
    UnknownField {
        /// Requested field name.
        name: String,
    },
    /// The registry was initialized for a different invocation.
    #[error("registry initialized for invocation '{expected}', not '{found}'")]
    InvocationMismatch {
        /// Invocation the registry belongs to.
        expected: String,
        /// Invocation supplied by the caller.
        found: String,
    },
    /// The same field name was declared with two different types.
    #[error("field '{name}' declared as both {existing} and {requested}")]
    ConflictingFieldType {
        /// Field name.
        name: String,
        /// Type recorded first.
        existing: &'static str,
        /// Type that conflicted with it.
        requested: &'static str,
    },
    /// A field was read as a type other than the one it was declared with.
    #[error("field '{name}' is declared as {declared}, but was read as {requested}")]
    TypeMismatch {
        /// Field name.
        name: String,
        /// Declared type.
        declared: &'static str,
        /// Type requested by the reader.
        requested: &'static str,
    },
    /// A field was read before the registry was initialized.
    #[error("field registry has not been initialized")]
    NotInitialized,
}

/// A field whose raw value could not be turned into its declared type.
#[derive(Debug, Error)]
pub enum FieldError {
    /// The deserializer rejected the raw bytes.
    #[error("failed to deserialize field '{field}': {source}")]
    Deserialize {
        /// Field name.
        field: String,
        /// Error reported by the deserializer.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl FieldError {
    /// Name of the field this error belongs to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Deserialize { field, .. } => field,
        }
    }
}

/// Error returned by a field read that has no per-field outcome.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReadError {
    /// The body failed as a whole.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// The caller misused the API.
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl ReadError {
    /// Returns the structural cause, if this is a structural failure.
    #[must_use]
    pub fn as_structural(&self) -> Option<&StructuralError> {
        match self {
            Self::Structural(error) => Some(error),
            Self::Contract(_) => None,
        }
    }

    /// Returns true if the error is a caller-contract violation.
    #[must_use]
    pub fn is_contract(&self) -> bool { matches!(self, Self::Contract(_)) }
}
