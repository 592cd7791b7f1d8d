#![doc(html_root_url = "https://docs.rs/bodyfield/latest")]
//! Public API for the `bodyfield` library.
//!
//! This crate reads a JSON object request body exactly once, in bounded
//! chunks, and delivers each top-level property to its own typed consumer on
//! demand. The pieces, leaves first:
//!
//! - [`FieldRegistry`]: the fields one invocation expects, and their types.
//! - [`Splitter`]: a resumable state machine that cuts a body into raw
//!   property values while skipping nested structure.
//! - [`BodyDemux`]: drains the body through the splitter once and answers
//!   every field read from the captured values.
//! - [`Invocation`] and [`BodyField`]: binding helpers for handler
//!   parameters.

pub mod binding;
pub mod body;
pub mod config;
pub mod demux;
pub mod deserializer;
mod drain;
pub mod error;
mod lexer;
pub mod metrics;
pub mod prelude;
pub mod registry;
pub mod splitter;
pub mod store;

pub use binding::{BindError, BodyField, Invocation};
pub use body::{BodyReader, BodyStream, body_channel};
pub use config::{DemuxConfig, NullPolicy, UndeclaredPolicy};
pub use demux::{BodyDemux, FieldRead};
pub use deserializer::{FieldDeserializer, JsonDeserializer};
pub use error::{ContractError, FieldError, ReadError, StructuralError, SyntaxError};
pub use lexer::TokenKind;
pub use registry::{FieldDescriptor, FieldRegistry, InvocationId, TargetType};
pub use splitter::{DrainResult, Splitter, split};
pub use store::{CompletedFields, RawFieldValue};
