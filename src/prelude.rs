//! Optional convenience imports for common binding workflows.
//!
//! Prefer importing specialised APIs directly from their owning modules.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bodyfield::prelude::*;
//!
//! const NAME: BodyField<String> = BodyField::new("name");
//!
//! async fn greet(invocation: Invocation<BodyReader>) -> Result<String, BindError> {
//!     invocation.declare([NAME.descriptor()])?;
//!     Ok(format!("hello, {}", NAME.read_required(&invocation).await?))
//! }
//! ```

pub use crate::{
    binding::{BindError, BodyField, Invocation},
    body::{BodyReader, BodyStream, body_channel},
    config::DemuxConfig,
    demux::{BodyDemux, FieldRead},
    registry::FieldDescriptor,
};
