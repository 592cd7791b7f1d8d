//! Binding body fields to handler parameters.
//!
//! An [`Invocation`] bundles the demultiplexer of one logical request with
//! that request's identifier. Each parameter binder declares the full field
//! set (the first declaration wins, later ones from the same invocation are
//! no-ops) and then binds its own field, in any order.
//!
//! ```
//! use bodyfield::{BodyField, Invocation};
//!
//! const X: BodyField<i64> = BodyField::new("x");
//! const Y: BodyField<i64> = BodyField::new("y");
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), bodyfield::BindError> {
//! let invocation = Invocation::new("multiply-7", br#"{"x": 6, "y": 7}"#.as_slice());
//!
//! // Each binder declares the same set; only the first call records it.
//! invocation.declare([X.descriptor(), Y.descriptor()])?;
//! let y = Y.read_required(&invocation).await?;
//! invocation.declare([X.descriptor(), Y.descriptor()])?;
//! let x = X.read_required(&invocation).await?;
//!
//! assert_eq!(x * y, 42);
//! # Ok(())
//! # }
//! ```

use std::{fmt, marker::PhantomData, sync::Arc};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::{
    config::DemuxConfig,
    demux::{BodyDemux, FieldRead},
    deserializer::{FieldDeserializer, JsonDeserializer},
    error::{ContractError, FieldError, ReadError, StructuralError},
    registry::{FieldDescriptor, InvocationId},
};

/// Error returned when a field cannot be bound.
#[derive(Debug, Error)]
pub enum BindError {
    /// The body failed as a whole.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// The binder misused the registry or demultiplexer.
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// The field's value did not deserialize.
    #[error(transparent)]
    Invalid(#[from] FieldError),
    /// A required field was absent from the body (or `null`).
    #[error("required field '{name}' is missing from the body")]
    Missing {
        /// Field name.
        name: String,
    },
}

impl From<ReadError> for BindError {
    fn from(error: ReadError) -> Self {
        match error {
            ReadError::Structural(error) => Self::Structural(error),
            ReadError::Contract(error) => Self::Contract(error),
        }
    }
}

/// The body of one logical request, shared by all of its field binders.
pub struct Invocation<R, D = JsonDeserializer> {
    id: InvocationId,
    demux: Arc<BodyDemux<R, D>>,
}

impl<R, D> Clone for Invocation<R, D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            demux: Arc::clone(&self.demux),
        }
    }
}

impl<R, D> fmt::Debug for Invocation<R, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation").field("id", &self.id).finish_non_exhaustive()
    }
}

impl<R> Invocation<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create an invocation reading `source` with the default configuration.
    #[must_use]
    pub fn new(id: impl Into<InvocationId>, source: R) -> Self {
        Self::with_config(id, source, DemuxConfig::default())
    }

    /// Create an invocation with an explicit configuration.
    #[must_use]
    pub fn with_config(id: impl Into<InvocationId>, source: R, config: DemuxConfig) -> Self {
        Self::from_demux(id, Arc::new(BodyDemux::with_config(source, config)))
    }
}

impl<R, D> Invocation<R, D>
where
    R: AsyncRead + Unpin + Send,
    D: FieldDeserializer,
{
    /// Wrap an existing demultiplexer.
    #[must_use]
    pub fn from_demux(id: impl Into<InvocationId>, demux: Arc<BodyDemux<R, D>>) -> Self {
        Self {
            id: id.into(),
            demux,
        }
    }

    /// Identifier of this invocation.
    #[must_use]
    pub fn id(&self) -> &InvocationId { &self.id }

    /// The shared demultiplexer.
    #[must_use]
    pub fn demux(&self) -> &Arc<BodyDemux<R, D>> { &self.demux }

    /// Declare the fields this invocation's binders read.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Contract`] if the registry rejects the set.
    pub fn declare<F>(&self, fields: F) -> Result<(), BindError>
    where
        F: IntoIterator<Item = FieldDescriptor>,
    {
        self.demux.initialize(self.id.clone(), fields)?;
        Ok(())
    }

    /// Bind `name` as `T`, yielding `None` when the body has no value for it.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::Invalid`] if the value does not deserialize, and
    /// the structural or contract cause if the field cannot be read at all.
    pub async fn bind<T>(&self, name: &str) -> Result<Option<T>, BindError>
    where
        T: DeserializeOwned + 'static,
    {
        Ok(self.demux.read_field::<T>(name).await?.into_result()?)
    }

    /// Bind `name` as `T`, failing when the body has no value for it.
    ///
    /// # Errors
    ///
    /// As [`Self::bind`], plus [`BindError::Missing`] for an absent field.
    pub async fn bind_required<T>(&self, name: &str) -> Result<T, BindError>
    where
        T: DeserializeOwned + 'static,
    {
        match self.demux.read_field::<T>(name).await? {
            FieldRead::Value(value) => Ok(value),
            FieldRead::NoValue => Err(BindError::Missing {
                name: name.to_owned(),
            }),
            FieldRead::Invalid(error) => Err(error.into()),
        }
    }
}

/// A typed handle for one body field.
///
/// `BodyField` ties a field name to the Rust type it is read as, so a
/// binder cannot declare one type and read another.
pub struct BodyField<T> {
    name: &'static str,
    target: PhantomData<fn() -> T>,
}

impl<T> Clone for BodyField<T> {
    fn clone(&self) -> Self { *self }
}

impl<T> Copy for BodyField<T> {}

impl<T> fmt::Debug for BodyField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyField")
            .field("name", &self.name)
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> BodyField<T>
where
    T: DeserializeOwned + 'static,
{
    /// Handle for the field called `name`.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            target: PhantomData,
        }
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &'static str { self.name }

    /// Registry descriptor for this field.
    #[must_use]
    pub fn descriptor(&self) -> FieldDescriptor { FieldDescriptor::of::<T>(self.name) }

    /// Bind this field within `invocation`. See [`Invocation::bind`].
    ///
    /// # Errors
    ///
    /// As [`Invocation::bind`].
    pub async fn read<R, D>(&self, invocation: &Invocation<R, D>) -> Result<Option<T>, BindError>
    where
        R: AsyncRead + Unpin + Send,
        D: FieldDeserializer,
    {
        invocation.bind::<T>(self.name).await
    }

    /// Bind this field as required. See [`Invocation::bind_required`].
    ///
    /// # Errors
    ///
    /// As [`Invocation::bind_required`].
    pub async fn read_required<R, D>(&self, invocation: &Invocation<R, D>) -> Result<T, BindError>
    where
        R: AsyncRead + Unpin + Send,
        D: FieldDeserializer,
    {
        invocation.bind_required::<T>(self.name).await
    }
}

impl<T> From<BodyField<T>> for FieldDescriptor
where
    T: DeserializeOwned + 'static,
{
    fn from(field: BodyField<T>) -> Self { field.descriptor() }
}
