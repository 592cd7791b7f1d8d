//! Per-invocation body demultiplexer.
//!
//! [`BodyDemux`] owns the body reader, the field registry and the completed
//! fields store of one invocation. The first field read drains the whole
//! body exactly once; every read, concurrent or later, is then answered from
//! the store. A structural failure is cached and handed to every reader.

use std::{
    any::type_name,
    sync::{Mutex, PoisonError},
};

use serde::de::DeserializeOwned;
use tokio::{io::AsyncRead, sync::OnceCell};

use crate::{
    config::{DemuxConfig, NullPolicy, UndeclaredPolicy},
    deserializer::{FieldDeserializer, JsonDeserializer},
    drain::drain,
    error::{ContractError, FieldError, ReadError, StructuralError},
    registry::{FieldDescriptor, FieldRegistry, InvocationId},
    store::{CompletedFields, RawFieldValue},
};

/// Outcome of reading one declared field.
#[derive(Debug)]
pub enum FieldRead<T> {
    /// The body contained the field and it deserialized.
    Value(T),
    /// The body did not contain the field (or it was `null` under
    /// [`NullPolicy::NoValue`]).
    NoValue,
    /// The body contained the field but its value did not deserialize.
    Invalid(FieldError),
}

impl<T> FieldRead<T> {
    /// Returns true for [`FieldRead::Value`].
    #[must_use]
    pub fn is_value(&self) -> bool { matches!(self, Self::Value(_)) }

    /// Returns true for [`FieldRead::NoValue`].
    #[must_use]
    pub fn is_no_value(&self) -> bool { matches!(self, Self::NoValue) }

    /// Returns the value, discarding the difference between absent and
    /// invalid.
    #[must_use]
    pub fn value(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::NoValue | Self::Invalid(_) => None,
        }
    }

    /// Convert into `Ok(Some(_))`, `Ok(None)` or the field error.
    ///
    /// # Errors
    ///
    /// Returns the [`FieldError`] of an invalid field.
    pub fn into_result(self) -> Result<Option<T>, FieldError> {
        match self {
            Self::Value(value) => Ok(Some(value)),
            Self::NoValue => Ok(None),
            Self::Invalid(error) => Err(error),
        }
    }
}

/// Body demultiplexer for one invocation.
///
/// Share it by reference (typically behind an [`std::sync::Arc`]) between
/// every consumer that binds a field of the same body.
///
/// # Examples
///
/// ```
/// use bodyfield::{BodyDemux, FieldDescriptor, FieldRead};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let body: &[u8] = br#"{"x": 6, "y": 7}"#;
/// let demux = BodyDemux::new(body);
/// demux
///     .initialize("multiply-1", [
///         FieldDescriptor::of::<i64>("x"),
///         FieldDescriptor::of::<i64>("y"),
///     ])
///     .expect("registry initialized");
///
/// let y = demux.read_field::<i64>("y").await.expect("body is valid");
/// let x = demux.read_field::<i64>("x").await.expect("body is valid");
/// assert!(matches!((x, y), (FieldRead::Value(6), FieldRead::Value(7))));
/// # }
/// ```
pub struct BodyDemux<R, D = JsonDeserializer> {
    registry: FieldRegistry,
    config: DemuxConfig,
    source: Mutex<Option<R>>,
    drained: OnceCell<Result<CompletedFields, StructuralError>>,
    deserializer: D,
}

impl<R> BodyDemux<R>
where
    R: AsyncRead + Unpin + Send,
{
    /// Create a demultiplexer reading `source` with the default
    /// configuration and [`JsonDeserializer`].
    #[must_use]
    pub fn new(source: R) -> Self { Self::with_config(source, DemuxConfig::default()) }

    /// Create a demultiplexer with an explicit configuration.
    #[must_use]
    pub fn with_config(source: R, config: DemuxConfig) -> Self {
        Self::with_deserializer(source, config, JsonDeserializer)
    }
}

impl<R, D> BodyDemux<R, D>
where
    R: AsyncRead + Unpin + Send,
    D: FieldDeserializer,
{
    /// Create a demultiplexer with a custom deserializer.
    #[must_use]
    pub fn with_deserializer(source: R, config: DemuxConfig, deserializer: D) -> Self {
        Self {
            registry: FieldRegistry::new(),
            config,
            source: Mutex::new(Some(source)),
            drained: OnceCell::new(),
            deserializer,
        }
    }

    /// Declare the fields of `invocation`. See [`FieldRegistry::initialize`].
    ///
    /// # Errors
    ///
    /// Propagates the registry's [`ContractError`].
    pub fn initialize<I, F>(&self, invocation: I, fields: F) -> Result<(), ContractError>
    where
        I: Into<InvocationId>,
        F: IntoIterator<Item = FieldDescriptor>,
    {
        self.registry
            .initialize(invocation, fields)
            .map_err(|error| contract_violation(error, None))
    }

    /// The field registry of this invocation.
    #[must_use]
    pub fn registry(&self) -> &FieldRegistry { &self.registry }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &DemuxConfig { &self.config }

    /// Returns true once the drain has finished, successfully or not.
    #[must_use]
    pub fn is_drained(&self) -> bool { self.drained.initialized() }

    /// Drain the body if that has not happened yet and return every captured
    /// property.
    ///
    /// Concurrent callers wait for the in-flight drain; the reader is only
    /// ever consumed once.
    ///
    /// # Errors
    ///
    /// Returns the cached [`StructuralError`] if the drain failed.
    pub async fn completed_fields(&self) -> Result<&CompletedFields, StructuralError> {
        self.drained
            .get_or_init(|| self.run_drain())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Raw JSON text of a declared field, or `None` if the body lacks it.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Contract`] if the registry is not initialized or
    /// `name` was never declared, and [`ReadError::Structural`] if the body
    /// is unusable.
    pub async fn read_raw(&self, name: &str) -> Result<Option<RawFieldValue>, ReadError> {
        let (fields, _) = self.lookup(name).await?;
        Ok(fields.get(name).cloned())
    }

    /// Read a declared field as `T`.
    ///
    /// `T` must be the type the field was declared with. A field the body
    /// does not contain reads as [`FieldRead::NoValue`]; one that fails to
    /// deserialize reads as [`FieldRead::Invalid`] without affecting other
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns [`ReadError::Contract`] for an uninitialized registry, an
    /// undeclared name or a type other than the declared one, and
    /// [`ReadError::Structural`] if the body is unusable.
    pub async fn read_field<T>(&self, name: &str) -> Result<FieldRead<T>, ReadError>
    where
        T: DeserializeOwned + 'static,
    {
        let (fields, descriptor) = self.lookup(name).await?;
        let declared = descriptor.target();
        if !declared.is::<T>() {
            return Err(contract_violation(
                ContractError::TypeMismatch {
                    name: name.to_owned(),
                    declared: declared.name(),
                    requested: type_name::<T>(),
                },
                self.registry.invocation_id(),
            )
            .into());
        }

        let Some(raw) = fields.get(name) else {
            return Ok(FieldRead::NoValue);
        };
        if raw.is_null() && self.config.null_handling() == NullPolicy::NoValue {
            return Ok(FieldRead::NoValue);
        }

        match self.deserializer.deserialize::<T>(raw.as_bytes()) {
            Ok(value) => Ok(FieldRead::Value(value)),
            Err(source) => {
                let error = FieldError::Deserialize {
                    field: name.to_owned(),
                    source,
                };
                log::warn!("{error}");
                Ok(FieldRead::Invalid(error))
            }
        }
    }

    async fn lookup(&self, name: &str) -> Result<(&CompletedFields, FieldDescriptor), ReadError> {
        if !self.registry.is_initialized() {
            return Err(contract_violation(ContractError::NotInitialized, None).into());
        }
        let fields = self.completed_fields().await?;
        let descriptor = self
            .registry
            .descriptor(name)
            .map_err(|error| contract_violation(error, self.registry.invocation_id()))?;
        Ok((fields, descriptor))
    }

    async fn run_drain(&self) -> Result<CompletedFields, StructuralError> {
        let invocation = self.registry.invocation_id();
        let invocation = invocation.as_ref().map_or("-", InvocationId::as_str);

        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut reader) = source else {
            crate::metrics::inc_drain_failures();
            log::error!("body drain abandoned: invocation={invocation}");
            return Err(StructuralError::DrainAbandoned);
        };

        crate::metrics::inc_drains();
        tracing::debug!(invocation, "body drain started");
        let result = drain(&mut reader, &self.config)
            .await
            .and_then(|fields| self.check_undeclared(fields));
        match &result {
            Ok(fields) => {
                crate::metrics::add_fields_captured(fields.len());
                tracing::debug!(invocation, fields = fields.len(), "body drain committed");
            }
            Err(error) => {
                crate::metrics::inc_drain_failures();
                log::warn!("body drain failed: invocation={invocation}, error={error}");
            }
        }
        result
    }

    /// Reject properties the registry does not know when so configured.
    ///
    /// An uninitialized registry declares nothing, so every property is
    /// rejected.
    fn check_undeclared(&self, fields: CompletedFields) -> Result<CompletedFields, StructuralError> {
        if self.config.undeclared_handling() == UndeclaredPolicy::Reject
            && let Some(name) = fields.names().find(|name| !self.registry.contains(name))
        {
            return Err(StructuralError::UndeclaredProperty {
                name: name.to_owned(),
            });
        }
        Ok(fields)
    }
}

fn contract_violation(error: ContractError, invocation: Option<InvocationId>) -> ContractError {
    match invocation {
        Some(invocation) => log::error!("contract violation: invocation={invocation}, error={error}"),
        None => log::error!("contract violation: {error}"),
    }
    error
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    type SliceDemux = BodyDemux<&'static [u8]>;

    #[fixture]
    fn demux() -> SliceDemux {
        let demux = BodyDemux::new(br#"{"n": 5, "s": "five", "z": null}"#.as_slice());
        demux
            .initialize("unit", [
                FieldDescriptor::of::<u8>("n"),
                FieldDescriptor::of::<String>("s"),
                FieldDescriptor::of::<Option<u8>>("z"),
                FieldDescriptor::of::<u8>("absent"),
            ])
            .expect("registry initialized");
        demux
    }

    #[rstest]
    #[tokio::test]
    async fn reads_declared_fields(demux: SliceDemux) {
        assert!(!demux.is_drained());
        let n = demux.read_field::<u8>("n").await.expect("valid body");
        assert!(matches!(n, FieldRead::Value(5)));
        assert!(demux.is_drained());
        let s = demux.read_field::<String>("s").await.expect("valid body");
        assert_eq!(s.value().as_deref(), Some("five"));
        let absent = demux.read_field::<u8>("absent").await.expect("valid body");
        assert!(absent.is_no_value());
    }

    #[rstest]
    #[tokio::test]
    async fn null_is_no_value_by_default(demux: SliceDemux) {
        let z = demux.read_field::<Option<u8>>("z").await.expect("valid body");
        assert!(z.is_no_value());
        let raw = demux.read_raw("z").await.expect("valid body");
        assert!(raw.is_some_and(|raw| raw.is_null()));
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_type_is_a_contract_error(demux: SliceDemux) {
        let err = demux
            .read_field::<String>("n")
            .await
            .expect_err("declared as u8");
        assert!(matches!(
            err,
            ReadError::Contract(ContractError::TypeMismatch { ref name, .. }) if name == "n"
        ));
    }

    #[tokio::test]
    async fn reads_before_initialization_do_not_drain() {
        let demux = BodyDemux::new(br#"{"n": 1}"#.as_slice());
        let err = demux.read_raw("n").await.expect_err("not initialized");
        assert_eq!(err, ReadError::Contract(ContractError::NotInitialized));
        assert!(!demux.is_drained());
    }

    #[tokio::test]
    async fn undeclared_properties_can_be_rejected() {
        let config = DemuxConfig::default().undeclared_properties(UndeclaredPolicy::Reject);
        let demux = BodyDemux::with_config(br#"{"n": 1, "extra": 2}"#.as_slice(), config);
        demux
            .initialize("unit", [FieldDescriptor::of::<u8>("n")])
            .expect("registry initialized");
        let err = demux.read_field::<u8>("n").await.expect_err("extra is undeclared");
        assert_eq!(
            err,
            ReadError::Structural(StructuralError::UndeclaredProperty {
                name: "extra".to_owned()
            })
        );
    }

    #[test]
    fn field_read_into_result() {
        assert_eq!(FieldRead::Value(3).into_result().ok(), Some(Some(3)));
        assert_eq!(FieldRead::<u8>::NoValue.into_result().ok(), Some(None));
    }
}
