use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::config::FieldConfig;
use crate::control::Control;
use crate::error::ValidationError;
use crate::kind::{FieldKind, FieldValue};
use crate::spawn;
use crate::state::State;
use crate::validation::{Status, Validation};
use crate::validator::Validator;

/// Mutable part of a field.
#[derive(Debug)]
struct FieldInner<T> {
    /// Last value set, valid or not
    raw: T,
    /// Validation of `raw`, absent until first set or validate
    validation: Option<Validation<T>>,
    /// Eager validation not started yet
    armed: bool,
}

/// A single editable value with its own validators.
///
/// `Field` is a handle: clones share the same raw value and validation, so a
/// form can hold one clone while the caller keeps another to feed input into.
///
/// The raw value is whatever was set last. The validated [`value`](Self::value)
/// only exists while the current validation is valid.
///
/// # Example
///
/// ```ignore
/// let age = Field::number(0.0)
///     .min(18.0, "You must be an adult")
///     .integer("Whole years only");
///
/// age.set(21);
/// age.settled().await;
/// assert_eq!(age.value(), Some(21.0));
/// ```
pub struct Field<T: FieldValue> {
    initial: T,
    validators: Arc<[Validator<T>]>,
    config: FieldConfig,
    state: State<FieldInner<T>>,
}

impl Field<String> {
    /// Create a text field.
    pub fn text(initial: impl Into<String>) -> Self {
        Self::new(initial.into())
    }
}

impl Field<f64> {
    /// Create a number field.
    pub fn number(initial: impl Into<f64>) -> Self {
        Self::new(initial.into())
    }
}

impl<T: FieldValue> Field<T> {
    /// Create a field with the default configuration.
    pub fn new(initial: T) -> Self {
        Self::with_config(initial, FieldConfig::default())
    }

    /// Create a field with the given configuration.
    pub fn with_config(initial: T, config: FieldConfig) -> Self {
        Self::build(initial.clone(), initial, Arc::from(Vec::new()), config)
    }

    fn build(initial: T, raw: T, validators: Arc<[Validator<T>]>, config: FieldConfig) -> Self {
        Self {
            initial,
            validators,
            config,
            state: State::new(FieldInner {
                raw,
                validation: None,
                armed: config.validate_on_create,
            }),
        }
    }

    /// Attach a fresh validation of the raw value and return its run.
    fn attach(
        validators: &Arc<[Validator<T>]>,
        inner: &mut FieldInner<T>,
    ) -> impl Future<Output = Validation<T>> + Send + use<T> {
        let validation = Validation::from_shared(Arc::clone(validators));
        inner.armed = false;
        inner.validation = Some(validation.clone());
        validation.validate(inner.raw.clone())
    }

    /// Start the eager validation if it is still armed.
    fn fire_eager(&self) {
        let mut run = None;
        self.state.update_if(|inner| {
            if inner.armed {
                run = Some(Self::attach(&self.validators, inner));
            }
            run.is_some()
        });
        if let Some(run) = run {
            spawn::detach(run);
        }
    }

    fn attached(&self) -> Option<Validation<T>> {
        self.state.with(|inner| inner.validation.clone())
    }

    // -------------------------------------------------------------------------
    // Validators
    // -------------------------------------------------------------------------

    /// Return a new field whose validators are this field's followed by `validators`.
    ///
    /// The receiver is left untouched. The new field starts from the same
    /// initial and current raw value, without a validation.
    pub fn with_validators(&self, validators: impl IntoIterator<Item = Validator<T>>) -> Self {
        let validators = self.validators.iter().cloned().chain(validators).collect();
        Self::build(self.initial.clone(), self.raw_value(), validators, self.config)
    }

    /// Append a synchronous rule, returning a new field.
    pub fn rule<F, E>(&self, f: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<ValidationError>,
    {
        self.with_validators([Validator::new(f)])
    }

    /// Append an asynchronous rule, returning a new field.
    pub fn rule_async<F, Fut, E>(&self, f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ValidationError>,
    {
        self.with_validators([Validator::new_async(f)])
    }

    /// Number of validators attached.
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    // -------------------------------------------------------------------------
    // Read methods
    // -------------------------------------------------------------------------

    /// The kind of input this field renders as.
    pub fn kind(&self) -> FieldKind {
        T::KIND
    }

    pub fn config(&self) -> FieldConfig {
        self.config
    }

    /// The last value set, valid or not.
    pub fn raw_value(&self) -> T {
        self.state.with(|inner| inner.raw.clone())
    }

    /// The value the field was created with.
    pub fn initial_value(&self) -> &T {
        &self.initial
    }

    /// The raw value rendered for an input adapter.
    pub fn input(&self) -> String {
        self.state.with(|inner| inner.raw.to_input())
    }

    /// The validated value, present only while the validation is valid.
    ///
    /// This does not track the raw value: right after a `set` it is absent
    /// until the new validation settles.
    pub fn value(&self) -> Option<T> {
        self.validation().and_then(|validation| validation.value())
    }

    /// The attached validation, absent until first set or validate.
    ///
    /// On an eager field this starts validating the initial value if nothing
    /// else has yet.
    pub fn validation(&self) -> Option<Validation<T>> {
        self.fire_eager();
        self.attached()
    }

    pub fn status(&self) -> Option<Status> {
        self.validation().map(|validation| validation.status())
    }

    /// Errors of the attached validation.
    pub fn errors(&self) -> Vec<ValidationError> {
        self.validation()
            .map(|validation| validation.errors())
            .unwrap_or_default()
    }

    /// The first error of the attached validation.
    pub fn error(&self) -> Option<ValidationError> {
        self.validation().and_then(|validation| validation.error())
    }

    pub fn has_error(&self) -> bool {
        self.validation()
            .is_some_and(|validation| validation.has_error())
    }

    // -------------------------------------------------------------------------
    // Write methods
    // -------------------------------------------------------------------------

    /// Set the raw value and start validating it in the background.
    pub fn set(&self, value: impl Into<T>) -> &Self {
        spawn::detach(self.set_validated(value.into()));
        self
    }

    /// Set the raw value from an adapter's string representation.
    pub fn set_input(&self, input: &str) -> &Self {
        self.set(T::coerce(input))
    }

    /// Set the raw value and return the validation of it.
    pub fn set_validated(&self, value: T) -> impl Future<Output = Validation<T>> + Send + use<T> {
        self.state.update(|inner| inner.raw = value);
        self.validate()
    }

    /// Validate the current raw value.
    ///
    /// A fresh validation is attached before this returns, pending until the
    /// returned future completes.
    pub fn validate(&self) -> impl Future<Output = Validation<T>> + Send + use<T> {
        self.state
            .update(|inner| Self::attach(&self.validators, inner))
    }

    /// Restore the initial value and drop the validation.
    pub fn reset(&self) {
        self.state.update(|inner| {
            inner.raw = self.initial.clone();
            inner.validation = None;
            inner.armed = false;
        });
    }

    /// Mark the field invalid with an externally sourced error.
    ///
    /// No validator runs; the next `set` or `validate` replaces the error.
    pub fn set_error(&self, error: impl Into<ValidationError>) {
        let validation = Validation::rejected(error);
        self.state.update(|inner| {
            inner.armed = false;
            inner.validation = Some(validation);
        });
    }

    /// Wait for the attached validation to settle.
    ///
    /// Follows replacements: if a newer validation is attached while waiting,
    /// waits for that one instead. Returns `None` if there is no validation.
    pub async fn settled(&self) -> Option<Validation<T>> {
        loop {
            let validation = self.validation()?;
            validation.finished().await;
            let current = self.validation()?;
            if current.ptr_eq(&validation) {
                return Some(validation);
            }
        }
    }

    // -------------------------------------------------------------------------
    // Dirty tracking
    // -------------------------------------------------------------------------

    /// Check if the value or validation changed since the last clear
    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
            || self
                .attached()
                .is_some_and(|validation| validation.is_dirty())
    }

    /// Clear the dirty flags
    pub fn clear_dirty(&self) {
        self.state.clear_dirty();
        if let Some(validation) = self.attached() {
            validation.clear_dirty();
        }
    }

    /// Whether both handles refer to the same field.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.state.ptr_eq(&other.state)
    }
}

impl<T: FieldValue> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            initial: self.initial.clone(),
            validators: Arc::clone(&self.validators),
            config: self.config,
            state: self.state.clone(),
        }
    }
}

impl<T: FieldValue> std::fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("kind", &T::KIND)
            .field("raw", &self.raw_value())
            .field("status", &self.attached().map(|validation| validation.status()))
            .field("validators", &self.validators.len())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Control implementation
// -----------------------------------------------------------------------------

impl<T: FieldValue> Control for Field<T> {
    fn snapshot(&self) -> Value {
        self.state.with(|inner| inner.raw.to_json())
    }

    fn validate_control(&self) -> BoxFuture<'static, Status> {
        self.validate().map(|validation| validation.status()).boxed()
    }

    fn reset(&self) {
        Field::reset(self)
    }

    fn errors(&self) -> Vec<ValidationError> {
        Field::errors(self)
    }

    fn status(&self) -> Option<Status> {
        Field::status(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
