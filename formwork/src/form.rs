use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::control::{Control, validate_children};
use crate::error::{AccessError, ValidationError};
use crate::state::State;
use crate::validation::{Status, Validation};
use crate::validator::Validator;

type Children = Arc<[(String, Arc<dyn Control>)]>;

/// A named, fixed set of controls validated as a unit.
///
/// A form's own validators see the [`snapshot`](Self::snapshot) of its
/// children and only run once every child has validated without becoming
/// invalid. When a child is invalid the form is invalid too, but it adds no
/// error of its own: the child's errors are the ones surfaced.
///
/// `Form` is a handle; clones share the same children and validation.
///
/// # Example
///
/// ```ignore
/// let password = Field::text("").min_length(8, "Too short");
/// let confirm = Field::text("");
///
/// let form = Form::builder()
///     .field("password", password.clone())
///     .field("confirm", confirm.clone())
///     .rule(|v| {
///         if v["password"] == v["confirm"] { Ok(()) } else { Err("Passwords differ") }
///     })
///     .build();
///
/// let validation = form.validate().await;
/// ```
pub struct Form {
    fields: Children,
    validators: Arc<[Validator<Value>]>,
    validation: State<Option<Validation<Value>>>,
}

impl Form {
    /// Start building a form.
    pub fn builder() -> FormBuilder {
        FormBuilder::new()
    }

    /// Create a form from named controls, without form-level validators.
    ///
    /// A repeated name replaces the earlier control in its original position.
    pub fn new<N: Into<String>>(fields: impl IntoIterator<Item = (N, Arc<dyn Control>)>) -> Self {
        fields
            .into_iter()
            .fold(Self::builder(), |builder, (name, control)| {
                builder.insert(name.into(), control)
            })
            .build()
    }

    // -------------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------------

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a child by name and type.
    ///
    /// Returns a handle sharing state with the child.
    pub fn field<C: Control + Clone>(&self, name: &str) -> Result<C, AccessError> {
        let control = self
            .fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, control)| control)
            .ok_or_else(|| AccessError::UnknownField(name.to_string()))?;

        control
            .as_any()
            .downcast_ref::<C>()
            .cloned()
            .ok_or_else(|| AccessError::type_mismatch(name, std::any::type_name::<C>()))
    }

    /// Plain copy of every child's raw state, keyed by field name.
    pub fn snapshot(&self) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(name, control)| (name.clone(), control.snapshot()))
            .collect();
        Value::Object(map)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Validate every child, then this form's own validators.
    ///
    /// A fresh validation is attached before this returns.
    pub fn validate(&self) -> impl Future<Output = Validation<Value>> + Send + use<> {
        let children: Vec<Arc<dyn Control>> = self
            .fields
            .iter()
            .map(|(_, control)| Arc::clone(control))
            .collect();
        let validators: Arc<[Validator<Value>]> = std::iter::once(validate_children(children))
            .chain(self.validators.iter().cloned())
            .collect();

        let validation = Validation::from_shared(validators);
        let run = validation.validate(self.snapshot());
        self.validation.set(Some(validation));
        run
    }

    /// Drop this form's validation and reset every child.
    pub fn reset(&self) {
        self.validation.set(None);
        for (_, control) in self.fields.iter() {
            control.reset();
        }
    }

    /// Mark the form invalid with an externally sourced error.
    pub fn set_error(&self, error: impl Into<ValidationError>) {
        self.validation.set(Some(Validation::rejected(error)));
    }

    /// The attached validation, absent until first validated.
    pub fn validation(&self) -> Option<Validation<Value>> {
        self.validation.get()
    }

    pub fn status(&self) -> Option<Status> {
        self.validation().map(|validation| validation.status())
    }

    /// The validated snapshot, present only while valid.
    pub fn value(&self) -> Option<Value> {
        self.validation().and_then(|validation| validation.value())
    }

    /// The validated snapshot deserialized into `S`.
    pub fn value_as<S: DeserializeOwned>(&self) -> Result<Option<S>, AccessError> {
        self.value()
            .map(serde_json::from_value)
            .transpose()
            .map_err(AccessError::from)
    }

    /// Errors of every child, in declaration order.
    pub fn field_errors(&self) -> Vec<ValidationError> {
        self.fields
            .iter()
            .flat_map(|(_, control)| control.errors())
            .collect()
    }

    /// Errors raised by this form's own validators.
    pub fn form_errors(&self) -> Vec<ValidationError> {
        self.validation()
            .map(|validation| validation.errors())
            .unwrap_or_default()
    }

    /// Errors to display: the children's if any, otherwise the form's own.
    pub fn errors(&self) -> Vec<ValidationError> {
        let field_errors = self.field_errors();
        if field_errors.is_empty() {
            self.form_errors()
        } else {
            field_errors
        }
    }

    pub fn error(&self) -> Option<ValidationError> {
        self.errors().into_iter().next()
    }

    pub fn has_error(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Wait for the attached validation to settle.
    pub async fn settled(&self) -> Option<Validation<Value>> {
        loop {
            let validation = self.validation()?;
            validation.finished().await;
            let current = self.validation()?;
            if current.ptr_eq(&validation) {
                return Some(validation);
            }
        }
    }

    /// Whether both handles refer to the same form.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.validation.ptr_eq(&other.validation)
    }
}

impl Clone for Form {
    fn clone(&self) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
            validators: Arc::clone(&self.validators),
            validation: self.validation.clone(),
        }
    }
}

impl std::fmt::Debug for Form {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("fields", &self.names().collect::<Vec<_>>())
            .field("status", &self.status())
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Control for Form {
    fn snapshot(&self) -> Value {
        Form::snapshot(self)
    }

    fn validate_control(&self) -> BoxFuture<'static, Status> {
        self.validate().map(|validation| validation.status()).boxed()
    }

    fn reset(&self) {
        Form::reset(self)
    }

    fn errors(&self) -> Vec<ValidationError> {
        Form::errors(self)
    }

    fn status(&self) -> Option<Status> {
        Form::status(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`Form`].
#[derive(Default)]
pub struct FormBuilder {
    fields: Vec<(String, Arc<dyn Control>)>,
    validators: Vec<Validator<Value>>,
}

impl FormBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child control.
    ///
    /// Re-using a name replaces the earlier control in its original position.
    pub fn field(self, name: impl Into<String>, control: impl Control) -> Self {
        self.insert(name.into(), Arc::new(control))
    }

    fn insert(mut self, name: String, control: Arc<dyn Control>) -> Self {
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = control,
            None => self.fields.push((name, control)),
        }
        self
    }

    /// Add a form-level validator.
    pub fn validator(mut self, validator: Validator<Value>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Add a synchronous form-level rule over the snapshot.
    pub fn rule<F, E>(self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), E> + Send + Sync + 'static,
        E: Into<ValidationError>,
    {
        self.validator(Validator::new(f))
    }

    /// Add an asynchronous form-level rule over the snapshot.
    pub fn rule_async<F, Fut, E>(self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ValidationError>,
    {
        self.validator(Validator::new_async(f))
    }

    /// Build the form.
    pub fn build(self) -> Form {
        Form {
            fields: self.fields.into(),
            validators: self.validators.into(),
            validation: State::new(None),
        }
    }
}
