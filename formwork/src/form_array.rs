use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::control::{Control, validate_children};
use crate::error::{AccessError, ValidationError};
use crate::form::Form;
use crate::state::State;
use crate::validation::{Status, Validation};
use crate::validator::Validator;

/// Identifies a row to remove: by position or by handle identity.
#[derive(Debug, Clone, Copy)]
pub enum RowRef<'a> {
    Index(usize),
    Row(&'a Form),
}

impl From<usize> for RowRef<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a Form> for RowRef<'a> {
    fn from(row: &'a Form) -> Self {
        Self::Row(row)
    }
}

/// An ordered, growable list of same-shaped forms.
///
/// Validation follows the same rule as [`Form`]: every row validates first,
/// and the array's own validators only see the snapshot once no row is
/// invalid.
///
/// # Example
///
/// ```ignore
/// let contacts = FormArray::builder()
///     .row(contact_row("Ada"))
///     .rule(|rows| match rows.as_array() {
///         Some(rows) if !rows.is_empty() => Ok(()),
///         _ => Err("Add at least one contact"),
///     })
///     .build();
///
/// contacts.add(contact_row(""));
/// ```
pub struct FormArray {
    initial: Arc<[Form]>,
    rows: State<Vec<Form>>,
    validators: Arc<[Validator<Value>]>,
    validation: State<Option<Validation<Value>>>,
}

impl FormArray {
    /// Start building a form array.
    pub fn builder() -> FormArrayBuilder {
        FormArrayBuilder::new()
    }

    /// Create a form array without validators of its own.
    pub fn new(rows: impl IntoIterator<Item = Form>) -> Self {
        Self::builder().rows(rows).build()
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    /// Handles to the current rows, in order.
    pub fn rows(&self) -> Vec<Form> {
        self.rows.get()
    }

    /// Handles to the rows the array was created with.
    pub fn initial_rows(&self) -> &[Form] {
        &self.initial
    }

    pub fn get(&self, index: usize) -> Option<Form> {
        self.rows.with(|rows| rows.get(index).cloned())
    }

    pub fn len(&self) -> usize {
        self.rows.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.with(Vec::is_empty)
    }

    /// Append a row.
    pub fn add(&self, row: Form) -> &Self {
        self.rows.update(|rows| rows.push(row));
        self
    }

    /// Remove a row by index or by handle.
    ///
    /// Returns the removed row. An out-of-range index or a row that is not in
    /// the array leaves the rows untouched and returns `None`.
    pub fn remove<'a>(&self, target: impl Into<RowRef<'a>>) -> Option<Form> {
        let target = target.into();
        let mut removed = None;
        self.rows.update_if(|rows| {
            let index = match target {
                RowRef::Index(index) => Some(index).filter(|index| *index < rows.len()),
                RowRef::Row(row) => rows.iter().position(|candidate| candidate.ptr_eq(row)),
            };
            removed = index.map(|index| rows.remove(index));
            removed.is_some()
        });

        if removed.is_none() {
            log::debug!("FormArray: no row matches {:?}, nothing removed", target);
        }
        removed
    }

    /// Plain copy of every row's raw state, in order.
    pub fn snapshot(&self) -> Value {
        self.rows
            .with(|rows| Value::Array(rows.iter().map(Form::snapshot).collect()))
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Validate every current row, then the array's own validators.
    pub fn validate(&self) -> impl Future<Output = Validation<Value>> + Send + use<> {
        let children: Vec<Arc<dyn Control>> = self.rows.with(|rows| {
            rows.iter()
                .map(|row| Arc::new(row.clone()) as Arc<dyn Control>)
                .collect()
        });
        let validators: Arc<[Validator<Value>]> = std::iter::once(validate_children(children))
            .chain(self.validators.iter().cloned())
            .collect();

        let validation = Validation::from_shared(validators);
        let run = validation.validate(self.snapshot());
        self.validation.set(Some(validation));
        run
    }

    /// Restore the initial rows, reset each of them, and drop the validation.
    pub fn reset(&self) {
        self.validation.set(None);
        self.rows.set(self.initial.to_vec());
        for row in self.initial.iter() {
            row.reset();
        }
    }

    /// Mark the array invalid with an externally sourced error.
    pub fn set_error(&self, error: impl Into<ValidationError>) {
        self.validation.set(Some(Validation::rejected(error)));
    }

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

    /// Errors of every row, in row order.
    pub fn row_errors(&self) -> Vec<ValidationError> {
        self.rows
            .with(|rows| rows.iter().flat_map(Form::errors).collect())
    }

    /// Errors raised by the array's own validators.
    pub fn array_errors(&self) -> Vec<ValidationError> {
        self.validation()
            .map(|validation| validation.errors())
            .unwrap_or_default()
    }

    /// Errors to display: the rows' if any, otherwise the array's own.
    pub fn errors(&self) -> Vec<ValidationError> {
        let row_errors = self.row_errors();
        if row_errors.is_empty() {
            self.array_errors()
        } else {
            row_errors
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

    /// Check if rows were added, removed or reset since the last clear
    pub fn is_dirty(&self) -> bool {
        self.rows.is_dirty()
    }

    pub fn clear_dirty(&self) {
        self.rows.clear_dirty();
    }
}

impl Clone for FormArray {
    fn clone(&self) -> Self {
        Self {
            initial: Arc::clone(&self.initial),
            rows: self.rows.clone(),
            validators: Arc::clone(&self.validators),
            validation: self.validation.clone(),
        }
    }
}

impl std::fmt::Debug for FormArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormArray")
            .field("rows", &self.len())
            .field("status", &self.status())
            .field("validators", &self.validators.len())
            .finish()
    }
}

impl Control for FormArray {
    fn snapshot(&self) -> Value {
        FormArray::snapshot(self)
    }

    fn validate_control(&self) -> BoxFuture<'static, Status> {
        self.validate().map(|validation| validation.status()).boxed()
    }

    fn reset(&self) {
        FormArray::reset(self)
    }

    fn errors(&self) -> Vec<ValidationError> {
        FormArray::errors(self)
    }

    fn status(&self) -> Option<Status> {
        FormArray::status(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Builder for [`FormArray`].
#[derive(Default)]
pub struct FormArrayBuilder {
    rows: Vec<Form>,
    validators: Vec<Validator<Value>>,
}

impl FormArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an initial row.
    pub fn row(mut self, row: Form) -> Self {
        self.rows.push(row);
        self
    }

    /// Add several initial rows.
    pub fn rows(mut self, rows: impl IntoIterator<Item = Form>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Add an array-level validator.
    pub fn validator(mut self, validator: Validator<Value>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Add a synchronous array-level rule over the snapshot.
    pub fn rule<F, E>(self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<(), E> + Send + Sync + 'static,
        E: Into<ValidationError>,
    {
        self.validator(Validator::new(f))
    }

    /// Add an asynchronous array-level rule over the snapshot.
    pub fn rule_async<F, Fut, E>(self, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ValidationError>,
    {
        self.validator(Validator::new_async(f))
    }

    pub fn build(self) -> FormArray {
        FormArray {
            initial: Arc::from(self.rows.clone()),
            rows: State::new(self.rows),
            validators: self.validators.into(),
            validation: State::new(None),
        }
    }
}
