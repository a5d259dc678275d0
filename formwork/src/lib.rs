//! Form state with asynchronous validation.
//!
//! [`Field`]s hold single editable values, [`Form`]s group named controls and
//! [`FormArray`]s hold growable lists of forms. Each of them validates through
//! a [`Validation`], which runs validators in order, collects their errors,
//! and folds invalid children into the parent without repeating their
//! messages.

pub mod config;
pub mod control;
pub mod error;
pub mod field;
pub mod form;
pub mod form_array;
pub mod kind;
mod rules;
mod spawn;
pub mod state;
pub mod validation;
pub mod validator;

pub use config::FieldConfig;
pub use control::Control;
pub use error::{AccessError, Cause, ValidationError};
pub use field::Field;
pub use form::{Form, FormBuilder};
pub use form_array::{FormArray, FormArrayBuilder, RowRef};
pub use kind::{FieldKind, FieldValue};
pub use state::State;
pub use validation::{Status, Validation};
pub use validator::{Validate, ValidateAsync, Validator};

pub mod prelude {
    pub use crate::config::FieldConfig;
    pub use crate::control::Control;
    pub use crate::error::{AccessError, ValidationError};
    pub use crate::field::Field;
    pub use crate::form::Form;
    pub use crate::form_array::{FormArray, RowRef};
    pub use crate::kind::FieldKind;
    pub use crate::validation::{Status, Validation};
    pub use crate::validator::{Validate, ValidateAsync, Validator};
}
