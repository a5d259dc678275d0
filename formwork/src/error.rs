//! Error types for validation failures and typed form access.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Upstream error a [`ValidationError`] was derived from.
pub type Cause = Arc<dyn StdError + Send + Sync>;

/// A failure reported by a validator.
///
/// Carries a human-readable message, the optional upstream error it was
/// derived from, and a `bail` flag deciding whether the validation run stops
/// at this failure (`true`, the default) or keeps collecting errors from the
/// remaining validators.
///
/// Values are immutable once constructed; the builder methods consume and
/// return a new error.
///
/// # Normalization
///
/// Anything a validator fails with is turned into a `ValidationError`:
///
/// - a `ValidationError` is returned as-is,
/// - an error value keeps its message and becomes the cause
///   ([`ValidationError::from_error`], `From<Box<dyn Error + Send + Sync>>`),
/// - a plain string becomes both the message and the cause.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
    cause: Option<Cause>,
    bail: bool,
}

impl ValidationError {
    /// Create a bailing error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
            bail: true,
        }
    }

    /// Create an error that lets the remaining validators run.
    pub fn non_bailing(message: impl Into<String>) -> Self {
        Self::new(message).with_bail(false)
    }

    /// Set whether this error stops the validation run.
    pub fn with_bail(mut self, bail: bool) -> Self {
        self.bail = bail;
        self
    }

    /// Attach the upstream error this failure was derived from.
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Normalize an arbitrary error value.
    ///
    /// A `ValidationError` passed through here comes back unchanged.
    pub fn from_error(err: impl StdError + Send + Sync + 'static) -> Self {
        let boxed: Box<dyn StdError + Send + Sync> = Box::new(err);
        Self::from(boxed)
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The upstream error, if any.
    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }

    /// Whether the validation run stops at this error.
    pub fn bail(&self) -> bool {
        self.bail
    }
}

/// Errors compare by message and bail flag; causes are not compared.
impl PartialEq for ValidationError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message && self.bail == other.bail
    }
}

impl Eq for ValidationError {}

impl From<Box<dyn StdError + Send + Sync>> for ValidationError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        match err.downcast::<ValidationError>() {
            Ok(validation) => *validation,
            Err(other) => Self {
                message: other.to_string(),
                cause: Some(Arc::from(other)),
                bail: true,
            },
        }
    }
}

impl From<String> for ValidationError {
    fn from(message: String) -> Self {
        let cause: Box<dyn StdError + Send + Sync> = Box::from(message.clone());
        Self {
            message,
            cause: Some(Arc::from(cause)),
            bail: true,
        }
    }
}

impl From<&str> for ValidationError {
    fn from(message: &str) -> Self {
        Self::from(message.to_string())
    }
}

/// Errors from typed access into a form.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No control is registered under the requested name.
    #[error("Field '{0}' not found in form")]
    UnknownField(String),

    /// The control exists but is of a different type than requested.
    #[error("Field '{field}' type mismatch: expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// The validated value does not deserialize into the requested shape.
    #[error("Form value does not match the requested shape: {0}")]
    Deserialize(#[from] serde_json::Error),
}

impl AccessError {
    /// Creates a new type mismatch error.
    pub fn type_mismatch(field: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected,
        }
    }
}

/// Extract a human-readable message from a panic payload.
///
/// Panics can contain either `&str` or `String` payloads. This function
/// attempts to extract either, falling back to a generic message.
pub(crate) fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Validator panicked".to_string()
    }
}
