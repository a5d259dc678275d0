//! Built-in rules for text and number fields.
//!
//! Every rule returns a new field with the rule appended, so rules chain:
//!
//! ```ignore
//! let username = Field::text("")
//!     .required("Username is required")
//!     .min_length(3, "Username must be at least 3 characters");
//! ```

use regex::Regex;

use crate::error::ValidationError;
use crate::field::Field;

fn check(ok: bool, msg: &str) -> Result<(), ValidationError> {
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(msg))
    }
}

// Built-in rules for text fields
impl Field<String> {
    /// Require the field to be non-blank.
    pub fn required(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(!v.trim().is_empty(), &msg))
    }

    /// Require minimum length (in characters).
    pub fn min_length(&self, min: usize, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(v.chars().count() >= min, &msg))
    }

    /// Require maximum length (in characters).
    pub fn max_length(&self, max: usize, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(v.chars().count() <= max, &msg))
    }

    /// Require the value to match a regex pattern.
    pub fn pattern(&self, pattern: Regex, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(pattern.is_match(v), &msg))
    }

    /// Require a valid email address.
    ///
    /// Empty input passes; combine with [`required`](Self::required) to
    /// reject it.
    pub fn email(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| {
            check(
                v.is_empty() || email_address::EmailAddress::is_valid(v),
                &msg,
            )
        })
    }

    /// Require the value to equal another value.
    pub fn equals(&self, other: impl Into<String>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let other = other.into();
        self.rule(move |v| check(*v == other, &msg))
    }

    /// Require the value to contain a substring.
    pub fn contains(&self, substr: impl Into<String>, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        let substr = substr.into();
        self.rule(move |v| check(v.contains(&substr), &msg))
    }
}

// Built-in rules for number fields
impl Field<f64> {
    /// Require a finite number; rejects the `NaN` left by unparsable input.
    pub fn finite(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(v.is_finite(), &msg))
    }

    /// Require the value to be at least `min`.
    pub fn min(&self, min: f64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(*v >= min, &msg))
    }

    /// Require the value to be at most `max`.
    pub fn max(&self, max: f64, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(*v <= max, &msg))
    }

    /// Require a whole number.
    pub fn integer(&self, msg: impl Into<String>) -> Self {
        let msg = msg.into();
        self.rule(move |v| check(v.fract() == 0.0, &msg))
    }
}
