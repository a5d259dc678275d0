//! Control trait for anything a form can hold.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde_json::Value;

use crate::error::ValidationError;
use crate::validation::Status;
use crate::validator::{Rejection, Validator};

/// Trait for the members of a form.
///
/// [`Field`](crate::Field), [`Form`](crate::Form) and
/// [`FormArray`](crate::FormArray) implement it, which lets composites
/// snapshot, validate and reset their children without knowing their concrete
/// types.
pub trait Control: Send + Sync + 'static {
    /// Plain structural copy of the current raw state.
    fn snapshot(&self) -> Value;

    /// Start a validation run and resolve to its final status.
    fn validate_control(&self) -> BoxFuture<'static, Status>;

    /// Restore the initial state and drop any validation.
    fn reset(&self);

    /// Errors to display for this control.
    fn errors(&self) -> Vec<ValidationError>;

    /// Status of the attached validation, if any.
    fn status(&self) -> Option<Status>;

    /// Downcast support for typed lookups.
    fn as_any(&self) -> &dyn Any;
}

/// Validator that validates every child and fails with the aggregate
/// rejection when any of them ends up invalid.
///
/// Children are validated concurrently; all of them are awaited before the
/// verdict, so every child has its own errors in place.
pub(crate) fn validate_children(children: Vec<Arc<dyn Control>>) -> Validator<Value> {
    Validator::composite(move |_snapshot| {
        let runs: Vec<_> = children.iter().map(|child| child.validate_control()).collect();
        async move {
            let statuses = join_all(runs).await;
            let invalid = statuses
                .iter()
                .filter(|status| **status == Status::Invalid)
                .count();
            if invalid > 0 {
                log::debug!("{} of {} children invalid", invalid, statuses.len());
                Err(Rejection::Aggregate)
            } else {
                Ok(())
            }
        }
        .boxed()
    })
}
