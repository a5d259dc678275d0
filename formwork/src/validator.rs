//! Validator callables.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{ValidationError, panic_message};

/// Why a validator refused a value.
pub(crate) enum Rejection {
    /// The value was rejected with an error.
    Failed(ValidationError),
    /// A composite's children already carry the errors; nothing to add.
    Aggregate,
}

impl Rejection {
    fn panicked(panic: &Box<dyn std::any::Any + Send>) -> Self {
        let message = panic_message(panic);
        log::warn!("Validator panicked: {}", message);
        Self::Failed(ValidationError::new(message))
    }
}

type SyncCheck<T> = dyn Fn(&T) -> Result<(), Rejection> + Send + Sync;
type AsyncCheck<T> = dyn Fn(T) -> BoxFuture<'static, Result<(), Rejection>> + Send + Sync;

enum Check<T> {
    Sync(Arc<SyncCheck<T>>),
    Async(Arc<AsyncCheck<T>>),
}

/// Object form of a validator.
///
/// Anything implementing `Validate` can be turned into a [`Validator`] with
/// [`Validator::from_validate`].
pub trait Validate<T>: Send + Sync {
    /// Accept or reject the value.
    fn validate(&self, value: &T) -> Result<(), ValidationError>;
}

/// Asynchronous object form of a validator.
///
/// The returned future owns everything it needs, so implementors clone
/// shared handles (clients, pools) into it. Turned into a [`Validator`] with
/// [`Validator::from_validate_async`].
pub trait ValidateAsync<T>: Send + Sync {
    /// Accept or reject the value.
    fn validate(&self, value: T) -> BoxFuture<'static, Result<(), ValidationError>>;
}

/// A unit of acceptance logic for a candidate value.
///
/// Validators accept a value by returning `Ok(())` and reject it by returning
/// an error convertible into [`ValidationError`]. Synchronous validators run
/// inline without suspending; asynchronous ones receive an owned copy of the
/// value and are awaited.
///
/// Cloning a validator is cheap: the callable is shared.
///
/// # Example
///
/// ```ignore
/// let not_empty = Validator::new(|v: &String| {
///     if v.is_empty() { Err("Required") } else { Ok(()) }
/// });
///
/// let available = Validator::new_async(|name: String| async move {
///     if lookup(&name).await { Err("Name is taken") } else { Ok(()) }
/// });
/// ```
pub struct Validator<T> {
    check: Check<T>,
}

impl<T> Validator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a synchronous validator.
    pub fn new<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<ValidationError>,
    {
        Self {
            check: Check::Sync(Arc::new(move |value| {
                f(value).map_err(|e| Rejection::Failed(e.into()))
            })),
        }
    }

    /// Create an asynchronous validator.
    pub fn new_async<F, Fut, E>(f: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ValidationError>,
    {
        Self {
            check: Check::Async(Arc::new(move |value| {
                let fut = f(value);
                Box::pin(async move { fut.await.map_err(|e| Rejection::Failed(e.into())) })
            })),
        }
    }

    /// Wrap an object implementing [`Validate`].
    pub fn from_validate<V>(validator: V) -> Self
    where
        V: Validate<T> + 'static,
    {
        Self::new(move |value| validator.validate(value))
    }

    /// Create an asynchronous validator from a [`ValidateAsync`] implementation.
    pub fn from_validate_async<V>(validator: V) -> Self
    where
        V: ValidateAsync<T> + 'static,
    {
        Self::new_async(move |value| validator.validate(value))
    }

    /// Create a validator that may fail with any [`Rejection`].
    pub(crate) fn composite<F>(f: F) -> Self
    where
        F: Fn(T) -> BoxFuture<'static, Result<(), Rejection>> + Send + Sync + 'static,
    {
        Self {
            check: Check::Async(Arc::new(f)),
        }
    }

    /// Run the validator against a value.
    ///
    /// Panics inside the validator are caught and reported as a bailing error.
    pub(crate) async fn check(&self, value: &T) -> Result<(), Rejection> {
        match &self.check {
            Check::Sync(f) => panic::catch_unwind(AssertUnwindSafe(|| f(value)))
                .unwrap_or_else(|panic| Err(Rejection::panicked(&panic))),
            Check::Async(f) => {
                let future = match panic::catch_unwind(AssertUnwindSafe(|| f(value.clone()))) {
                    Ok(future) => future,
                    Err(panic) => return Err(Rejection::panicked(&panic)),
                };
                AssertUnwindSafe(future)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| Err(Rejection::panicked(&panic)))
            }
        }
    }

    /// Whether this validator runs without suspending.
    pub fn is_sync(&self) -> bool {
        matches!(self.check, Check::Sync(_))
    }
}

impl<T> Clone for Validator<T> {
    fn clone(&self) -> Self {
        let check = match &self.check {
            Check::Sync(f) => Check::Sync(Arc::clone(f)),
            Check::Async(f) => Check::Async(Arc::clone(f)),
        };
        Self { check }
    }
}

impl<T> std::fmt::Debug for Validator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.check {
            Check::Sync(_) => "sync",
            Check::Async(_) => "async",
        };
        f.debug_struct("Validator").field("kind", &kind).finish()
    }
}
