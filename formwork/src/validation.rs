//! The validation engine.
//!
//! A [`Validation`] runs an ordered list of validators against one value and
//! settles into [`Status::Valid`] or [`Status::Invalid`]. Failures are
//! collected as data; nothing a validator does escapes as an error from
//! [`Validation::validate`].

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ValidationError;
use crate::state::State;
use crate::validator::{Rejection, Validator};

/// Where a validation run currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Status {
    /// No value yet, or a run is in flight. Never carries errors.
    #[default]
    Pending,
    /// Every validator accepted the value.
    Valid,
    /// At least one validator rejected the value, or a composite's children
    /// are invalid.
    Invalid,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

#[derive(Debug, Clone)]
struct Outcome<T> {
    /// Bumped on every `validate` call; a run commits only while it is current.
    generation: u64,
    status: Status,
    value: Option<T>,
    errors: Vec<ValidationError>,
    aggregate: bool,
}

impl<T> Outcome<T> {
    fn pending(generation: u64) -> Self {
        Self {
            generation,
            status: Status::Pending,
            value: None,
            errors: Vec::new(),
            aggregate: false,
        }
    }
}

/// Validation state machine for one value.
///
/// `Validation` is a cheap-clone handle: clones observe the same run. Calling
/// [`validate`](Self::validate) resets the handle to pending immediately, then
/// returns a future that runs the validators in registration order:
///
/// - a validator error with `bail` set stops the run,
/// - a non-bailing error is recorded and the next validator runs,
/// - a composite's "children invalid" signal stops the run without adding an
///   error.
///
/// When several runs overlap, only the most recently requested one commits
/// its result; older runs finish silently.
pub struct Validation<T> {
    validators: Arc<[Validator<T>]>,
    state: State<Outcome<T>>,
}

impl<T> Validation<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a pending validation with the given validators.
    pub fn new(validators: impl IntoIterator<Item = Validator<T>>) -> Self {
        Self::from_shared(validators.into_iter().collect())
    }

    pub(crate) fn from_shared(validators: Arc<[Validator<T>]>) -> Self {
        Self {
            validators,
            state: State::new(Outcome::pending(0)),
        }
    }

    /// Create an already-invalid validation holding a single error.
    ///
    /// No validator runs. Used to inject externally sourced failures.
    pub fn rejected(error: impl Into<ValidationError>) -> Self {
        let validation = Self::from_shared(Arc::from(Vec::new()));
        validation.state.update(|outcome| {
            outcome.status = Status::Invalid;
            outcome.errors = vec![error.into()];
        });
        validation
    }

    /// Validate a value.
    ///
    /// The handle is pending as soon as this returns, before the future is
    /// polled. The future resolves to this handle once the run is over.
    pub fn validate(&self, value: T) -> impl Future<Output = Self> + Send + use<T> {
        let generation = self.state.update(|outcome| {
            *outcome = Outcome::pending(outcome.generation + 1);
            outcome.generation
        });
        let this = self.clone();
        async move {
            this.run(generation, value).await;
            this
        }
    }

    async fn run(&self, generation: u64, value: T) {
        log::debug!(
            "Validation run {} started ({} validators)",
            generation,
            self.validators.len()
        );

        let mut errors = Vec::new();
        let mut aggregate = false;

        for validator in self.validators.iter() {
            match validator.check(&value).await {
                Ok(()) => {}
                Err(Rejection::Aggregate) => {
                    aggregate = true;
                    break;
                }
                Err(Rejection::Failed(error)) => {
                    let bail = error.bail();
                    errors.push(error);
                    if bail {
                        break;
                    }
                }
            }
        }

        let committed = self.state.update_if(|outcome| {
            if outcome.generation != generation {
                return false;
            }
            if aggregate || !errors.is_empty() {
                outcome.status = Status::Invalid;
                outcome.errors = errors;
                outcome.aggregate = aggregate;
            } else {
                outcome.status = Status::Valid;
                outcome.value = Some(value);
            }
            true
        });

        if committed {
            log::debug!("Validation run {} finished: {}", generation, self.status());
        } else {
            log::debug!("Validation run {} superseded, result discarded", generation);
        }
    }

    /// Wait until no run is in flight.
    ///
    /// Never fails. A validation that was never started stays pending, so
    /// this only returns after [`validate`](Self::validate) has been called.
    pub async fn finished(&self) -> Self {
        let mut changes = self.state.subscribe();
        while self.is_pending() {
            if changes.changed().await.is_err() {
                break;
            }
        }
        self.clone()
    }
}

impl<T> Validation<T> {
    /// Current status.
    pub fn status(&self) -> Status {
        self.state.with(|outcome| outcome.status)
    }

    pub fn is_pending(&self) -> bool {
        self.status() == Status::Pending
    }

    pub fn is_valid(&self) -> bool {
        self.status() == Status::Valid
    }

    pub fn is_invalid(&self) -> bool {
        self.status() == Status::Invalid
    }

    /// Whether the run failed because a composite's children are invalid.
    ///
    /// Such a validation can be invalid with no errors of its own.
    pub fn is_aggregate(&self) -> bool {
        self.state
            .with(|outcome| outcome.status == Status::Invalid && outcome.aggregate)
    }

    /// The accepted value; only present while valid.
    pub fn value(&self) -> Option<T>
    where
        T: Clone,
    {
        self.state.with(|outcome| match outcome.status {
            Status::Valid => outcome.value.clone(),
            _ => None,
        })
    }

    /// Collected errors in registration order.
    pub fn errors(&self) -> Vec<ValidationError> {
        self.state.with(|outcome| outcome.errors.clone())
    }

    /// The first collected error.
    pub fn error(&self) -> Option<ValidationError> {
        self.state.with(|outcome| outcome.errors.first().cloned())
    }

    pub fn has_error(&self) -> bool {
        self.state.with(|outcome| !outcome.errors.is_empty())
    }

    /// Subscribe to state changes of this validation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.subscribe()
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty()
    }

    pub fn clear_dirty(&self) {
        self.state.clear_dirty();
    }

    /// Whether both handles refer to the same validation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.state.ptr_eq(&other.state)
    }
}

impl<T> Clone for Validation<T> {
    fn clone(&self) -> Self {
        Self {
            validators: Arc::clone(&self.validators),
            state: self.state.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Validation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.state.with(|outcome| {
            f.debug_struct("Validation")
                .field("status", &outcome.status)
                .field("value", &outcome.value)
                .field("errors", &outcome.errors)
                .field("validators", &self.validators.len())
                .finish()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use futures::FutureExt;

    use super::*;

    fn counting(calls: &Arc<AtomicUsize>, result: Result<(), ValidationError>) -> Validator<i32> {
        let calls = Arc::clone(calls);
        Validator::new(move |_: &i32| {
            calls.fetch_add(1, Ordering::SeqCst);
            result.clone()
        })
    }

    #[tokio::test]
    async fn test_empty_list_is_valid() {
        let validation = Validation::<i32>::new([]).validate(7).await;
        assert_eq!(validation.status(), Status::Valid);
        assert_eq!(validation.value(), Some(7));
        assert!(validation.errors().is_empty());
    }

    #[tokio::test]
    async fn test_all_accepting_is_valid() {
        let calls = Arc::new(AtomicUsize::new(0));
        let validation = Validation::new([counting(&calls, Ok(())), counting(&calls, Ok(()))]);

        let validation = validation.validate(3).await;
        assert!(validation.is_valid());
        assert_eq!(validation.value(), Some(3));
        assert!(!validation.has_error());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bail_stops_the_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let validation = Validation::new([
            counting(&calls, Err(ValidationError::non_bailing("first"))),
            counting(&calls, Err(ValidationError::new("second"))),
            counting(&after, Err(ValidationError::new("third"))),
        ]);

        let validation = validation.validate(1).await;
        assert!(validation.is_invalid());
        assert_eq!(
            validation.errors(),
            vec![ValidationError::non_bailing("first"), ValidationError::new("second")]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(validation.value(), None);
    }

    #[tokio::test]
    async fn test_non_bailing_errors_accumulate_in_order() {
        let validation = Validation::new([
            Validator::new(|_: &i32| Err(ValidationError::non_bailing("a"))),
            Validator::new(|_: &i32| Ok::<(), ValidationError>(())),
            Validator::new(|_: &i32| Err(ValidationError::non_bailing("b"))),
        ]);

        let validation = validation.validate(0).await;
        let messages: Vec<_> = validation
            .errors()
            .iter()
            .map(|e| e.message().to_string())
            .collect();
        assert_eq!(messages, ["a", "b"]);
        assert_eq!(validation.error().map(|e| e.message().to_string()).as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_aggregate_stops_without_error() {
        let after = Arc::new(AtomicUsize::new(0));
        let validation = Validation::new([
            Validator::composite(|_: i32| async { Err::<(), _>(Rejection::Aggregate) }.boxed()),
            counting(&after, Err(ValidationError::new("never"))),
        ]);

        let validation = validation.validate(0).await;
        assert_eq!(validation.status(), Status::Invalid);
        assert!(validation.is_aggregate());
        assert!(validation.errors().is_empty());
        assert_eq!(after.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pending_is_set_before_polling() {
        let validation = Validation::new([Validator::new(|_: &i32| Err("no"))]);
        let settled = validation.validate(1).await;
        assert!(settled.is_invalid());

        let run = validation.validate(2);
        assert!(validation.is_pending());
        assert!(validation.errors().is_empty());
        assert_eq!(validation.value(), None);

        run.await;
        assert!(validation.is_invalid());
    }

    #[tokio::test]
    async fn test_latest_run_wins() {
        let validation = Validation::new([Validator::new_async(|v: String| async move {
            if v == "slow" {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Err("stale")
            } else {
                Ok(())
            }
        })]);

        let first = validation.validate("slow".to_string());
        let second = validation.validate("fast".to_string());
        tokio::join!(first, second);

        assert!(validation.is_valid());
        assert_eq!(validation.value().as_deref(), Some("fast"));
        assert!(validation.errors().is_empty());
    }

    #[tokio::test]
    async fn test_finished_waits_for_spawned_run() {
        let validation = Validation::new([Validator::new_async(|v: i32| async move {
            tokio::task::yield_now().await;
            if v > 10 { Err("Too big") } else { Ok(()) }
        })]);

        tokio::spawn(validation.validate(11));
        let settled = validation.finished().await;
        assert!(settled.is_invalid());
        assert_eq!(settled.errors(), vec![ValidationError::new("Too big")]);
    }

    #[test]
    fn test_rejected_is_invalid() {
        let validation = Validation::<String>::rejected("Server said no");
        assert!(validation.is_invalid());
        assert!(!validation.is_aggregate());
        assert_eq!(validation.errors(), vec![ValidationError::new("Server said no")]);
    }
}
