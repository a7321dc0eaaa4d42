//! Retry execution for OCC conflicts.
//!
//! # Responsibilities
//! - Run a unit of work inside a transaction, one fresh transaction per attempt
//! - Retry OCC conflicts from the work or from commit with jittered backoff
//! - Surface everything else immediately
//!
//! # State Machine
//! ```text
//! Begin ──err──▶ fatal (never retried)
//!   │
//!   ▼
//! Running ──conflict──▶ RolledBackRetryable ──backoff──▶ Begin
//!   │      ──other─────▶ RolledBackFatal
//!   ▼
//! Commit ──conflict──▶ RolledBackRetryable
//!   │    ──other─────▶ RolledBackFatal
//!   ▼
//! Committed
//! ```
//!
//! # Design Decisions
//! - Rollback runs on every exit path, including panics in the work or commit
//! - Cancellation observed at any checkpoint wins over the attempt's outcome
//! - A failed rollback is logged and never replaces the primary outcome

use std::panic::AssertUnwindSafe;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::resilience::backoff::{sleep_or_cancel, Backoff};
use crate::resilience::classify::classify;
use crate::resilience::transaction::{DatabaseError, Transaction, TransactionalResource};
use crate::resilience::types::{AttemptOutcome, RetryError, RetryPolicy, RetryResult};

const OP_TRANSACTION: &str = "transaction";
const OP_EXEC: &str = "exec";

/// Where an attempt stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Begin,
    Work,
    Commit,
}

/// Attempt bookkeeping shared by the transactional and statement loops.
struct RetryLoop<'a> {
    cancel: &'a CancellationToken,
    policy: &'a RetryPolicy,
    backoff: Backoff,
    attempts: u32,
    operation: &'static str,
}

impl<'a> RetryLoop<'a> {
    fn new<E>(
        cancel: &'a CancellationToken,
        policy: &'a RetryPolicy,
        operation: &'static str,
    ) -> Result<Self, RetryError<E>> {
        policy.validate().map_err(RetryError::InvalidPolicy)?;
        Ok(Self {
            cancel,
            policy,
            backoff: Backoff::new(policy),
            attempts: 0,
            operation,
        })
    }

    fn start_attempt<E>(&mut self) -> Result<(), RetryError<E>> {
        if self.cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        self.attempts += 1;
        metrics::record_attempt(self.operation);
        Ok(())
    }

    fn succeeded<T>(&self, value: T) -> T {
        if self.attempts > 1 {
            tracing::debug!(
                operation = self.operation,
                attempts = self.attempts,
                "succeeded after retry"
            );
        }
        value
    }

    fn fatal<E>(&self, err: RetryError<E>) -> RetryError<E> {
        if self.cancel.is_cancelled() {
            return RetryError::Cancelled;
        }
        metrics::record_fatal(self.operation);
        err
    }

    /// Handle a conflict: give up if the budget is spent, otherwise back off.
    async fn conflict<E: DatabaseError>(&mut self, err: E) -> Result<(), RetryError<E>> {
        metrics::record_conflict(self.operation);
        if self.cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }

        if self.attempts > self.policy.max_retries {
            metrics::record_retries_exhausted(self.operation);
            tracing::warn!(
                operation = self.operation,
                attempts = self.attempts,
                error = %err,
                "OCC retries exhausted",
            );
            return Err(RetryError::AttemptsExceeded {
                attempts: self.attempts,
                max_retries: self.policy.max_retries,
                last: err,
            });
        }

        let delay = self.backoff.next_delay();
        tracing::debug!(
            operation = self.operation,
            attempt = self.attempts,
            max_attempts = self.policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "OCC conflict, retrying after backoff",
        );

        if !sleep_or_cancel(self.cancel, delay).await {
            return Err(RetryError::Cancelled);
        }
        Ok(())
    }
}

/// Run `work` in a transaction, retrying on OCC conflicts.
///
/// `work` must be safe to run more than once: every attempt gets a fresh
/// transaction and should re-read whatever it depends on. Return values are
/// handed back from the successful attempt.
///
/// An attempt that does not commit is rolled back, including when `work` or
/// the commit panics; the panic is then resumed. Rollback errors are logged at
/// `warn` and are not returned: the result always reflects the attempt's own
/// outcome.
///
/// ```no_run
/// # use dsql_resilience::resilience::{with_retry, RetryPolicy, TransactionalResource};
/// # async fn demo<R>(pool: &R) -> Result<(), Box<dyn std::error::Error>>
/// # where R: TransactionalResource {
/// let cancel = tokio_util::sync::CancellationToken::new();
/// with_retry(&cancel, pool, &RetryPolicy::default(), |tx| {
///     Box::pin(async move {
///         // debit and credit through `tx`
///         let _ = tx;
///         Ok::<_, R::Error>(())
///     })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
#[tracing::instrument(skip_all, fields(max_retries = policy.max_retries))]
pub async fn with_retry<R, F, T, E>(
    cancel: &CancellationToken,
    resource: &R,
    policy: &RetryPolicy,
    mut work: F,
) -> RetryResult<T, E>
where
    R: TransactionalResource + ?Sized,
    F: for<'tx> FnMut(&'tx mut R::Transaction) -> BoxFuture<'tx, Result<T, E>>,
    E: DatabaseError + From<R::Error>,
{
    let mut retry = RetryLoop::new::<E>(cancel, policy, OP_TRANSACTION)?;

    loop {
        retry.start_attempt::<E>()?;

        let (stage, result) = run_attempt(resource, &mut work).await;
        match (stage, classify(result)) {
            (_, AttemptOutcome::Success(value)) => return Ok(retry.succeeded(value)),
            (Stage::Begin, AttemptOutcome::RetryableConflict(e) | AttemptOutcome::FatalError(e)) => {
                return Err(retry.fatal(RetryError::Begin(e)));
            }
            (Stage::Commit, AttemptOutcome::FatalError(e)) => {
                return Err(retry.fatal(RetryError::Commit(e)));
            }
            (Stage::Work, AttemptOutcome::FatalError(e)) => {
                return Err(retry.fatal(RetryError::Fatal(e)));
            }
            (_, AttemptOutcome::RetryableConflict(e)) => retry.conflict(e).await?,
        }
    }
}

/// Execute a single statement, retrying on OCC conflicts with the default policy.
///
/// Meant for DDL and simple DML that need no explicit transaction.
pub async fn exec_with_retry<R>(
    cancel: &CancellationToken,
    resource: &R,
    statement: &str,
    max_retries: u32,
) -> RetryResult<(), R::Error>
where
    R: TransactionalResource + ?Sized,
{
    exec_with_policy(cancel, resource, statement, &RetryPolicy::with_max_retries(max_retries)).await
}

/// Execute a single statement, retrying on OCC conflicts with `policy`.
#[tracing::instrument(skip_all, fields(max_retries = policy.max_retries))]
pub async fn exec_with_policy<R>(
    cancel: &CancellationToken,
    resource: &R,
    statement: &str,
    policy: &RetryPolicy,
) -> RetryResult<(), R::Error>
where
    R: TransactionalResource + ?Sized,
{
    let mut retry = RetryLoop::new::<R::Error>(cancel, policy, OP_EXEC)?;

    loop {
        retry.start_attempt::<R::Error>()?;

        match classify(resource.exec(statement).await) {
            AttemptOutcome::Success(()) => return Ok(retry.succeeded(())),
            AttemptOutcome::FatalError(e) => return Err(retry.fatal(RetryError::Fatal(e))),
            AttemptOutcome::RetryableConflict(e) => retry.conflict(e).await?,
        }
    }
}

/// One begin → work → commit pass. The transaction is released before returning.
async fn run_attempt<R, F, T, E>(resource: &R, work: &mut F) -> (Stage, Result<T, E>)
where
    R: TransactionalResource + ?Sized,
    F: for<'tx> FnMut(&'tx mut R::Transaction) -> BoxFuture<'tx, Result<T, E>>,
    E: From<R::Error>,
{
    let mut tx = match resource.begin().await {
        Ok(tx) => tx,
        Err(e) => return (Stage::Begin, Err(E::from(e))),
    };

    let outcome = AssertUnwindSafe(async {
        let value = match work(&mut tx).await {
            Ok(value) => value,
            Err(e) => return (Stage::Work, Err(e)),
        };
        match tx.commit().await {
            Ok(()) => (Stage::Commit, Ok(value)),
            Err(e) => (Stage::Commit, Err(E::from(e))),
        }
    })
    .catch_unwind()
    .await;

    let committed = matches!(outcome, Ok((_, Ok(_))));
    if !committed {
        if let Err(e) = tx.rollback().await {
            tracing::warn!(error = %e, "rollback failed");
        }
    }

    match outcome {
        Ok(result) => result,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}
