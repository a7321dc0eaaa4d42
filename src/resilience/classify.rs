//! OCC conflict classification.
//!
//! # Responsibilities
//! - Decide whether an error is an optimistic-concurrency conflict
//!
//! # Design Decisions
//! - A structured code, when present, decides on its own:
//!   `OC000`, `OC001` and SQLSTATE `40001` are conflicts, anything else is fatal
//! - Without a code, fall back to looking for `OC000`/`OC001` in the messages of
//!   the error and its sources; some transports only surface text

use std::error::Error;

use crate::resilience::transaction::DatabaseError;
use crate::resilience::types::{
    AttemptOutcome, ERROR_CODE_MUTATION, ERROR_CODE_SCHEMA, SQLSTATE_SERIALIZATION_FAILURE,
};

/// Check if a structured error code denotes an OCC conflict.
pub fn is_occ_code(code: &str) -> bool {
    matches!(
        code,
        ERROR_CODE_MUTATION | ERROR_CODE_SCHEMA | SQLSTATE_SERIALIZATION_FAILURE
    )
}

/// Check if an error is an OCC conflict that is safe to retry.
pub fn is_occ_error<E: DatabaseError>(err: &E) -> bool {
    match err.code() {
        Some(code) => is_occ_code(code),
        None => mentions_occ_code(err),
    }
}

/// Like [`is_occ_error`], for an optional error. `None` is never a conflict.
pub fn is_occ_error_opt<E: DatabaseError>(err: Option<&E>) -> bool {
    err.is_some_and(is_occ_error)
}

/// Classify the result of one attempt.
pub fn classify<T, E: DatabaseError>(result: Result<T, E>) -> AttemptOutcome<T, E> {
    match result {
        Ok(value) => AttemptOutcome::Success(value),
        Err(err) if is_occ_error(&err) => AttemptOutcome::RetryableConflict(err),
        Err(err) => AttemptOutcome::FatalError(err),
    }
}

fn mentions_occ_code(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let message = e.to_string();
        if message.contains(ERROR_CODE_MUTATION) || message.contains(ERROR_CODE_SCHEMA) {
            return true;
        }
        current = e.source();
    }
    false
}
