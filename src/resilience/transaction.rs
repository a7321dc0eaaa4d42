//! Transactional resource boundary.
//!
//! # Responsibilities
//! - Abstract the pool that hands out transactions and runs single statements
//! - Expose structured error codes when the transport has them
//!
//! # Design Decisions
//! - Every attempt gets its own transaction; handles are never reused
//! - `rollback` must be idempotent so release is safe on every exit path

use async_trait::async_trait;

/// Error surfaced by a transactional resource or a unit of work.
pub trait DatabaseError: std::error::Error + Send + Sync + 'static {
    /// Structured status code (SQLSTATE or store-specific), if the transport exposes one.
    fn code(&self) -> Option<&str> {
        None
    }
}

/// An open transaction.
#[async_trait]
pub trait Transaction: Send {
    type Error: DatabaseError;

    async fn commit(&mut self) -> Result<(), Self::Error>;

    /// Roll back the transaction. A no-op after a successful commit.
    async fn rollback(&mut self) -> Result<(), Self::Error>;
}

/// A resource (usually a connection pool) that can start transactions.
///
/// Must be safe for concurrent `begin` calls.
#[async_trait]
pub trait TransactionalResource: Send + Sync {
    type Error: DatabaseError;
    type Transaction: Transaction<Error = Self::Error>;

    async fn begin(&self) -> Result<Self::Transaction, Self::Error>;

    /// Execute a single statement outside an explicit transaction.
    async fn exec(&self, statement: &str) -> Result<(), Self::Error>;
}
