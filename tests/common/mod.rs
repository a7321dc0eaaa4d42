//! Shared mocks for integration and load testing.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use dsql_resilience::credentials::{IssueError, IssueRequest, TokenIssuer};
use dsql_resilience::resilience::{DatabaseError, Transaction, TransactionalResource};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Identity service
// ---------------------------------------------------------------------------

/// What the mock issuer does on a given call.
#[derive(Debug, Clone)]
pub enum IssueScript {
    Token,
    Fail(&'static str),
    Empty,
}

/// Issuer that counts calls and remembers when each token was issued.
#[derive(Default)]
pub struct CountingIssuer {
    pub calls: AtomicU32,
    pub delay: Duration,
    script: Mutex<VecDeque<IssueScript>>,
    issued: Mutex<Vec<(String, Instant)>>,
    users: Mutex<Vec<(String, bool)>>,
}

impl CountingIssuer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    pub fn scripted(script: Vec<IssueScript>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Instant at which `token` was handed out.
    pub fn issued_at(&self, token: &str) -> Option<Instant> {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, at)| *at)
    }

    /// (user, is_admin) for every issuance request seen.
    pub fn requests(&self) -> Vec<(String, bool)> {
        self.users.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenIssuer for CountingIssuer {
    async fn issue(&self, request: &IssueRequest<'_>) -> Result<String, IssueError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .unwrap()
            .push((request.user.to_string(), request.is_admin()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let step = self.script.lock().unwrap().pop_front().unwrap_or(IssueScript::Token);
        match step {
            IssueScript::Token => {
                let token = format!("{}@{}/{}#{}", request.user, request.host, request.region, n);
                self.issued.lock().unwrap().push((token.clone(), Instant::now()));
                Ok(token)
            }
            IssueScript::Fail(message) => Err(message.into()),
            IssueScript::Empty => Ok(String::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct MockError {
    pub code: Option<String>,
    pub message: String,
}

impl MockError {
    /// Conflict as reported by DSQL: SQLSTATE 40001 with the OC code in the text.
    pub fn conflict() -> Self {
        Self {
            code: Some("40001".to_string()),
            message: "ERROR: change conflicts with another transaction, please retry: (OC000)"
                .to_string(),
        }
    }

    /// Schema conflict from a transport that only exposes text.
    pub fn text_conflict() -> Self {
        Self {
            code: None,
            message: "ERROR: schema has been updated by another transaction, please retry: (OC001)"
                .to_string(),
        }
    }

    pub fn fatal(message: &str) -> Self {
        Self {
            code: Some("23505".to_string()),
            message: message.to_string(),
        }
    }
}

impl DatabaseError for MockError {
    fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Scripted resource
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptState {
    pub begins: AtomicU32,
    pub commits: AtomicU32,
    pub rollbacks: AtomicU32,
    pub execs: AtomicU32,
    panic_on_commit: AtomicBool,
    begin_results: Mutex<VecDeque<Result<(), MockError>>>,
    commit_results: Mutex<VecDeque<Result<(), MockError>>>,
    exec_results: Mutex<VecDeque<Result<(), MockError>>>,
}

/// Resource whose begin/commit/exec outcomes are scripted; unscripted calls succeed.
#[derive(Clone, Default)]
pub struct ScriptedResource {
    pub state: Arc<ScriptState>,
}

impl ScriptedResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_begin(&self, results: Vec<Result<(), MockError>>) {
        self.state.begin_results.lock().unwrap().extend(results);
    }

    pub fn script_commit(&self, results: Vec<Result<(), MockError>>) {
        self.state.commit_results.lock().unwrap().extend(results);
    }

    /// Make the next commit panic instead of returning.
    pub fn script_commit_panic(&self) {
        self.state.panic_on_commit.store(true, Ordering::SeqCst);
    }

    pub fn script_exec(&self, results: Vec<Result<(), MockError>>) {
        self.state.exec_results.lock().unwrap().extend(results);
    }

    pub fn begins(&self) -> u32 {
        self.state.begins.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u32 {
        self.state.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> u32 {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    pub fn execs(&self) -> u32 {
        self.state.execs.load(Ordering::SeqCst)
    }
}

pub struct ScriptedTx {
    state: Arc<ScriptState>,
    committed: bool,
    rolled_back: bool,
}

#[async_trait]
impl Transaction for ScriptedTx {
    type Error = MockError;

    async fn commit(&mut self) -> Result<(), MockError> {
        if self.state.panic_on_commit.swap(false, Ordering::SeqCst) {
            panic!("commit panicked");
        }
        let result = self
            .state
            .commit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.committed = true;
            self.state.commits.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn rollback(&mut self) -> Result<(), MockError> {
        if !self.committed && !self.rolled_back {
            self.rolled_back = true;
            self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionalResource for ScriptedResource {
    type Error = MockError;
    type Transaction = ScriptedTx;

    async fn begin(&self) -> Result<ScriptedTx, MockError> {
        self.state.begins.fetch_add(1, Ordering::SeqCst);
        let result = self
            .state
            .begin_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        result.map(|()| ScriptedTx {
            state: Arc::clone(&self.state),
            committed: false,
            rolled_back: false,
        })
    }

    async fn exec(&self, _statement: &str) -> Result<(), MockError> {
        self.state.execs.fetch_add(1, Ordering::SeqCst);
        self.state
            .exec_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// Optimistic store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Committed {
    version: u64,
    balance: i64,
}

/// A single-row store with first-committer-wins semantics.
///
/// Transactions snapshot the row at begin; commit fails with OC000 if another
/// transaction committed in between.
#[derive(Clone, Default)]
pub struct OptimisticStore {
    row: Arc<Mutex<Committed>>,
    pub conflicts: Arc<AtomicU32>,
}

impl OptimisticStore {
    pub fn balance(&self) -> i64 {
        self.row.lock().unwrap().balance
    }
}

pub struct OptimisticTx {
    row: Arc<Mutex<Committed>>,
    conflicts: Arc<AtomicU32>,
    read_version: u64,
    pub balance: i64,
    committed: bool,
}

#[async_trait]
impl Transaction for OptimisticTx {
    type Error = MockError;

    async fn commit(&mut self) -> Result<(), MockError> {
        let mut row = self.row.lock().unwrap();
        if row.version != self.read_version {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
            return Err(MockError::conflict());
        }
        row.version += 1;
        row.balance = self.balance;
        self.committed = true;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MockError> {
        Ok(())
    }
}

#[async_trait]
impl TransactionalResource for OptimisticStore {
    type Error = MockError;
    type Transaction = OptimisticTx;

    async fn begin(&self) -> Result<OptimisticTx, MockError> {
        let row = self.row.lock().unwrap();
        Ok(OptimisticTx {
            row: Arc::clone(&self.row),
            conflicts: Arc::clone(&self.conflicts),
            read_version: row.version,
            balance: row.balance,
            committed: false,
        })
    }

    async fn exec(&self, _statement: &str) -> Result<(), MockError> {
        Ok(())
    }
}
