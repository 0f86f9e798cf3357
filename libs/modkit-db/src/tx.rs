//! Transactions with bounded retries on serialization / busy conflicts.
//!
//! PostgreSQL transactions run at `SERIALIZABLE`; SQLite serializes writers with
//! its database lock. In both cases a concurrent writer can make a transaction
//! fail with a transient error, and the whole body is replayed.
//!
//! A deferred SQLite transaction that reads before it writes cannot wait for
//! the write lock: the upgrade fails with `SQLITE_BUSY` at once. Every SQLite
//! transaction therefore writes the one-row gate table first, which takes the
//! write lock under `busy_timeout` the way `BEGIN IMMEDIATE` would.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, IsolationLevel,
    TransactionTrait,
};

/// Created on every SQLite connect; holds a single row.
pub(crate) const SQLITE_WRITE_GATE_DDL: &str =
    "CREATE TABLE IF NOT EXISTS modkit_write_gate (id INTEGER PRIMARY KEY)";
const SQLITE_TAKE_WRITE_LOCK: &str = "REPLACE INTO modkit_write_gate (id) VALUES (1)";

/// Future returned by a transaction body borrowing the transaction for `'c`.
pub type TxFuture<'c, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'c>>;

/// Errors that may go away when the transaction is replayed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for DbErr {
    fn is_retryable(&self) -> bool {
        is_retryable_message(&self.to_string())
    }
}

impl Retryable for anyhow::Error {
    fn is_retryable(&self) -> bool {
        self.chain().any(|e| is_retryable_message(&e.to_string()))
    }
}

/// SQLite busy/locked and PostgreSQL serialization failure / deadlock messages.
pub fn is_retryable_message(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    [
        "database is locked",
        "database table is locked",
        "sqlite_busy",
        "could not serialize access",
        "40001",
        "deadlock detected",
        "40p01",
    ]
    .iter()
    .any(|needle| msg.contains(needle))
}

#[derive(Clone, Copy, Debug)]
pub struct TxPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Sleep before attempt `n + 1` is `n × backoff`.
    pub backoff: Duration,
}

impl Default for TxPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(25),
        }
    }
}

/// Begin a write transaction: serializable on PostgreSQL, holding the write
/// lock from the first statement on SQLite.
pub async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, DbErr> {
    match db.get_database_backend() {
        DbBackend::Postgres => {
            db.begin_with_config(Some(IsolationLevel::Serializable), None)
                .await
        }
        DbBackend::Sqlite => {
            let txn = db.begin().await?;
            txn.execute_unprepared(SQLITE_TAKE_WRITE_LOCK).await?;
            Ok(txn)
        }
        _ => db.begin().await,
    }
}

/// Run `body` inside a transaction and commit it.
///
/// Errors roll the transaction back. Retryable errors, including ones raised by
/// `COMMIT`, replay `body` on a fresh transaction up to `policy.max_attempts`.
pub async fn transact<T, E, F>(db: &DatabaseConnection, policy: TxPolicy, mut body: F) -> Result<T, E>
where
    F: for<'c> FnMut(&'c DatabaseTransaction) -> TxFuture<'c, T, E>,
    E: From<DbErr> + Retryable + std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match run_once(db, &mut body).await {
            Err(e) if attempt < policy.max_attempts && e.is_retryable() => {
                tracing::debug!(attempt, error = %e, "transaction conflict, retrying");
                tokio::time::sleep(policy.backoff * attempt).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn run_once<T, E, F>(db: &DatabaseConnection, body: &mut F) -> Result<T, E>
where
    F: for<'c> FnMut(&'c DatabaseTransaction) -> TxFuture<'c, T, E>,
    E: From<DbErr>,
{
    let txn = begin(db).await?;
    let outcome = body(&txn).await;
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rb) = txn.rollback().await {
                tracing::warn!(error = %rb, "rollback failed");
            }
            Err(e)
        }
    }
}
