//! Retrying read/write transactions that Spanner aborts.
//!
//! Spanner aborts read/write transactions that lose a lock conflict. The
//! whole transaction body has to run again on a fresh transaction, so the
//! body is a closure that is called once per attempt.
//!
//! # Example
//!
//! ```ignore
//! let outcome = run_transaction(cx, &conn, TxOptions::default(), |cx, conn| {
//!     Box::pin(async move {
//!         conn.execute(cx, "UPDATE accounts SET balance = balance - 10 WHERE id = ?", &[1.into()]).await
//!     })
//! })
//! .await;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use asupersync::{Cx, Outcome};
use rand::Rng;
use spanmodel_core::{Connection, Error, TxOptions};

/// Upper bound (exclusive) of the random backoff used when the server sends
/// no retry delay.
pub const MAX_RANDOM_BACKOFF_MS: u64 = 20;

/// Boxed future returned by a transaction body.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Outcome<T, Error>> + Send + 'a>>;

/// How often aborted transactions are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `None` retries until the
    /// transaction commits or fails with a non-abort error.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub const fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub const fn max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: Some(attempts),
        }
    }

    fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

/// Run `body` in a read/write transaction and retry it while Spanner aborts.
pub async fn run_transaction<C, T, F>(
    cx: &Cx,
    conn: &C,
    options: TxOptions,
    body: F,
) -> Outcome<T, Error>
where
    C: Connection,
    F: for<'c> FnMut(&'c Cx, &'c C) -> TxFuture<'c, T>,
{
    run_transaction_with_policy(cx, conn, options, RetryPolicy::default(), body).await
}

/// Like [`run_transaction`] with an explicit retry policy.
pub async fn run_transaction_with_policy<C, T, F>(
    cx: &Cx,
    conn: &C,
    options: TxOptions,
    policy: RetryPolicy,
    mut body: F,
) -> Outcome<T, Error>
where
    C: Connection,
    F: for<'c> FnMut(&'c Cx, &'c C) -> TxFuture<'c, T>,
{
    // Retries happen here, on a fresh transaction. The driver must not replay
    // the aborted one on its own.
    let options = options.retry_aborts_internally(false);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        let err = match attempt_once(cx, conn, &options, &mut body).await {
            Outcome::Ok(value) => {
                if attempt > 1 {
                    tracing::debug!(attempt, "Transaction committed after retry");
                }
                return Outcome::Ok(value);
            }
            Outcome::Err(e) => e,
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };
        if !err.is_aborted() || !policy.allows(attempt) {
            return Outcome::Err(err);
        }

        let delay = err.retry_delay().unwrap_or_else(random_backoff);
        tracing::warn!(
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "Transaction aborted, retrying"
        );
        match backoff(cx, delay).await {
            Outcome::Ok(()) => {}
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        }
    }
}

async fn attempt_once<C, T, F>(
    cx: &Cx,
    conn: &C,
    options: &TxOptions,
    body: &mut F,
) -> Outcome<T, Error>
where
    C: Connection,
    F: for<'c> FnMut(&'c Cx, &'c C) -> TxFuture<'c, T>,
{
    match conn.begin(cx, options).await {
        Outcome::Ok(()) => {}
        Outcome::Err(e) => return Outcome::Err(e),
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    }

    let value = match body(cx, conn).await {
        Outcome::Ok(value) => value,
        failed => {
            rollback_quietly(cx, conn).await;
            return failed;
        }
    };

    match conn.commit(cx).await {
        Outcome::Ok(()) => Outcome::Ok(value),
        Outcome::Err(e) => Outcome::Err(e),
        Outcome::Cancelled(r) => Outcome::Cancelled(r),
        Outcome::Panicked(p) => Outcome::Panicked(p),
    }
}

/// The body's failure is what the caller sees; a failed rollback is logged.
async fn rollback_quietly<C: Connection>(cx: &Cx, conn: &C) {
    match conn.rollback(cx).await {
        Outcome::Ok(()) => {}
        Outcome::Err(e) => tracing::warn!(error = %e, "Rollback failed"),
        Outcome::Cancelled(_) => tracing::warn!("Rollback was cancelled"),
        Outcome::Panicked(_) => tracing::warn!("Rollback panicked"),
    }
}

fn random_backoff() -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(0..MAX_RANDOM_BACKOFF_MS))
}

/// Sleep for `delay` on the runtime timer. Cancellation is observed before
/// the sleep starts and once it ends.
async fn backoff(cx: &Cx, delay: Duration) -> Outcome<(), Error> {
    if let Some(reason) = cx.cancel_reason() {
        return Outcome::Cancelled(reason);
    }
    if !delay.is_zero() {
        asupersync::time::sleep(cx.now(), delay).await;
    }
    match cx.cancel_reason() {
        Some(reason) => Outcome::Cancelled(reason),
        None => Outcome::Ok(()),
    }
}
