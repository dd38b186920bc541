//! # Bounded Retry Execution
//!
//! Every network-mutating operation of the importer runs under a
//! [`RetryPolicy`]: a failed attempt is logged at `warn` and re-attempted
//! immediately, and only the last failure is surfaced once the attempts are
//! used up. There is no backoff between attempts.
//!
//! ```ignore
//! use core_runtime::retry::RetryPolicy;
//!
//! let policy = RetryPolicy::default();
//! let address = policy
//!     .run("upload thumbnail", |_| store.upload_file(&batch_id, file.clone(), true))
//!     .await?;
//! ```
//!
//! Operations that need mutable state between attempts (a writer rewound to
//! the start of a byte range, for instance) drive a [`RetryBudget`]
//! themselves instead of passing a closure.

use std::fmt;
use std::future::Future;
use tracing::warn;

/// Retry bound used when none is configured
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Attempt bound for one class of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy; a bound of zero is raised to a single attempt
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    /// Policy that never retries
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Start tracking attempts for a hand-driven retry loop
    pub fn budget(&self, operation: impl Into<String>) -> RetryBudget {
        RetryBudget {
            operation: operation.into(),
            max_attempts: self.max_attempts,
            attempt: 1,
        }
    }

    /// Run `op` until it succeeds or the attempts are exhausted
    ///
    /// The closure receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, op: F) -> Result<T, RetryError<E>>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_classified(operation, |_| true, op).await
    }

    /// Like [`run`](Self::run), but errors for which `retryable` returns
    /// `false` are surfaced immediately as [`RetryError::Aborted`]
    pub async fn run_classified<T, E, F, Fut, P>(
        &self,
        operation: &str,
        retryable: P,
        mut op: F,
    ) -> Result<T, RetryError<E>>
    where
        E: fmt::Display,
        P: Fn(&E) -> bool,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut budget = self.budget(operation);

        loop {
            match op(budget.attempt()).await {
                Ok(value) => return Ok(value),
                Err(error) if !retryable(&error) => return Err(budget.abort(error)),
                Err(error) => budget.record_failure(error)?,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Attempt counter for one operation
#[derive(Debug, Clone)]
pub struct RetryBudget {
    operation: String,
    max_attempts: u32,
    attempt: u32,
}

impl RetryBudget {
    /// 1-based number of the attempt currently in flight
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Record a failed attempt
    ///
    /// Returns `Ok(())` when another attempt is allowed, or the exhaustion
    /// error carrying `error` when this was the last one.
    pub fn record_failure<E: fmt::Display>(&mut self, error: E) -> Result<(), RetryError<E>> {
        if self.attempt >= self.max_attempts {
            return Err(RetryError::Exhausted {
                operation: self.operation.clone(),
                attempts: self.attempt,
                last_error: error,
            });
        }

        warn!(
            operation = %self.operation,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            error = %error,
            "Attempt failed, retrying"
        );
        self.attempt += 1;
        Ok(())
    }

    /// Surface `error` without spending the remaining attempts
    pub fn abort<E>(&self, error: E) -> RetryError<E> {
        RetryError::Aborted {
            operation: self.operation.clone(),
            attempt: self.attempt,
            error,
        }
    }
}

/// Final failure of a retried operation
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed; `last_error` is the final failure
    Exhausted {
        operation: String,
        attempts: u32,
        last_error: E,
    },
    /// A non-retryable failure stopped the loop early
    Aborted {
        operation: String,
        attempt: u32,
        error: E,
    },
}

impl<E> RetryError<E> {
    pub fn operation(&self) -> &str {
        match self {
            RetryError::Exhausted { operation, .. } | RetryError::Aborted { operation, .. } => {
                operation
            }
        }
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Aborted { attempt, .. } => *attempt,
        }
    }

    pub fn last_error(&self) -> &E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
            RetryError::Aborted { error, .. } => error,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last_error, .. } => last_error,
            RetryError::Aborted { error, .. } => error,
        }
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted {
                operation,
                attempts,
                last_error,
            } => write!(
                f,
                "{} failed after {} attempts: {}",
                operation, attempts, last_error
            ),
            RetryError::Aborted {
                operation,
                attempt,
                error,
            } => write!(
                f,
                "{} aborted on attempt {}: {}",
                operation, attempt, error
            ),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.last_error())
    }
}
