//! Blob store capability and the retry decorator applied to it.
//!
//! The lifecycle engine only ever sees `dyn BlobStore`. Concrete stores
//! report failures as [`BlobError`]; only [`BlobError::Transient`] is worth
//! another attempt.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Blob store errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlobError {
    /// No blob exists for the handle.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The operation may succeed if tried again.
    #[error("transient blob store failure: {0}")]
    Transient(String),

    /// The operation will not succeed on retry.
    #[error("blob store failure: {0}")]
    Permanent(String),

    /// Every attempt allowed by the retry policy failed.
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Message of the last failure.
        last: String,
    },
}

impl BlobError {
    /// Whether the retry policy should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlobError::Transient(_))
    }

    /// Number of store calls behind this error.
    pub fn attempts(&self) -> u32 {
        match self {
            BlobError::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}

/// Location of a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Opaque handle used to delete the blob later.
    pub handle: String,
    /// Public retrieval URL.
    pub url: String,
}

/// Object storage capability.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under a name derived from `name`.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError>;

    /// Delete the blob behind `handle`.
    async fn delete(&self, handle: &str) -> Result<(), BlobError>;
}

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// Same delay before every retry.
    #[default]
    Fixed,
    /// Delay doubles with each retry.
    Exponential,
}

/// How many times to try a blob operation and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed-delay policy. `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Single attempt, no waiting.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Set the backoff mode.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Total attempts allowed.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait before `attempt` (1-based). The first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential => {
                let exp = (attempt - 2).min(16);
                self.delay.saturating_mul(1u32 << exp)
            }
        }
    }

    /// Run `op` until it succeeds, fails permanently or the budget runs out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T, BlobError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, BlobError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(operation = what, attempt, "Blob operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_before(attempt + 1);
                    warn!(
                        operation = what,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Blob operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_retryable() => {
                    return Err(BlobError::Exhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Decorator applying a [`RetryPolicy`] to every operation of a store.
pub struct RetryingBlobStore<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: BlobStore> RetryingBlobStore<S> {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: BlobStore> BlobStore for RetryingBlobStore<S> {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredBlob, BlobError> {
        self.policy
            .run("put", || self.inner.put(name, bytes))
            .await
    }

    async fn delete(&self, handle: &str) -> Result<(), BlobError> {
        self.policy
            .run("delete", || self.inner.delete(handle))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with `error` for the first `failures` calls.
    struct Flaky {
        failures: u32,
        error: BlobError,
        calls: AtomicU32,
    }

    impl Flaky {
        fn new(failures: u32, error: BlobError) -> Self {
            Self {
                failures,
                error,
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> Result<(), BlobError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl BlobStore for Flaky {
        async fn put(&self, name: &str, _bytes: &[u8]) -> Result<StoredBlob, BlobError> {
            self.next()?;
            Ok(StoredBlob {
                handle: name.to_string(),
                url: format!("/blobs/{name}"),
            })
        }

        async fn delete(&self, _handle: &str) -> Result<(), BlobError> {
            self.next()
        }
    }

    fn quick(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[test]
    fn test_fixed_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(2));
    }

    #[test]
    fn test_exponential_delays() {
        let policy =
            RetryPolicy::new(4, Duration::from_millis(50)).with_backoff(Backoff::Exponential);
        assert_eq!(policy.delay_before(2), Duration::from_millis(50));
        assert_eq!(policy.delay_before(3), Duration::from_millis(100));
        assert_eq!(policy.delay_before(4), Duration::from_millis(200));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let store = RetryingBlobStore::new(Flaky::new(2, BlobError::Transient("503".into())), quick(3));

        let blob = store.put("a.txt", b"hi").await.unwrap();
        assert_eq!(blob.handle, "a.txt");
        assert_eq!(store.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted() {
        let store = RetryingBlobStore::new(Flaky::new(5, BlobError::Transient("503".into())), quick(3));

        let err = store.put("a.txt", b"hi").await.unwrap_err();
        assert_eq!(err.attempts(), 3);
        assert!(matches!(err, BlobError::Exhausted { attempts: 3, .. }));
        assert_eq!(store.inner().calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_not_retried() {
        let store = RetryingBlobStore::new(Flaky::new(5, BlobError::Permanent("denied".into())), quick(3));

        let err = store.delete("h").await.unwrap_err();
        assert_eq!(err, BlobError::Permanent("denied".into()));
        assert_eq!(store.inner().calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_not_retried() {
        let store = RetryingBlobStore::new(Flaky::new(5, BlobError::NotFound("h".into())), quick(3));

        assert!(matches!(store.delete("h").await, Err(BlobError::NotFound(_))));
        assert_eq!(store.inner().calls(), 1);
    }
}
