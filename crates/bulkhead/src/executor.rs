//! Per-endpoint pools and the execution loop.
//!
//! Uses DashMap so concurrent callers of different endpoints never contend on
//! a global lock when looking up their pool.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use dispatch::{EndpointIdentity, IsolationPolicy, IsolationStrategy};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Why isolated work did not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BulkheadError {
    /// Every slot of the endpoint's pool was busy.
    #[error("bulkhead full: all {capacity} slots in use")]
    Rejected { capacity: usize },

    /// The execution timeout elapsed.
    #[error("execution timed out after {} ms", .timeout.as_millis())]
    TimedOut { timeout: Duration },

    /// The work panicked on its isolated task.
    #[error("isolated work panicked: {message}")]
    Panicked { message: String },

    /// The isolated task was cancelled before completing.
    #[error("isolated work was cancelled")]
    Cancelled,
}

#[derive(Debug)]
struct Pool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Enforces isolation policies.
///
/// Share one executor (behind an `Arc`) between every client whose calls
/// should share pools; pools are keyed by endpoint identity, not by client.
#[derive(Debug, Default)]
pub struct BulkheadExecutor {
    pools: DashMap<EndpointIdentity, Arc<Pool>>,
}

impl BulkheadExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn pool(&self, policy: &IsolationPolicy) -> Arc<Pool> {
        self.pools
            .entry(policy.identity())
            .or_insert_with(|| {
                debug!(
                    group = %policy.group_key(),
                    command = %policy.command_key(),
                    capacity = policy.thread_pool_size(),
                    "creating bulkhead pool"
                );
                Arc::new(Pool {
                    permits: Arc::new(Semaphore::new(policy.thread_pool_size())),
                    capacity: policy.thread_pool_size(),
                })
            })
            .clone()
    }

    /// Number of executions currently holding a slot for `identity`.
    pub fn in_flight(&self, identity: &EndpointIdentity) -> usize {
        self.pools
            .get(identity)
            .map(|pool| pool.capacity - pool.permits.available_permits())
            .unwrap_or(0)
    }

    /// Size of the pool for `identity`, if one has been created.
    pub fn capacity(&self, identity: &EndpointIdentity) -> Option<usize> {
        self.pools.get(identity).map(|pool| pool.capacity)
    }

    /// Runs `work` inside the envelope `policy` describes.
    pub async fn execute<F, T>(&self, policy: &IsolationPolicy, work: F) -> Result<T, BulkheadError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool(policy);
        let permit = match Arc::clone(&pool.permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!(
                    group = %policy.group_key(),
                    command = %policy.command_key(),
                    capacity = pool.capacity,
                    "bulkhead full, rejecting call"
                );
                return Err(BulkheadError::Rejected {
                    capacity: pool.capacity,
                });
            }
        };
        let budget = policy.execution_timeout();

        match policy.isolation_strategy() {
            IsolationStrategy::Thread => {
                let mut handle = tokio::spawn(async move {
                    let _permit = permit;
                    work.await
                });
                match timeout(budget, &mut handle).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(join_error)) if join_error.is_panic() => Err(BulkheadError::Panicked {
                        message: panic_message(join_error.into_panic()),
                    }),
                    Ok(Err(_)) => Err(BulkheadError::Cancelled),
                    Err(_) => {
                        if policy.interrupt_on_timeout() {
                            handle.abort();
                        }
                        warn!(
                            command = %policy.command_key(),
                            timeout_ms = policy.execution_timeout_ms(),
                            interrupted = policy.interrupt_on_timeout(),
                            "execution timed out"
                        );
                        Err(BulkheadError::TimedOut { timeout: budget })
                    }
                }
            }
            IsolationStrategy::Semaphore => {
                let _permit = permit;
                timeout(budget, work).await.map_err(|_| {
                    warn!(
                        command = %policy.command_key(),
                        timeout_ms = policy.execution_timeout_ms(),
                        "execution timed out"
                    );
                    BulkheadError::TimedOut { timeout: budget }
                })
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
