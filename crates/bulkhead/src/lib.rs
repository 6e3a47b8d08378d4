//! Courier bulkhead executor.
//!
//! Runs units of work under the envelope an [`dispatch::IsolationPolicy`]
//! describes: at most `thread_pool_size` concurrent executions per endpoint,
//! each bounded by the policy's execution timeout.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** The [`dispatch`] crate only describes isolation; this
//! crate enforces it on the tokio runtime.
//!
//! ## Capacity and queuing
//!
//! Every [`dispatch::EndpointIdentity`] gets its own pool, created on first
//! use and sized from the first policy seen for it. A call arriving while all
//! slots are busy is rejected immediately; nothing is queued.
//!
//! ## Timeouts
//!
//! - [`IsolationStrategy::Thread`](dispatch::IsolationStrategy::Thread): the
//!   work runs on its own task. On timeout the task is aborted when the policy
//!   asks for interruption; otherwise it is detached and keeps its slot until
//!   it finishes.
//! - [`IsolationStrategy::Semaphore`](dispatch::IsolationStrategy::Semaphore):
//!   the work runs on the caller's task and is dropped on timeout.

mod executor;

pub use executor::{BulkheadError, BulkheadExecutor};
