//! Isolation policies: the bulkhead envelope each endpoint is executed in.
//!
//! A policy only *describes* the envelope (capacity, time budget, what happens
//! on timeout). Enforcing it is the execution collaborator's job. Factories
//! are stateless and pure given an [`EndpointIdentity`]; a custom factory
//! replaces the default wholesale, there is no field-level merging.

use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{CommandKey, EndpointIdentity, GroupKey};

/// How isolated work is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationStrategy {
    /// On a dedicated worker, so a blocked call cannot stall the caller.
    Thread,
    /// On the caller's own task, guarded only by a concurrency permit.
    Semaphore,
}

/// Immutable isolation envelope for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IsolationPolicy {
    group_key: GroupKey,
    command_key: CommandKey,
    thread_pool_size: usize,
    execution_timeout_ms: u64,
    isolation_strategy: IsolationStrategy,
    interrupt_on_timeout: bool,
    fallback_enabled: bool,
}

impl IsolationPolicy {
    pub const DEFAULT_THREAD_POOL_SIZE: usize = 10;
    pub const DEFAULT_EXECUTION_TIMEOUT_MS: u64 = 30_000;

    /// The default envelope for `identity`: thread isolation, 10 workers,
    /// 30 s budget, interrupt on timeout, fallback disabled.
    pub fn new(identity: &EndpointIdentity) -> Self {
        Self {
            group_key: identity.group_key().clone(),
            command_key: identity.command_key().clone(),
            thread_pool_size: Self::DEFAULT_THREAD_POOL_SIZE,
            execution_timeout_ms: Self::DEFAULT_EXECUTION_TIMEOUT_MS,
            isolation_strategy: IsolationStrategy::Thread,
            interrupt_on_timeout: true,
            fallback_enabled: false,
        }
    }

    pub fn with_thread_pool_size(mut self, size: NonZeroUsize) -> Self {
        self.thread_pool_size = size.get();
        self
    }

    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_isolation_strategy(mut self, strategy: IsolationStrategy) -> Self {
        self.isolation_strategy = strategy;
        self
    }

    pub fn with_interrupt_on_timeout(mut self, interrupt: bool) -> Self {
        self.interrupt_on_timeout = interrupt;
        self
    }

    pub fn with_fallback_enabled(mut self, enabled: bool) -> Self {
        self.fallback_enabled = enabled;
        self
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    pub fn command_key(&self) -> &CommandKey {
        &self.command_key
    }

    /// The identity this policy was created for.
    pub fn identity(&self) -> EndpointIdentity {
        EndpointIdentity::new(self.group_key.clone(), self.command_key.clone())
    }

    /// Maximum number of concurrently executing calls.
    pub fn thread_pool_size(&self) -> usize {
        self.thread_pool_size
    }

    pub fn execution_timeout_ms(&self) -> u64 {
        self.execution_timeout_ms
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }

    pub fn isolation_strategy(&self) -> IsolationStrategy {
        self.isolation_strategy
    }

    pub fn interrupt_on_timeout(&self) -> bool {
        self.interrupt_on_timeout
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }
}

/// Produces the isolation policy for an endpoint.
///
/// Implementations must be pure: the same identity always yields an equal
/// policy. Callers may cache the result.
pub trait IsolationPolicyFactory: Send + Sync + fmt::Debug {
    fn create_policy(&self, identity: &EndpointIdentity) -> IsolationPolicy;
}

/// The factory used when none is configured. See [`IsolationPolicy::new`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIsolationPolicyFactory;

impl IsolationPolicyFactory for DefaultIsolationPolicyFactory {
    fn create_policy(&self, identity: &EndpointIdentity) -> IsolationPolicy {
        IsolationPolicy::new(identity)
    }
}

/// Applies the same envelope to every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIsolationPolicyFactory {
    pub thread_pool_size: NonZeroUsize,
    pub execution_timeout: Duration,
    pub isolation_strategy: IsolationStrategy,
    pub interrupt_on_timeout: bool,
    pub fallback_enabled: bool,
}

impl Default for FixedIsolationPolicyFactory {
    fn default() -> Self {
        Self {
            thread_pool_size: NonZeroUsize::new(IsolationPolicy::DEFAULT_THREAD_POOL_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            execution_timeout: Duration::from_millis(IsolationPolicy::DEFAULT_EXECUTION_TIMEOUT_MS),
            isolation_strategy: IsolationStrategy::Thread,
            interrupt_on_timeout: true,
            fallback_enabled: false,
        }
    }
}

impl IsolationPolicyFactory for FixedIsolationPolicyFactory {
    fn create_policy(&self, identity: &EndpointIdentity) -> IsolationPolicy {
        IsolationPolicy::new(identity)
            .with_thread_pool_size(self.thread_pool_size)
            .with_execution_timeout(self.execution_timeout)
            .with_isolation_strategy(self.isolation_strategy)
            .with_interrupt_on_timeout(self.interrupt_on_timeout)
            .with_fallback_enabled(self.fallback_enabled)
    }
}
