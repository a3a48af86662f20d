//! Per-execution-context connection handles
//!
//! A physical database connection must not be used concurrently by two OS
//! threads, or after a fork without being re-established. The registry keys
//! each handle by an execution-context identity so that every context owns
//! exactly one handle that only it touches, and no locking is needed around
//! the handle itself.
//!
//! The registry is an explicit object owned by the composition root, not a
//! process-wide global, so context isolation is testable without actually
//! forking or spawning threads.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use sqlx::SqlitePool;
use tracing::{debug, info};

use sesskeep_core::Result;

use crate::config::StoreConfig;
use crate::schema;

/// Identity of one execution context.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct ContextKey(String);

impl ContextKey {
    /// Key for the calling process and thread. A forked child or a new
    /// thread produces a different key and therefore a fresh handle.
    pub fn current() -> Self {
        Self(format!(
            "{}:{:?}",
            std::process::id(),
            std::thread::current().id()
        ))
    }

    /// Explicit worker token, for composition roots that hand each worker
    /// its own identity (and for tests that simulate separate processes).
    pub fn worker(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A resolved connection plus the table and column names it was built with.
///
/// Handles live for the life of their context; the engine never tears them
/// down.
pub struct ConnectionHandle {
    pool: SqlitePool,
    resultset_name: String,
    id_column: String,
    data_column: String,
}

impl ConnectionHandle {
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn resultset_name(&self) -> &str {
        &self.resultset_name
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    pub fn data_column(&self) -> &str {
        &self.data_column
    }
}

/// Cache of connection handles, one per execution context.
#[derive(Default)]
pub struct ConnectionRegistry {
    handles: DashMap<ContextKey, Arc<ConnectionHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for `ctx`, building one from `config` on first use.
    ///
    /// Idempotent per key: once a context has resolved a handle, later calls
    /// return it unchanged, and configuration given by those later calls is
    /// ignored. Reconfiguring an engine therefore takes effect only in
    /// contexts that have not issued an operation yet.
    pub async fn handle(
        &self,
        ctx: &ContextKey,
        config: &StoreConfig,
    ) -> Result<Arc<ConnectionHandle>> {
        if let Some(existing) = self.handles.get(ctx) {
            debug!(context = %ctx, "reusing connection handle");
            return Ok(existing.clone());
        }

        let pool = schema::resolve(config).await?;
        let built = Arc::new(ConnectionHandle {
            pool,
            resultset_name: config.resultset_name.clone(),
            id_column: config.id_column.clone(),
            data_column: config.data_column.clone(),
        });

        // The key's owner is normally its only caller; entry() keeps the
        // one-handle-per-context invariant even if two tasks share a key.
        let handle = self
            .handles
            .entry(ctx.clone())
            .or_insert_with(|| built)
            .clone();

        info!(
            context = %ctx,
            resultset = %handle.resultset_name,
            "resolved connection handle"
        );
        Ok(handle)
    }

    /// Number of contexts holding a handle.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether `ctx` has resolved a handle already.
    pub fn contains(&self, ctx: &ContextKey) -> bool {
        self.handles.contains_key(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_key_is_stable_within_a_thread() {
        assert_eq!(ContextKey::current(), ContextKey::current());
    }

    #[test]
    fn worker_keys_differ_by_token() {
        assert_ne!(ContextKey::worker("w1"), ContextKey::worker("w2"));
        assert_eq!(ContextKey::worker("w1"), ContextKey::worker("w1"));
    }

    #[test]
    fn current_key_differs_across_threads() {
        let here = ContextKey::current();
        let there = std::thread::spawn(ContextKey::current).join().unwrap();
        assert_ne!(here, there);
    }
}
