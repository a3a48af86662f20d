//! SessionStore - create/read/delete façade over the configured table
//!
//! Every operation addresses a row by a caller-supplied session identifier.
//! The store never generates identifiers, never expires rows, and never
//! repairs or deletes corrupt ones; each failure is surfaced once,
//! immediately, with the identifier involved.

use std::sync::Arc;

use sqlx::Row;
use tracing::debug;

use sesskeep_core::{Error, Result, SerializerKind, SessionValue};

use crate::config::StoreConfig;
use crate::registry::{ConnectionHandle, ConnectionRegistry, ContextKey};
use crate::schema::quote_ident;

/// Session record store.
///
/// Writes go through a single upsert statement, so concurrent flushes for
/// the same identifier from different contexts race only at the storage
/// layer; the store adds no application-level locking.
pub struct SessionStore {
    config: StoreConfig,
    registry: Arc<ConnectionRegistry>,
    context: ContextKey,
}

impl SessionStore {
    /// Build a store with its own private registry, keyed by the calling
    /// process and thread.
    ///
    /// # Errors
    /// - `Error::Configuration` for malformed configuration; connection and
    ///   schema failures surface on first operation per context
    pub fn new(config: StoreConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(ConnectionRegistry::new()))
    }

    /// Build a store sharing `registry`, keyed by the calling process and
    /// thread.
    pub fn with_registry(config: StoreConfig, registry: Arc<ConnectionRegistry>) -> Result<Self> {
        Self::in_context(config, registry, ContextKey::current())
    }

    /// Build a store bound to an explicit execution context. Composition
    /// roots that manage worker identities use this to make handle isolation
    /// explicit (and testable) instead of relying on process/thread ids.
    pub fn in_context(
        config: StoreConfig,
        registry: Arc<ConnectionRegistry>,
        context: ContextKey,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            context,
        })
    }

    /// Serialize `value` and upsert it under `id`: the row is updated when
    /// `id` exists and inserted otherwise, so flush never reports not-found.
    ///
    /// # Errors
    /// - `Error::Serialization` if the value cannot be encoded
    /// - `Error::Storage` if the upsert itself fails
    pub async fn flush(&self, id: &str, value: &SessionValue) -> Result<()> {
        let payload = self.config.serializer.encode(value)?;
        let handle = self.handle().await?;

        let sql = format!(
            "INSERT INTO {table} ({id_col}, {data_col}) VALUES (?1, ?2) \
             ON CONFLICT({id_col}) DO UPDATE SET {data_col} = excluded.{data_col}",
            table = quote_ident(handle.resultset_name()),
            id_col = quote_ident(handle.id_column()),
            data_col = quote_ident(handle.data_column()),
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(&payload)
            .execute(handle.pool())
            .await
            .map_err(|e| Error::Storage(format!("Failed to flush session {id}: {e}")))?;

        debug!(session_id = id, bytes = payload.len(), "flushed session");
        Ok(())
    }

    /// Load and decode the value stored under `id`.
    ///
    /// # Errors
    /// - `Error::NotFound` if no row exists for `id`; no row is created as a
    ///   side effect
    /// - `Error::Deserialization` if the stored payload does not conform to
    ///   the active format; the row is left untouched
    /// - `Error::Storage` if the lookup itself fails
    pub async fn retrieve(&self, id: &str) -> Result<SessionValue> {
        let handle = self.handle().await?;

        let sql = format!(
            "SELECT {data_col} FROM {table} WHERE {id_col} = ?1",
            table = quote_ident(handle.resultset_name()),
            id_col = quote_ident(handle.id_column()),
            data_col = quote_ident(handle.data_column()),
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(handle.pool())
            .await
            .map_err(|e| Error::Storage(format!("Failed to retrieve session {id}: {e}")))?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;

        let payload: Vec<u8> = row
            .try_get(0)
            .map_err(|e| Error::Storage(format!("Failed to read session {id} payload: {e}")))?;
        let value = self.config.serializer.decode(id, &payload)?;

        debug!(session_id = id, "retrieved session");
        Ok(value)
    }

    /// Delete the row for `id`. Deleting an absent row is a tolerated no-op;
    /// invoking destroy without an identifier to act on is not.
    ///
    /// # Errors
    /// - `Error::InvalidArgument` if `id` is empty or blank
    /// - `Error::Storage` if the delete itself fails
    pub async fn destroy(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "destroy called without a session identifier".to_string(),
            ));
        }
        let handle = self.handle().await?;

        let sql = format!(
            "DELETE FROM {table} WHERE {id_col} = ?1",
            table = quote_ident(handle.resultset_name()),
            id_col = quote_ident(handle.id_column()),
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(handle.pool())
            .await
            .map_err(|e| Error::Storage(format!("Failed to destroy session {id}: {e}")))?;

        debug!(
            session_id = id,
            deleted = result.rows_affected(),
            "destroyed session"
        );
        Ok(())
    }

    /// Resolved table name.
    pub fn resultset_name(&self) -> &str {
        &self.config.resultset_name
    }

    /// Resolved identifier column.
    pub fn id_column(&self) -> &str {
        &self.config.id_column
    }

    /// Resolved payload column.
    pub fn data_column(&self) -> &str {
        &self.config.data_column
    }

    /// Active payload format.
    pub fn serializer(&self) -> SerializerKind {
        self.config.serializer
    }

    /// Execution context this store issues operations from.
    pub fn context(&self) -> &ContextKey {
        &self.context
    }

    async fn handle(&self) -> Result<Arc<ConnectionHandle>> {
        self.registry.handle(&self.context, &self.config).await
    }
}
