//! Store configuration
//!
//! `StoreConfig` is fixed for the lifetime of a `SessionStore`. The string
//! fields deserialize from a caller's config file with the conventional
//! defaults; the schema source is supplied programmatically by the
//! composition root and is skipped during (de)serialization.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use sesskeep_core::{Error, Result, SerializerKind};

fn default_resultset_name() -> String {
    "Session".to_string()
}

fn default_id_column() -> String {
    "sessions_id".to_string()
}

fn default_data_column() -> String {
    "session_data".to_string()
}

/// Produces a connected pool on demand. Supplied by callers who manage
/// connection establishment themselves; the result is assumed ready to use.
#[async_trait]
pub trait SchemaFactory: Send + Sync {
    async fn open(&self) -> Result<SqlitePool>;
}

/// Connection parameters for schema sources that let the engine connect.
///
/// `user` and `password` are carried for DSNs whose driver authenticates;
/// the SQLite driver ignores them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectParams {
    pub dsn: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectParams {
    pub fn new(dsn: impl Into<String>) -> Self {
        Self {
            dsn: dsn.into(),
            user: None,
            password: None,
        }
    }
}

/// Where the backing schema comes from. Exactly one source per config; there
/// is no fallback chain, and failing to resolve the chosen source is fatal.
#[derive(Clone, Default)]
pub enum SchemaSource {
    /// A live, already-connected pool, used as-is.
    Connected(SqlitePool),
    /// A factory invoked once per execution context; its result used as-is.
    Factory(Arc<dyn SchemaFactory>),
    /// The engine connects with the given parameters and bootstraps the
    /// session table if it does not exist yet.
    Connect(ConnectParams),
    /// The engine connects and introspects the database catalog to confirm
    /// the configured table and columns exist. The database must already
    /// hold the schema; nothing is created.
    #[default]
    Discover,
}

impl fmt::Debug for SchemaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaSource::Connected(_) => f.write_str("Connected(..)"),
            SchemaSource::Factory(_) => f.write_str("Factory(..)"),
            SchemaSource::Connect(params) => f.debug_tuple("Connect").field(params).finish(),
            SchemaSource::Discover => f.write_str("Discover"),
        }
    }
}

/// Engine configuration, immutable once a store is built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Name of the backing table.
    #[serde(default = "default_resultset_name")]
    pub resultset_name: String,

    /// Primary-key column holding the session identifier.
    #[serde(default = "default_id_column")]
    pub id_column: String,

    /// Column holding the serialized payload.
    #[serde(default = "default_data_column")]
    pub data_column: String,

    /// Payload format, fixed for the store's lifetime.
    #[serde(default)]
    pub serializer: SerializerKind,

    /// DSN used by the `Discover` source (and available to `Connect` via
    /// [`StoreConfig::with_dsn`]).
    #[serde(default)]
    pub dsn: Option<String>,

    /// Schema source; defaults to catalog discovery against `dsn`.
    #[serde(skip)]
    pub schema: SchemaSource,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            resultset_name: default_resultset_name(),
            id_column: default_id_column(),
            data_column: default_data_column(),
            serializer: SerializerKind::default(),
            dsn: None,
            schema: SchemaSource::default(),
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resultset_name(mut self, name: impl Into<String>) -> Self {
        self.resultset_name = name.into();
        self
    }

    pub fn with_columns(
        mut self,
        id_column: impl Into<String>,
        data_column: impl Into<String>,
    ) -> Self {
        self.id_column = id_column.into();
        self.data_column = data_column.into();
        self
    }

    pub fn with_serializer(mut self, serializer: SerializerKind) -> Self {
        self.serializer = serializer;
        self
    }

    /// Use an already-connected pool.
    pub fn with_schema(mut self, pool: SqlitePool) -> Self {
        self.schema = SchemaSource::Connected(pool);
        self
    }

    /// Use a factory that produces a connected pool.
    pub fn with_schema_factory(mut self, factory: Arc<dyn SchemaFactory>) -> Self {
        self.schema = SchemaSource::Factory(factory);
        self
    }

    /// Let the engine connect and bootstrap the table.
    pub fn with_connect(mut self, params: ConnectParams) -> Self {
        self.schema = SchemaSource::Connect(params);
        self
    }

    /// Discover the schema by introspecting the database at `dsn`.
    pub fn with_dsn(mut self, dsn: impl Into<String>) -> Self {
        self.dsn = Some(dsn.into());
        self
    }

    /// Validate the configuration. Called at store construction so that
    /// configuration bugs abort startup instead of surfacing per request.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("resultset_name", &self.resultset_name),
            ("id_column", &self.id_column),
            ("data_column", &self.data_column),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Configuration(format!("{field} must not be empty")));
            }
        }
        if self.id_column == self.data_column {
            return Err(Error::Configuration(format!(
                "id_column and data_column must differ, both are {:?}",
                self.id_column
            )));
        }
        match &self.schema {
            SchemaSource::Connect(params) if params.dsn.trim().is_empty() => Err(
                Error::Configuration("schema source Connect requires a DSN".to_string()),
            ),
            SchemaSource::Discover if self.dsn.as_deref().unwrap_or("").trim().is_empty() => {
                Err(Error::Configuration(
                    "no schema source given and no DSN to discover one from".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_conventions() {
        let config = StoreConfig::default();
        assert_eq!(config.resultset_name, "Session");
        assert_eq!(config.id_column, "sessions_id");
        assert_eq!(config.data_column, "session_data");
        assert_eq!(config.serializer, SerializerKind::Json);
    }

    #[test]
    fn deserializes_with_partial_fields() {
        let config: StoreConfig = serde_json::from_str(
            r#"{"resultset_name": "web_sessions", "serializer": "binary"}"#,
        )
        .unwrap();
        assert_eq!(config.resultset_name, "web_sessions");
        assert_eq!(config.id_column, "sessions_id");
        assert_eq!(config.serializer, SerializerKind::Binary);
        assert!(matches!(config.schema, SchemaSource::Discover));
    }

    #[test]
    fn validate_rejects_empty_names() {
        let config = StoreConfig::new()
            .with_resultset_name("")
            .with_dsn("sqlite::memory:");
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn validate_rejects_colliding_columns() {
        let config = StoreConfig::new()
            .with_columns("data", "data")
            .with_dsn("sqlite::memory:");
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn validate_requires_a_dsn_for_discovery() {
        let config = StoreConfig::new();
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn validate_requires_a_dsn_for_connect() {
        let config = StoreConfig::new().with_connect(ConnectParams::new(""));
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
    }
}
