//! Schema resolution
//!
//! Turns a `SchemaSource` into a connected pool. A `Connected` pool or a
//! `Factory` result is used as-is; `Connect` establishes a connection and
//! bootstraps the session table; `Discover` establishes a connection and
//! introspects the database catalog to confirm the configured table and
//! columns exist. Resolution failure is always fatal and surfaced to the
//! caller; nothing is retried.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::debug;

use sesskeep_core::{Error, Result};

use crate::config::{SchemaSource, StoreConfig};

/// Resolve the configured schema source into a ready pool.
pub(crate) async fn resolve(config: &StoreConfig) -> Result<SqlitePool> {
    match &config.schema {
        SchemaSource::Connected(pool) => Ok(pool.clone()),
        SchemaSource::Factory(factory) => factory.open().await,
        SchemaSource::Connect(params) => {
            let pool = connect(&params.dsn, true).await?;
            ensure_table(&pool, config).await?;
            Ok(pool)
        }
        SchemaSource::Discover => {
            // validate() guarantees a DSN is present for this source.
            let dsn = config.dsn.as_deref().unwrap_or_default();
            let pool = connect(dsn, false).await?;
            reflect_table(&pool, config).await?;
            Ok(pool)
        }
    }
}

async fn connect(dsn: &str, create_if_missing: bool) -> Result<SqlitePool> {
    let options = if dsn.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(dsn)
            .map_err(|e| Error::Configuration(format!("Invalid DSN {dsn:?}: {e}")))?
    } else {
        SqliteConnectOptions::new().filename(dsn)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(
            options
                .create_if_missing(create_if_missing)
                .journal_mode(SqliteJournalMode::Wal),
        )
        .await
        .map_err(|e| Error::Connection(format!("Failed to connect to {dsn:?}: {e}")))?;

    debug!(dsn, "connected to session database");
    Ok(pool)
}

/// Bootstrap the session table for the `Connect` source.
async fn ensure_table(pool: &SqlitePool, config: &StoreConfig) -> Result<()> {
    let sql = format!(
        "CREATE TABLE IF NOT EXISTS {} ({} TEXT PRIMARY KEY NOT NULL, {} BLOB NOT NULL)",
        quote_ident(&config.resultset_name),
        quote_ident(&config.id_column),
        quote_ident(&config.data_column),
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .map_err(|e| Error::SchemaLoad(format!(
            "Failed to create table {}: {e}",
            config.resultset_name
        )))?;
    Ok(())
}

/// Confirm the configured table and columns exist in the catalog.
async fn reflect_table(pool: &SqlitePool, config: &StoreConfig) -> Result<()> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
    )
    .bind(&config.resultset_name)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::SchemaLoad(format!("Catalog introspection failed: {e}")))?;

    if !table_exists {
        return Err(Error::SchemaLoad(format!(
            "Discovery found no table named {:?}",
            config.resultset_name
        )));
    }

    let rows = sqlx::query(&format!(
        "PRAGMA table_info({})",
        quote_ident(&config.resultset_name)
    ))
    .fetch_all(pool)
    .await
    .map_err(|e| Error::SchemaLoad(format!("Catalog introspection failed: {e}")))?;

    let columns: Vec<String> = rows
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::SchemaLoad(format!("Catalog introspection failed: {e}")))?;

    for required in [&config.id_column, &config.data_column] {
        if !columns.iter().any(|c| c == required) {
            return Err(Error::SchemaLoad(format!(
                "Table {:?} has no column {:?} (found: {})",
                config.resultset_name,
                required,
                columns.join(", ")
            )));
        }
    }

    debug!(
        table = %config.resultset_name,
        "discovered session schema"
    );
    Ok(())
}

/// Quote an identifier for interpolation into SQL. Column and table names are
/// configuration, not user input, but they still must not break the statement.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
