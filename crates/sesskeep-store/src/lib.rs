//! Sesskeep Session Persistence
//!
//! This crate stores opaque per-user session state in a relational table:
//! - `SessionStore`: flush / retrieve / destroy keyed by session identifier
//! - `ConnectionRegistry`: per-execution-context connection handle cache
//! - Schema resolution: connected pool, factory, fresh connect, or catalog
//!   discovery
//!
//! The owning framework generates and transmits session identifiers; this
//! crate only persists the state addressed by them.

pub mod config;
pub mod registry;
pub mod schema;
pub mod store;

pub use config::{ConnectParams, SchemaFactory, SchemaSource, StoreConfig};
pub use registry::{ConnectionHandle, ConnectionRegistry, ContextKey};
pub use store::SessionStore;

pub use sesskeep_core::{Error, Result, SerializerKind, SessionValue};
