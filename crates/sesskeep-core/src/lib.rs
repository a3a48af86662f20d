//! Sesskeep Core Types
//!
//! This crate provides the fundamental types shared by the session engine:
//! - The session value type and serializer variants
//! - Core error types

pub mod error;
pub mod serializer;

pub use error::{Error, Result};
pub use serializer::{SerializerKind, SessionValue};
