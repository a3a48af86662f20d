//! Session payload serialization
//!
//! A session value is an arbitrary string-keyed JSON mapping, opaque to the
//! store. The serializer converts it to and from the byte payload held in the
//! data column. The active format is chosen once, at store construction, and
//! never varies per call; adding a format means adding a variant here.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The in-memory session state: nested mappings, sequences, and scalars are
/// all allowed. The store never inspects its contents.
pub type SessionValue = serde_json::Map<String, serde_json::Value>;

/// The closed set of supported payload formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SerializerKind {
    /// JSON text (default).
    #[default]
    Json,
    /// MessagePack, a compact binary fast path.
    Binary,
    /// YAML, for payloads meant to be read by humans.
    Yaml,
}

impl SerializerKind {
    /// Stable format name for diagnostics and introspection.
    pub fn name(&self) -> &'static str {
        match self {
            SerializerKind::Json => "json",
            SerializerKind::Binary => "binary",
            SerializerKind::Yaml => "yaml",
        }
    }

    /// Encode a session value into its stored byte payload.
    ///
    /// # Errors
    /// - `Error::Serialization` if the value cannot be represented in this
    ///   format
    pub fn encode(&self, value: &SessionValue) -> Result<Vec<u8>> {
        match self {
            SerializerKind::Json => {
                serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
            }
            SerializerKind::Binary => {
                rmp_serde::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))
            }
            SerializerKind::Yaml => serde_yaml::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| Error::Serialization(e.to_string())),
        }
    }

    /// Decode a stored byte payload back into a session value.
    ///
    /// Never returns a partially decoded value: malformed input fails whole.
    ///
    /// # Errors
    /// - `Error::Deserialization` naming `id`, the session the payload
    ///   belongs to
    pub fn decode(&self, id: &str, bytes: &[u8]) -> Result<SessionValue> {
        let mapped = |e: String| Error::Deserialization {
            id: id.to_string(),
            reason: e,
        };
        match self {
            SerializerKind::Json => {
                serde_json::from_slice(bytes).map_err(|e| mapped(e.to_string()))
            }
            SerializerKind::Binary => {
                rmp_serde::from_slice(bytes).map_err(|e| mapped(e.to_string()))
            }
            SerializerKind::Yaml => serde_yaml::from_slice(bytes).map_err(|e| mapped(e.to_string())),
        }
    }
}
