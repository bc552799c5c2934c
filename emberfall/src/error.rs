//! `DataError` — failures loading definition files, asset keys, and maps.

use thiserror::Error;

/// Errors surfaced when loading or resolving external definition data.
#[derive(Debug, Error)]
pub enum DataError {
    /// A JSON definition or map file failed to parse / deserialize.
    #[error("malformed data `{path}`: {reason}")]
    Malformed { path: String, reason: String },

    /// A required property was missing from a map object.
    #[error("missing property `{property}` on object {object_id} in `{path}`")]
    MissingProperty {
        path: String,
        object_id: u32,
        property: String,
    },

    /// A lookup referenced a definition key that was never registered.
    #[error("unknown definition `{0}`")]
    UnknownDefinition(String),

    /// A character state had no authored clip and no fallback clip was supplied.
    #[error("missing fallback animation clip for `{0}`")]
    MissingFallbackClip(String),
}
