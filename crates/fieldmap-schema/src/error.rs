//! Error types for schema loading and field derivation.

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid JSON at {path}: {message}")]
    InvalidJson { path: String, message: String },

    #[error("invalid TOML at {path}: {message}")]
    InvalidToml { path: String, message: String },

    #[error("{path}: unsupported schema format (expected .json or .toml)")]
    UnsupportedFormat { path: String },

    #[error("duplicate model in schema: {0}")]
    DuplicateModel(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),
}
