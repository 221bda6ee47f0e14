//! Error types for mapping resolution.

use crate::value::Value;

/// Errors raised while resolving a mapping.
///
/// None of these are recovered inside the engine: the first one aborts the
/// whole resolution, including any enclosing delegate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MapperError {
    /// The source lacks the requested key or attribute.
    #[error("{container:?} does not have this key \"{key}\" in {mapper}")]
    Data {
        container: Value,
        key: String,
        mapper: String,
    },

    /// A required delegate received a null value.
    #[error("invalid delegate \"{field}\" in {mapper}")]
    InvalidDelegate { field: String, mapper: String },

    /// A choice table has no entry for the raw value.
    #[error("choice field \"{field}\" has no entry for {value:?}")]
    Lookup { field: String, value: Value },

    /// A custom field variant left a required operation undefined.
    #[error("{operation} is not implemented by field variant {variant}")]
    Unimplemented {
        variant: String,
        operation: &'static str,
    },

    /// A value of the wrong shape reached a conversion or placement step.
    #[error("field \"{field}\" expected {expected}, found {found}")]
    Type {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A user hook refused the value.
    #[error("hook {hook} failed: {message}")]
    Hook { hook: String, message: String },
}

impl MapperError {
    /// Build a [`MapperError::Hook`] from inside a user hook.
    pub fn hook(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Hook {
            hook: hook.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from source extraction.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::Data { .. })
    }
}
