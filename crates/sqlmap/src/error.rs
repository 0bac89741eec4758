/// Error types for statement binding and execution
///
/// Every failure the execution core can report is a [`MapperError`]. The variants
/// follow the four families callers need to tell apart:
///
/// | Family | Variants | Retry? |
/// |--------|----------|--------|
/// | Configuration | `Configuration`, `ParameterNotFound`, `Executor` | never |
/// | Result shape | `ResultShape`, `CursorInvalidated` | never |
/// | Resource access | `ResourceAccess`, `Timeout` | caller decides |
/// | Null for primitive | `NullForPrimitive` | never |
///
/// Errors are `Clone` so a resolution failure computed once per mapper method can be
/// replayed on every later invocation of that method.
use std::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MapperError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapperError {
    /// Binding, resolution or analysis failure rooted in a static mismatch.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A named parameter was looked up but the parameter container does not hold it.
    #[error("parameter '{name}' not found. Available parameters are {available:?}")]
    ParameterNotFound {
        name: String,
        available: Vec<String>,
    },

    /// The rows returned do not fit the shape the caller declared.
    #[error("result shape error: {message}")]
    ResultShape { message: String },

    /// The store failed while acquiring, preparing or executing.
    #[error("{context}: {message}")]
    ResourceAccess { context: String, message: String },

    /// A caller-side deadline elapsed before the store answered.
    #[error("{context}: timed out after {timeout:?}")]
    Timeout { context: String, timeout: Duration },

    /// An absent result was mapped onto a non-nullable primitive return type.
    #[error("mapper method '{statement}' attempted to return null from a method with a primitive return type ({return_type})")]
    NullForPrimitive {
        statement: String,
        return_type: String,
    },

    /// A lazy cursor whose shared statement was re-executed or released.
    #[error("cursor over '{sql}' was invalidated by a later use of the same statement")]
    CursorInvalidated { sql: String },

    /// Use of an executor, session or transaction after it was closed.
    #[error("executor error: {message}")]
    Executor { message: String },
}

/// Coarse classification of a [`MapperError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    ResultShape,
    ResourceAccess,
    NullForPrimitive,
}

impl MapperError {
    pub fn configuration(message: impl Into<String>) -> Self {
        MapperError::Configuration {
            message: message.into(),
        }
    }

    pub fn result_shape(message: impl Into<String>) -> Self {
        MapperError::ResultShape {
            message: message.into(),
        }
    }

    pub fn resource(context: impl Into<String>, message: impl ToString) -> Self {
        MapperError::ResourceAccess {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn executor(message: impl Into<String>) -> Self {
        MapperError::Executor {
            message: message.into(),
        }
    }

    /// Which error family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MapperError::Configuration { .. }
            | MapperError::ParameterNotFound { .. }
            | MapperError::Executor { .. } => ErrorKind::Configuration,
            MapperError::ResultShape { .. } | MapperError::CursorInvalidated { .. } => {
                ErrorKind::ResultShape
            }
            MapperError::ResourceAccess { .. } | MapperError::Timeout { .. } => {
                ErrorKind::ResourceAccess
            }
            MapperError::NullForPrimitive { .. } => ErrorKind::NullForPrimitive,
        }
    }
}

impl From<figment::Error> for MapperError {
    fn from(err: figment::Error) -> Self {
        MapperError::configuration(format!("failed to load settings: {err}"))
    }
}
