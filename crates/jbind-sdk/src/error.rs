//! Error types for the binding layer

use jbind_schema::{SchemaError, SelectionError};

/// Result type for every fallible binding operation
pub type JResult<T> = Result<T, JniError>;

/// Binding layer error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum JniError {
    /// Schema lookup failed before any runtime call
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Overload selection failed before any runtime call
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// The runtime could not find a class
    #[error("Class not found: {0}")]
    ClassNotFound(String),

    /// The runtime could not find a method
    #[error("Method not found: {class}.{name}{signature}")]
    MethodNotFound {
        /// Class name
        class: String,
        /// Method name
        name: String,
        /// Requested signature
        signature: String,
    },

    /// The runtime could not find a field
    #[error("Field not found: {class}.{name}:{signature}")]
    FieldNotFound {
        /// Class name
        class: String,
        /// Field name
        name: String,
        /// Requested signature
        signature: String,
    },

    /// A foreign exception is pending on this thread
    #[error("Foreign exception pending")]
    PendingException,

    /// The current thread has no runtime environment
    #[error("Current thread is not attached to the runtime")]
    NotAttached,

    /// Attaching the current thread failed
    #[error("Failed to attach current thread: {0}")]
    AttachFailed(String),

    /// A null reference was used where an object is required
    #[error("Null reference: {0}")]
    NullReference(String),

    /// A value did not have the expected shape
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        /// Expected type name
        expected: String,
        /// Actual type name
        got: String,
    },

    /// A class owned by a custom loader was needed before that loader
    /// supplied it
    #[error("Class {class} belongs to loader {loader}, which has not loaded it yet")]
    LoaderNotPrimed {
        /// Class name
        class: String,
        /// Loader name
        loader: String,
    },

    /// Array index outside the array
    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Array length
        len: usize,
    },

    /// `on_load` ran twice without `on_unload`
    #[error("Binding layer already loaded")]
    AlreadyLoaded,

    /// `on_unload` ran without `on_load`
    #[error("Binding layer not loaded")]
    NotLoaded,

    /// The context was torn down and its cache released
    #[error("Context has been torn down")]
    TornDown,

    /// Namespace index not known to the context
    #[error("Unknown namespace index {0}")]
    NoNamespace(u16),

    /// Runtime operation failed
    #[error("{0}")]
    Runtime(String),
}

impl From<String> for JniError {
    fn from(s: String) -> Self {
        JniError::Runtime(s)
    }
}

impl From<&str> for JniError {
    fn from(s: &str) -> Self {
        JniError::Runtime(s.to_string())
    }
}
