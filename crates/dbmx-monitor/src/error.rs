//! Error types for the management registry

use thiserror::Error;

use crate::attribute::ValueType;

/// Errors raised by the management registry and managed resources
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Invalid object name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Instance already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Instance not registered: {0}")]
    NotRegistered(String),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Attribute is read-only: {0}")]
    ReadOnlyAttribute(String),

    #[error("Invalid value for attribute {attribute}: expected {expected}, got {found}")]
    InvalidValue {
        attribute: String,
        expected: ValueType,
        found: ValueType,
    },
}
