//! Transaction isolation levels

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DbmxError;

/// Transaction isolation level applied to new pooled connections
///
/// Levels carry the conventional numeric codes (`NONE` = 0,
/// `READ_UNCOMMITTED` = 1, `READ_COMMITTED` = 2, `REPEATABLE_READ` = 4,
/// `SERIALIZABLE` = 8). `Unknown` (-1) means the driver default is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum TransactionIsolation {
    /// Leave the driver default untouched
    #[default]
    Unknown,
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    /// A driver-specific level without a symbolic name
    Other(i32),
}

impl TransactionIsolation {
    pub const UNKNOWN_LEVEL: i32 = -1;

    /// Map a numeric level to its variant
    pub fn from_level(level: i32) -> Self {
        match level {
            Self::UNKNOWN_LEVEL => Self::Unknown,
            0 => Self::None,
            1 => Self::ReadUncommitted,
            2 => Self::ReadCommitted,
            4 => Self::RepeatableRead,
            8 => Self::Serializable,
            other => Self::Other(other),
        }
    }

    /// Numeric code of this level
    pub fn level(&self) -> i32 {
        match self {
            Self::Unknown => Self::UNKNOWN_LEVEL,
            Self::None => 0,
            Self::ReadUncommitted => 1,
            Self::ReadCommitted => 2,
            Self::RepeatableRead => 4,
            Self::Serializable => 8,
            Self::Other(level) => *level,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Parse a configured isolation value, never failing.
    ///
    /// Accepts the symbolic names (case-insensitive) or a raw integer.
    /// Anything else logs a warning and yields `Unknown`, so the driver
    /// default stays in effect.
    pub fn parse_lenient(value: &str) -> Self {
        match value.parse() {
            Ok(isolation) => isolation,
            Err(e) => {
                tracing::warn!(
                    value = %value,
                    error = %e,
                    "could not parse defaultTransactionIsolation, using the database driver default"
                );
                Self::Unknown
            }
        }
    }
}

impl FromStr for TransactionIsolation {
    type Err = DbmxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let symbolic = match s.to_ascii_uppercase().as_str() {
            "NONE" => Some(Self::None),
            "READ_COMMITTED" => Some(Self::ReadCommitted),
            "READ_UNCOMMITTED" => Some(Self::ReadUncommitted),
            "REPEATABLE_READ" => Some(Self::RepeatableRead),
            "SERIALIZABLE" => Some(Self::Serializable),
            _ => None,
        };
        if let Some(isolation) = symbolic {
            return Ok(isolation);
        }

        s.parse::<i32>().map(Self::from_level).map_err(|e| {
            DbmxError::Configuration(format!("invalid transaction isolation '{}': {}", s, e))
        })
    }
}

impl fmt::Display for TransactionIsolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::None => write!(f, "NONE"),
            Self::ReadUncommitted => write!(f, "READ_UNCOMMITTED"),
            Self::ReadCommitted => write!(f, "READ_COMMITTED"),
            Self::RepeatableRead => write!(f, "REPEATABLE_READ"),
            Self::Serializable => write!(f, "SERIALIZABLE"),
            Self::Other(level) => write!(f, "{}", level),
        }
    }
}

impl From<i32> for TransactionIsolation {
    fn from(level: i32) -> Self {
        Self::from_level(level)
    }
}

impl From<TransactionIsolation> for i32 {
    fn from(isolation: TransactionIsolation) -> Self {
        isolation.level()
    }
}
