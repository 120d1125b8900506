//! Object names
//!
//! Resources are registered under names of the form
//! `domain:key=value[,key=value]*`. Two names are equal when their domain
//! and key/value set match, regardless of property order.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::MonitorError;

const KEY_FORBIDDEN: &[char] = &[':', ',', '=', '*', '?', '"'];
const DOMAIN_FORBIDDEN: &[char] = &[':', '*', '?', '\n'];

/// Name of a resource in a management registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectName {
    /// The name exactly as supplied
    raw: String,
    domain: String,
    /// Properties sorted by key
    properties: Vec<(String, String)>,
}

impl ObjectName {
    /// Parse and validate a name
    pub fn parse(name: &str) -> Result<Self, MonitorError> {
        let invalid = |reason: &str| MonitorError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let (domain, key_list) = name
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' between domain and key properties"))?;

        if domain.is_empty() {
            return Err(invalid("domain is empty"));
        }
        if domain.contains(DOMAIN_FORBIDDEN) {
            return Err(invalid("domain contains a forbidden character"));
        }
        if key_list.is_empty() {
            return Err(invalid("at least one key property is required"));
        }

        let mut properties: Vec<(String, String)> = Vec::new();
        for pair in key_list.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid("key property without '='"))?;
            if key.is_empty() || value.is_empty() {
                return Err(invalid("empty key or value"));
            }
            if key.contains(KEY_FORBIDDEN) || value.contains(KEY_FORBIDDEN) {
                return Err(invalid("key property contains a forbidden character"));
            }
            if properties.iter().any(|(existing, _)| existing == key) {
                return Err(invalid("duplicate key"));
            }
            properties.push((key.to_string(), value.to_string()));
        }
        properties.sort();

        Ok(Self {
            raw: name.to_string(),
            domain: domain.to_string(),
            properties,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Value of a key property
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The name as it was supplied
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Domain followed by the key properties in key order
    pub fn canonical(&self) -> String {
        let keys: Vec<String> = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}:{}", self.domain, keys.join(","))
    }
}

impl PartialEq for ObjectName {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain && self.properties == other.properties
    }
}

impl Eq for ObjectName {}

impl Hash for ObjectName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.properties.hash(state);
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ObjectName {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectName {
    type Error = MonitorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectName> for String {
    fn from(name: ObjectName) -> Self {
        name.raw
    }
}
