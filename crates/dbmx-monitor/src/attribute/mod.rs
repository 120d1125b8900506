//! Managed attributes
//!
//! A type opts into management by implementing [`Manageable`], which returns
//! a static table of [`ManagedAttribute`] entries. Each entry names an
//! attribute, describes it, and points at a getter and an optional setter.
//! The blanket [`ManagedResource`] impl lets the registry drive any
//! `Manageable` type through that table.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::MonitorError;

/// Type of an attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bool,
    Int,
    Long,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Long => write!(f, "long"),
            ValueType::Text => write!(f, "text"),
        }
    }
}

/// Value read from or written to an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    Bool(bool),
    Int(i32),
    Long(i64),
    Text(String),
}

impl AttributeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            AttributeValue::Bool(_) => ValueType::Bool,
            AttributeValue::Int(_) => ValueType::Int,
            AttributeValue::Long(_) => ValueType::Long,
            AttributeValue::Text(_) => ValueType::Text,
        }
    }

    /// Extract an `Int` for the named attribute
    pub fn to_int(&self, attribute: &str) -> Result<i32, MonitorError> {
        match self {
            AttributeValue::Int(v) => Ok(*v),
            other => Err(other.mismatch(attribute, ValueType::Int)),
        }
    }

    /// Extract a `Long` for the named attribute; `Int` values widen
    pub fn to_long(&self, attribute: &str) -> Result<i64, MonitorError> {
        match self {
            AttributeValue::Long(v) => Ok(*v),
            AttributeValue::Int(v) => Ok(i64::from(*v)),
            other => Err(other.mismatch(attribute, ValueType::Long)),
        }
    }

    fn mismatch(&self, attribute: &str, expected: ValueType) -> MonitorError {
        MonitorError::InvalidValue {
            attribute: attribute.to_string(),
            expected,
            found: self.value_type(),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Bool(v) => write!(f, "{}", v),
            AttributeValue::Int(v) => write!(f, "{}", v),
            AttributeValue::Long(v) => write!(f, "{}", v),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}

impl From<i32> for AttributeValue {
    fn from(v: i32) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Long(v)
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

/// Public description of an attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub value_type: ValueType,
    pub writable: bool,
}

pub type Getter<T> = fn(&T) -> AttributeValue;
pub type Setter<T> = fn(&T, &AttributeValue) -> Result<(), MonitorError>;

/// One row of a type's static attribute table
pub struct ManagedAttribute<T: 'static> {
    pub name: &'static str,
    pub description: &'static str,
    pub value_type: ValueType,
    pub getter: Getter<T>,
    pub setter: Option<Setter<T>>,
}

impl<T: 'static> ManagedAttribute<T> {
    pub const fn read_only(
        name: &'static str,
        value_type: ValueType,
        description: &'static str,
        getter: Getter<T>,
    ) -> Self {
        Self {
            name,
            description,
            value_type,
            getter,
            setter: None,
        }
    }

    pub const fn read_write(
        name: &'static str,
        value_type: ValueType,
        description: &'static str,
        getter: Getter<T>,
        setter: Setter<T>,
    ) -> Self {
        Self {
            name,
            description,
            value_type,
            getter,
            setter: Some(setter),
        }
    }

    pub fn info(&self) -> AttributeInfo {
        AttributeInfo {
            name: self.name,
            description: self.description,
            value_type: self.value_type,
            writable: self.setter.is_some(),
        }
    }
}

/// A type exporting a static attribute table
pub trait Manageable: Sized + Send + Sync + 'static {
    fn attribute_table() -> &'static [ManagedAttribute<Self>];
}

/// Type-erased view of a managed resource, as held by a registry
pub trait ManagedResource: Send + Sync {
    fn attribute_info(&self) -> Vec<AttributeInfo>;

    fn get_attribute(&self, attribute: &str) -> Result<AttributeValue, MonitorError>;

    fn set_attribute(&self, attribute: &str, value: &AttributeValue) -> Result<(), MonitorError>;
}

fn find_attribute<T: Manageable>(attribute: &str) -> Result<&'static ManagedAttribute<T>, MonitorError> {
    T::attribute_table()
        .iter()
        .find(|attr| attr.name == attribute)
        .ok_or_else(|| MonitorError::AttributeNotFound(attribute.to_string()))
}

impl<T: Manageable> ManagedResource for T {
    fn attribute_info(&self) -> Vec<AttributeInfo> {
        T::attribute_table().iter().map(ManagedAttribute::info).collect()
    }

    fn get_attribute(&self, attribute: &str) -> Result<AttributeValue, MonitorError> {
        let attr = find_attribute::<T>(attribute)?;
        Ok((attr.getter)(self))
    }

    fn set_attribute(&self, attribute: &str, value: &AttributeValue) -> Result<(), MonitorError> {
        let attr = find_attribute::<T>(attribute)?;
        let setter = attr
            .setter
            .ok_or_else(|| MonitorError::ReadOnlyAttribute(attribute.to_string()))?;
        setter(self, value)
    }
}
