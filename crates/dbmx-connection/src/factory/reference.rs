//! Directory references describing a data source

use serde::{Deserialize, Serialize};

/// Class name a [`Reference`] must carry for the factory to accept it
pub const DATA_SOURCE_CLASS_NAME: &str = "dbmx.DataSource";

/// One typed address of a [`Reference`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefAddr {
    /// Property key, e.g. `maxActive`
    pub addr_type: String,
    /// Textual property value
    pub content: String,
}

impl RefAddr {
    pub fn new(addr_type: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            addr_type: addr_type.into(),
            content: content.into(),
        }
    }
}

/// A naming-directory entry: a class name plus an ordered address list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reference {
    pub class_name: String,
    pub addrs: Vec<RefAddr>,
}

impl Reference {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            addrs: Vec::new(),
        }
    }

    /// A reference the data source factory accepts
    pub fn data_source() -> Self {
        Self::new(DATA_SOURCE_CLASS_NAME)
    }

    /// Append an address, builder style
    pub fn with(mut self, addr_type: impl Into<String>, content: impl Into<String>) -> Self {
        self.add(RefAddr::new(addr_type, content));
        self
    }

    pub fn add(&mut self, addr: RefAddr) {
        self.addrs.push(addr);
    }

    /// First address of the given type
    pub fn get(&self, addr_type: &str) -> Option<&RefAddr> {
        self.addrs.iter().find(|addr| addr.addr_type == addr_type)
    }
}
