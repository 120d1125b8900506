//! Registry trait and the in-process implementation

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{AttributeInfo, AttributeValue, ManagedResource, MonitorError, ObjectName};

/// Directory of managed resources, addressed by name
pub trait ManagementRegistry: Send + Sync {
    /// Register a resource. Fails if the name is already taken.
    fn register(&self, name: ObjectName, resource: Arc<dyn ManagedResource>)
    -> Result<(), MonitorError>;

    /// Remove a registration
    fn unregister(&self, name: &ObjectName) -> Result<(), MonitorError>;

    fn is_registered(&self, name: &ObjectName) -> bool;

    /// All registered names
    fn names(&self) -> Vec<ObjectName>;

    /// Attribute descriptions of a registered resource
    fn attributes(&self, name: &ObjectName) -> Result<Vec<AttributeInfo>, MonitorError>;

    fn get_attribute(&self, name: &ObjectName, attribute: &str)
    -> Result<AttributeValue, MonitorError>;

    fn set_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), MonitorError>;
}

/// Registry living in the current process
///
/// Resources are held strongly until unregistered. Attribute calls run
/// outside the registry lock, so a resource may take its own locks freely.
#[derive(Default)]
pub struct InMemoryRegistry {
    resources: RwLock<HashMap<ObjectName, Arc<dyn ManagedResource>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that can be shared across threads
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of registered resources
    pub fn len(&self) -> usize {
        self.resources.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.read().is_empty()
    }

    fn lookup(&self, name: &ObjectName) -> Result<Arc<dyn ManagedResource>, MonitorError> {
        self.resources
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MonitorError::NotRegistered(name.to_string()))
    }
}

impl ManagementRegistry for InMemoryRegistry {
    fn register(
        &self,
        name: ObjectName,
        resource: Arc<dyn ManagedResource>,
    ) -> Result<(), MonitorError> {
        let mut resources = self.resources.write();
        if resources.contains_key(&name) {
            tracing::warn!(name = %name, "instance already registered");
            return Err(MonitorError::AlreadyRegistered(name.to_string()));
        }
        tracing::debug!(name = %name, "registering managed resource");
        resources.insert(name, resource);
        Ok(())
    }

    fn unregister(&self, name: &ObjectName) -> Result<(), MonitorError> {
        match self.resources.write().remove(name) {
            Some(_) => {
                tracing::debug!(name = %name, "unregistered managed resource");
                Ok(())
            }
            None => Err(MonitorError::NotRegistered(name.to_string())),
        }
    }

    fn is_registered(&self, name: &ObjectName) -> bool {
        self.resources.read().contains_key(name)
    }

    fn names(&self) -> Vec<ObjectName> {
        self.resources.read().keys().cloned().collect()
    }

    fn attributes(&self, name: &ObjectName) -> Result<Vec<AttributeInfo>, MonitorError> {
        Ok(self.lookup(name)?.attribute_info())
    }

    fn get_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
    ) -> Result<AttributeValue, MonitorError> {
        self.lookup(name)?.get_attribute(attribute)
    }

    fn set_attribute(
        &self,
        name: &ObjectName,
        attribute: &str,
        value: AttributeValue,
    ) -> Result<(), MonitorError> {
        let resource = self.lookup(name)?;
        tracing::debug!(name = %name, attribute, value = %value, "setting attribute");
        resource.set_attribute(attribute, &value)
    }
}
