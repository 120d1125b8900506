use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dbmx_core::{DriverRegistry, Result};
use dbmx_monitor::ManagementRegistry;

use super::properties::{ALL_PROPERTIES, PROP_MBEAN_NAME, settings_from_properties};
use super::reference::{DATA_SOURCE_CLASS_NAME, Reference};
use crate::data_source::DataSource;
use crate::managed::ManagedDataSource;
use crate::pool::BasicPool;

/// Builds managed data sources from property maps and directory references
pub struct DataSourceFactory {
    registry: Arc<dyn ManagementRegistry>,
    drivers: Arc<DriverRegistry>,
}

impl DataSourceFactory {
    /// Create a factory registering into `registry` and connecting through `drivers`
    pub fn new(registry: Arc<dyn ManagementRegistry>, drivers: Arc<DriverRegistry>) -> Self {
        Self { registry, drivers }
    }

    /// Create, configure and register a data source
    ///
    /// Recognized keys are applied over the pool defaults; other keys are
    /// ignored. When `initialSize` is positive the initial connections are
    /// opened before this returns, so connection problems surface here.
    #[tracing::instrument(skip_all, fields(keys = properties.len()))]
    pub async fn create_data_source(
        &self,
        properties: &HashMap<String, String>,
    ) -> Result<Arc<ManagedDataSource>> {
        let settings = settings_from_properties(properties)?;
        let initial_size = settings.initial_size;
        let pool = BasicPool::new(settings, self.drivers.clone());

        let data_source = match properties.get(PROP_MBEAN_NAME) {
            Some(name) => ManagedDataSource::with_name(name, pool, self.registry.clone())?,
            None => ManagedDataSource::new(pool, self.registry.clone())?,
        };

        // The pool opens its initial connections lazily, so force it here.
        if initial_size > 0 {
            if let Err(e) = data_source.start().await {
                tracing::warn!(name = %data_source.name(), error = %e, "pool warm-up failed");
                let _ = data_source.close().await;
                return Err(e);
            }
        }

        tracing::info!(name = %data_source.name(), initial_size, "created data source");
        Ok(data_source)
    }

    /// Resolve a directory object into a data source
    ///
    /// Returns `Ok(None)` unless `object` is a [`Reference`] with class name
    /// [`DATA_SOURCE_CLASS_NAME`]. Only recognized keys are read from the
    /// reference's addresses.
    #[tracing::instrument(skip_all)]
    pub async fn get_object_instance(
        &self,
        object: Option<&(dyn Any + Send + Sync)>,
    ) -> Result<Option<Arc<ManagedDataSource>>> {
        let Some(reference) = object.and_then(|object| object.downcast_ref::<Reference>()) else {
            return Ok(None);
        };
        if reference.class_name != DATA_SOURCE_CLASS_NAME {
            tracing::debug!(class_name = %reference.class_name, "ignoring reference");
            return Ok(None);
        }

        let properties: HashMap<String, String> = ALL_PROPERTIES
            .iter()
            .filter_map(|key| {
                reference
                    .get(key)
                    .map(|addr| (key.to_string(), addr.content.clone()))
            })
            .collect();

        self.create_data_source(&properties).await.map(Some)
    }
}
