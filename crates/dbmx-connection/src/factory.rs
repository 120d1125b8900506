//! Data source construction from configuration
//!
//! [`DataSourceFactory`] turns a flat property map, or a directory
//! [`Reference`] carrying the same keys, into a registered
//! [`ManagedDataSource`](crate::ManagedDataSource).

mod data_source_factory;
pub mod properties;
mod reference;


pub use data_source_factory::DataSourceFactory;
pub use properties::{ALL_PROPERTIES, properties_from_toml, settings_from_properties};
pub use reference::{DATA_SOURCE_CLASS_NAME, RefAddr, Reference};
