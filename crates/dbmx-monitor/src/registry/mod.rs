//! Management registry
//!
//! A registry is the named directory resources are exported to. Callers
//! register a resource once under an [`ObjectName`](crate::ObjectName) and
//! may then list, read and write its attributes by name.

mod directory;


pub use directory::*;
