//! Resource and data-source registry for provkit.
//!
//! Definitions are registered on a [`RegistryBuilder`] during startup. Building
//! it runs every schema factory once, validates schemas and migration chains,
//! and yields an immutable, shareable [`Catalog`] that serves lookups, listing
//! and state upgrades.
//!
//! ```
//! use provkit_registry::{Kind, RegistryBuilder};
//! use provkit_model::{ResourceSchema, SchemaAttribute};
//!
//! let mut builder = RegistryBuilder::new();
//! builder
//!     .register(Kind::Resource, "gitlab_project", || {
//!         Ok(ResourceSchema::new().with_attribute("name", SchemaAttribute::required_string()))
//!     })
//!     .unwrap();
//!
//! let catalog = builder.build().unwrap();
//! assert!(catalog.lookup(Kind::Resource, "gitlab_project").is_some());
//! assert!(catalog.lookup(Kind::DataSource, "gitlab_project").is_none());
//! ```

mod builder;
mod catalog;
mod definition;
mod error;
mod lint;

pub use builder::RegistryBuilder;
pub use catalog::Catalog;
pub use definition::{Definition, Kind, SchemaFactory};
pub use error::RegistryError;
pub use lint::{lint, LintConfig, LintFinding, LintRule, CONFIG_FILE_NAME};
