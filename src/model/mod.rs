//! Attribute-tracking models.
//!
//! An entity type declares its attributes once in an [`AttributeRegistry`];
//! each instance carries a [`Model`] holding values, dirty state and record
//! flags, and implements [`Persistable`] to plug its external calls into the
//! shared save/destroy lifecycle.

pub mod attributes;
pub mod dirty;
pub mod instance;
pub mod lifecycle;

pub use attributes::{AttributeOptions, AttributeRegistry, AttributeSpec, ValidationRule};
pub use dirty::DirtyTracker;
pub use instance::{Model, ModelState};
pub use lifecycle::Persistable;
