//! Recommended imports grouped by use.
//!
//! `entities` is what application code normally needs. `framework` is for
//! code declaring its own entity types on top of the model layer.

pub mod entities {
    pub use crate::core::{ModelError, Result, Value};
    pub use crate::entities::{HardDrive, VrdpServer};
    pub use crate::gateway::{ResourceGateway, VBoxManageGateway};
    pub use crate::model::Persistable;
    pub use crate::{ConfigDocument, ModelConfig};
}

pub mod framework {
    pub use crate::core::OutcomeExt;
    pub use crate::handle::LiveHandle;
    pub use crate::model::{AttributeOptions, AttributeRegistry, Model, ModelState, ValidationRule};
    pub use crate::parser::{ParsedRecord, TextBlockParser, convert};
    pub use crate::relationship::{
        Cardinality, Populated, RelationshipBinding, RelationshipContext, RelationshipSource,
        SessionProvider, with_open_session,
    };
}
