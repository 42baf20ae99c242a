// ============================================================================
// vboxmodel
// ============================================================================

pub mod config;
pub mod core;
pub mod entities;
pub mod gateway;
pub mod handle;
pub mod model;
pub mod parser;
pub mod prelude;
pub mod relationship;

// Re-export main types for convenience
pub use config::ModelConfig;
pub use crate::core::{ModelError, OutcomeExt, Result, Value};
pub use entities::{HardDrive, VrdpServer};
pub use gateway::{Invocation, ResourceGateway, ScriptedGateway, VBoxManageGateway};
pub use handle::{LiveHandle, MemoryHandle};
pub use model::{Model, ModelState, Persistable};
pub use parser::{ConfigDocument, DocumentElement, ParsedRecord, TextBlockParser};
pub use relationship::{
    Cardinality, MemoryParent, MutationSession, Populated, RelationshipBinding,
    RelationshipContext, RelationshipSource, SessionEvent, SessionProvider, SessionScope,
    with_open_session,
};
