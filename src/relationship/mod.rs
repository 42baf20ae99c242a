//! Parent-to-child relationships populated from a live handle or a
//! configuration document, and persisted back through the parent.

pub mod session;

use crate::config::ModelConfig;
use crate::core::{ModelError, Result, Value};
use crate::gateway::ResourceGateway;
use crate::handle::LiveHandle;
use crate::model::Persistable;
use crate::parser::{ConfigDocument, DocumentElement, convert};
use log::trace;
use std::rc::{Rc, Weak};

pub use session::{
    MemoryParent, MutationSession, SessionEvent, SessionProvider, SessionScope, with_open_session,
};

/// Where a relationship is populated from.
#[derive(Clone, Copy)]
pub enum RelationshipSource<'a> {
    Handle(&'a dyn LiveHandle),
    Document(&'a ConfigDocument),
}

impl RelationshipSource<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handle(_) => "handle",
            Self::Document(_) => "document",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// Result of populating a relationship.
#[derive(Debug)]
pub enum Populated<C> {
    One(C),
    Many(Vec<C>),
}

impl<C> Populated<C> {
    pub fn into_one(self) -> Option<C> {
        match self {
            Self::One(child) => Some(child),
            Self::Many(_) => None,
        }
    }

    /// Children in enumeration order; a singular result becomes a one-element list.
    pub fn into_many(self) -> Vec<C> {
        match self {
            Self::One(child) => vec![child],
            Self::Many(children) => children,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(children) => children.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a child needs while being built for a parent.
///
/// Built per population call, so a changed base path is always picked up.
#[derive(Clone)]
pub struct RelationshipContext {
    pub parent: Option<Weak<dyn SessionProvider>>,
    pub gateway: Rc<dyn ResourceGateway>,
    pub config: ModelConfig,
}

impl RelationshipContext {
    pub fn new(gateway: Rc<dyn ResourceGateway>, config: ModelConfig) -> Self {
        Self {
            parent: None,
            gateway,
            config,
        }
    }

    pub fn with_parent(mut self, parent: &Rc<dyn SessionProvider>) -> Self {
        self.parent = Some(Rc::downgrade(parent));
        self
    }
}

/// Declares how a child entity type hangs off its parent.
pub struct RelationshipBinding<C> {
    /// Sub-handle field on the parent's live handle.
    pub field: &'static str,
    /// Element tag identifying one child in a configuration document.
    pub marker: &'static str,
    pub cardinality: Cardinality,
    /// Document attribute names that map to a differently named attribute.
    pub renames: &'static [(&'static str, &'static str)],
    /// Builds an empty child attached to the context's parent.
    pub attach: fn(&RelationshipContext) -> C,
}

impl<C: Persistable> RelationshipBinding<C> {
    pub fn populate(
        &self,
        context: &RelationshipContext,
        source: RelationshipSource<'_>,
    ) -> Result<Populated<C>> {
        let children = match source {
            RelationshipSource::Handle(handle) => self.from_handle(context, handle)?,
            RelationshipSource::Document(document) => self.from_document(context, document)?,
        };
        trace!("populated {} '{}' child(ren)", children.len(), self.field);

        match self.cardinality {
            Cardinality::Many => Ok(Populated::Many(children)),
            Cardinality::One => {
                let found = children.len();
                let mut children = children.into_iter();
                match (children.next(), found) {
                    (Some(child), 1) => Ok(Populated::One(child)),
                    _ => Err(ModelError::ParseError(format!(
                        "expected exactly one '{}', found {}",
                        self.field, found
                    ))),
                }
            }
        }
    }

    /// Flushes a child through its own save path.
    pub fn persist(&self, child: &mut C, raise_on_error: bool) -> Result<bool> {
        child.save(raise_on_error)
    }

    fn from_handle(&self, context: &RelationshipContext, handle: &dyn LiveHandle) -> Result<Vec<C>> {
        let sources = match self.cardinality {
            Cardinality::One => vec![handle.child(self.field)?],
            Cardinality::Many => handle.children(self.field)?,
        };

        sources
            .into_iter()
            .map(|sub| {
                let mut child = (self.attach)(context);
                child.model_mut().load_from_handle(sub)?;
                Ok(child)
            })
            .collect()
    }

    fn from_document(&self, context: &RelationshipContext, document: &ConfigDocument) -> Result<Vec<C>> {
        document
            .elements_named(self.marker)
            .into_iter()
            .map(|element| {
                let mut child = (self.attach)(context);
                let attributes = self.element_attributes(element, &context.config);
                child.model_mut().load_attributes(attributes)?;
                Ok(child)
            })
            .collect()
    }

    /// Normalizes one element's attributes into model attribute values.
    ///
    /// Keys become snake_case, `uuid` loses its braces and a relative
    /// `location` is joined onto the configured base path.
    fn element_attributes(&self, element: &DocumentElement, config: &ModelConfig) -> Vec<(String, Value)> {
        element
            .attributes
            .iter()
            .map(|(key, raw)| {
                let key = snake_case(key);
                let key = self
                    .renames
                    .iter()
                    .find(|(from, _)| *from == key)
                    .map(|(_, to)| to.to_string())
                    .unwrap_or(key);
                let value = match key.as_str() {
                    "uuid" => convert::strip_braces(raw).to_string(),
                    "location" => config.resolve(raw).to_string_lossy().into_owned(),
                    _ => raw.clone(),
                };
                (key, Value::Text(value))
            })
            .collect()
    }
}

/// `authType` -> `auth_type`, `UUID` -> `uuid`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower = false;
        } else if ch == '-' || ch == ' ' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(ch);
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}
