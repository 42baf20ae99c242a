//! Live handles: structured, addressable views of an external resource.

use crate::core::{ModelError, Result, Value};
use std::collections::{BTreeMap, BTreeSet};

/// An opaque record source exposing named fields and nested sub-handles.
///
/// `set` is only meaningful on a handle reached through an open mutation
/// session.
pub trait LiveHandle {
    fn get(&self, field: &str) -> Result<Value>;

    fn set(&mut self, field: &str, value: Value) -> Result<()>;

    /// A singular sub-handle such as a machine's `vrdp_server`.
    fn child(&self, field: &str) -> Result<&dyn LiveHandle>;

    fn child_mut(&mut self, field: &str) -> Result<&mut dyn LiveHandle>;

    /// A plural sub-handle in enumeration order.
    fn children(&self, field: &str) -> Result<Vec<&dyn LiveHandle>>;
}

/// In-memory handle tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryHandle {
    fields: BTreeMap<String, Value>,
    children: BTreeMap<String, Vec<MemoryHandle>>,
    read_only: BTreeSet<String>,
}

impl MemoryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_read_only_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        self.read_only.insert(name.clone());
        self.fields.insert(name, value.into());
        self
    }

    /// Sets the singular sub-handle `name`, replacing any existing one.
    pub fn with_child(mut self, name: impl Into<String>, child: MemoryHandle) -> Self {
        self.children.insert(name.into(), vec![child]);
        self
    }

    /// Appends to the plural sub-handle `name`.
    pub fn push_child(mut self, name: impl Into<String>, child: MemoryHandle) -> Self {
        self.children.entry(name.into()).or_default().push(child);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn child_handle(&self, name: &str) -> Option<&MemoryHandle> {
        self.children.get(name).and_then(|list| list.first())
    }

    fn missing(kind: &str, name: &str) -> ModelError {
        ModelError::HandleField(format!("no {} named '{}'", kind, name))
    }
}

impl LiveHandle for MemoryHandle {
    fn get(&self, field: &str) -> Result<Value> {
        self.fields
            .get(field)
            .cloned()
            .ok_or_else(|| Self::missing("field", field))
    }

    fn set(&mut self, field: &str, value: Value) -> Result<()> {
        if self.read_only.contains(field) {
            return Err(ModelError::HandleField(format!(
                "field '{}' is not settable",
                field
            )));
        }
        self.fields.insert(field.to_string(), value);
        Ok(())
    }

    fn child(&self, field: &str) -> Result<&dyn LiveHandle> {
        self.child_handle(field)
            .map(|child| child as &dyn LiveHandle)
            .ok_or_else(|| Self::missing("sub-handle", field))
    }

    fn child_mut(&mut self, field: &str) -> Result<&mut dyn LiveHandle> {
        self.children
            .get_mut(field)
            .and_then(|list| list.first_mut())
            .map(|child| child as &mut dyn LiveHandle)
            .ok_or_else(|| Self::missing("sub-handle", field))
    }

    fn children(&self, field: &str) -> Result<Vec<&dyn LiveHandle>> {
        Ok(self
            .children
            .get(field)
            .map(|list| list.iter().map(|child| child as &dyn LiveHandle).collect())
            .unwrap_or_default())
    }
}
