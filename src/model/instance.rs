use super::attributes::{AttributeRegistry, AttributeSpec};
use super::dirty::DirtyTracker;
use crate::core::{ModelError, Result, Value};
use crate::handle::LiveHandle;
use log::trace;
use std::collections::BTreeMap;

/// Lifecycle position of a model instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    /// No backing resource yet.
    New,
    /// Backing resource exists and matches local values.
    Persisted,
    /// Backing resource exists; local writes are not flushed yet.
    PersistedDirty,
    /// Terminal.
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Record {
    New,
    Existing,
    Destroyed,
}

/// Attribute values, dirty state and record flags of one entity instance.
#[derive(Debug, Clone)]
pub struct Model {
    registry: &'static AttributeRegistry,
    values: BTreeMap<&'static str, Value>,
    dirty: DirtyTracker,
    record: Record,
    loading: bool,
    errors: Vec<String>,
}

impl Model {
    /// Creates a new record with every attribute at its declared default.
    pub fn new(registry: &'static AttributeRegistry) -> Self {
        let values = registry
            .specs()
            .iter()
            .map(|spec| (spec.name, spec.default_value.clone().unwrap_or_default()))
            .collect();

        Self {
            registry,
            values,
            dirty: DirtyTracker::new(),
            record: Record::New,
            loading: false,
            errors: Vec::new(),
        }
    }

    pub fn entity(&self) -> &'static str {
        self.registry.entity()
    }

    pub fn registry(&self) -> &'static AttributeRegistry {
        self.registry
    }

    pub fn state(&self) -> ModelState {
        match self.record {
            Record::New => ModelState::New,
            Record::Destroyed => ModelState::Destroyed,
            Record::Existing if self.dirty.is_empty() => ModelState::Persisted,
            Record::Existing => ModelState::PersistedDirty,
        }
    }

    pub fn is_new_record(&self) -> bool {
        self.record == Record::New
    }

    pub fn is_destroyed(&self) -> bool {
        self.record == Record::Destroyed
    }

    /// Fails with `AlreadyDestroyed` once the instance reached its terminal state.
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(ModelError::AlreadyDestroyed {
                entity: self.entity().to_string(),
            });
        }
        Ok(())
    }

    pub fn read(&self, name: &str) -> Result<&Value> {
        let spec = self.registry.require(name)?;
        Ok(self.values.get(spec.name).unwrap_or(&Value::Null))
    }

    /// Text view of an attribute; `None` when unset, non-text or undeclared.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.values.get(name).and_then(Value::as_bool)
    }

    /// Stores a coerced value and marks it dirty.
    ///
    /// Read-only attributes are only writable while loading, and loading never
    /// marks anything dirty.
    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.ensure_live()?;
        let registry = self.registry;
        let spec = registry.require(name)?;
        if spec.read_only && !self.loading {
            return Err(ModelError::ReadOnlyAttribute {
                entity: self.entity().to_string(),
                name: name.to_string(),
            });
        }

        let value = spec.coerce(value.into());
        let previous = self
            .values
            .insert(spec.name, value)
            .unwrap_or_default();
        if !self.loading && spec.property {
            self.dirty.record(spec.name, &previous);
        }
        Ok(())
    }

    /// Runs `load` in the internal-load context, then clears dirty state and
    /// marks the record as existing.
    pub fn load_with<F>(&mut self, load: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.ensure_live()?;
        self.loading = true;
        let outcome = load(self);
        self.loading = false;
        outcome?;

        self.mark_clean();
        self.mark_existing();
        Ok(())
    }

    /// Loads every declared property present in `pairs`; unknown keys are ignored.
    pub fn load_attributes<I, K>(&mut self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let registry = self.registry;
        self.load_with(|model| {
            for (key, value) in pairs {
                let key = key.as_ref();
                match registry.spec(key) {
                    Some(spec) if spec.property => model.write(key, value)?,
                    _ => trace!("{}: ignoring unmapped key '{}'", model.entity(), key),
                }
            }
            Ok(())
        })
    }

    /// Reads every declared property straight off a live handle.
    pub fn load_from_handle(&mut self, handle: &dyn LiveHandle) -> Result<()> {
        let names: Vec<&'static str> = self.registry.properties().map(|spec| spec.name).collect();
        self.load_with(|model| {
            for name in names {
                let value = handle.get(name)?;
                model.write(name, value)?;
            }
            Ok(())
        })
    }

    /// Pushes dirty settable attributes onto a handle opened for mutation.
    ///
    /// Returns the number of fields written. Does not clear dirty state.
    pub fn save_changed_to_handle(&self, handle: &mut dyn LiveHandle) -> Result<usize> {
        let payload = self.dirty_payload();
        for (name, value) in &payload {
            handle.set(name, (*value).clone())?;
        }
        Ok(payload.len())
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    pub fn mark_existing(&mut self) {
        if self.record == Record::New {
            self.record = Record::Existing;
        }
    }

    pub fn mark_destroyed(&mut self) {
        self.dirty.clear();
        self.record = Record::Destroyed;
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_attribute_dirty(&self, name: &str) -> bool {
        self.dirty.is_dirty(name)
    }

    /// Dirty attribute names in declaration order.
    pub fn dirty_attributes(&self) -> Vec<&'static str> {
        self.registry
            .specs()
            .iter()
            .filter(|spec| self.dirty.is_dirty(spec.name))
            .map(|spec| spec.name)
            .collect()
    }

    /// `(name, baseline, current)` for every dirty attribute.
    pub fn changes(&self) -> Vec<(&'static str, Value, Value)> {
        self.dirty_attributes()
            .into_iter()
            .map(|name| {
                let baseline = self.dirty.baseline(name).cloned().unwrap_or_default();
                let current = self.values.get(name).cloned().unwrap_or_default();
                (name, baseline, current)
            })
            .collect()
    }

    /// Every settable attribute with a value; what a create must send.
    pub fn full_payload(&self) -> Vec<(&'static str, &Value)> {
        self.payload_where(|_| true)
    }

    /// Only the dirty settable attributes; what an update must send.
    pub fn dirty_payload(&self) -> Vec<(&'static str, &Value)> {
        self.payload_where(|spec| self.dirty.is_dirty(spec.name))
    }

    fn payload_where<F>(&self, include: F) -> Vec<(&'static str, &Value)>
    where
        F: Fn(&AttributeSpec) -> bool,
    {
        self.registry
            .specs()
            .iter()
            .filter(|spec| spec.is_settable() && include(spec))
            .filter_map(|spec| {
                self.values
                    .get(spec.name)
                    .filter(|value| !value.is_null())
                    .map(|value| (spec.name, value))
            })
            .collect()
    }

    /// Re-evaluates every declared rule; previous results are discarded.
    pub fn validate(&mut self) -> bool {
        self.errors = self
            .registry
            .rules()
            .iter()
            .filter_map(|rule| {
                let value = self.values.get(rule.attribute()).unwrap_or(&Value::Null);
                rule.check(value)
            })
            .collect();
        self.errors.is_empty()
    }

    /// Messages from the most recent `validate` call.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn validation_error(&self) -> ModelError {
        ModelError::ValidationFailed {
            entity: self.entity().to_string(),
            errors: self.errors.clone(),
        }
    }

    /// Current attributes as a JSON object.
    pub fn attributes_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.values).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeOptions, ValidationRule};
    use lazy_static::lazy_static;

    lazy_static! {
        static ref GADGET: AttributeRegistry = AttributeRegistry::new("Gadget")
            .declare("id", AttributeOptions::new().read_only())
            .and_then(|r| r.declare("name", AttributeOptions::new()))
            .and_then(|r| r.declare("size", AttributeOptions::new()))
            .and_then(|r| r.declare("format", AttributeOptions::new().default_value("VDI")))
            .and_then(|r| r.declare("enabled", AttributeOptions::new().boolean()))
            .and_then(|r| r.declare("owner", AttributeOptions::new().internal()))
            .and_then(|r| r.validates(ValidationRule::Presence("size")))
            .unwrap_or_else(|err| panic!("failed to declare Gadget: {}", err));
    }

    fn persisted() -> Model {
        let mut model = Model::new(&GADGET);
        model
            .load_attributes([("id", Value::from("abc")), ("size", Value::from("10"))])
            .unwrap();
        model
    }

    #[test]
    fn test_new_model_uses_defaults_and_is_clean() {
        let model = Model::new(&GADGET);
        assert_eq!(model.state(), ModelState::New);
        assert_eq!(model.read("format").unwrap(), &Value::from("VDI"));
        assert!(!model.is_dirty());
    }

    #[test]
    fn test_unknown_attribute() {
        let mut model = Model::new(&GADGET);
        assert!(matches!(model.read("nope"), Err(ModelError::UnknownAttribute { .. })));
        assert!(matches!(
            model.write("nope", "x"),
            Err(ModelError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn test_read_only_outside_load() {
        let mut model = persisted();
        assert!(matches!(
            model.write("id", "other"),
            Err(ModelError::ReadOnlyAttribute { .. })
        ));
        assert_eq!(model.text("id"), Some("abc"));
    }

    #[test]
    fn test_load_never_marks_dirty() {
        let model = persisted();
        assert_eq!(model.state(), ModelState::Persisted);
        assert!(model.dirty_attributes().is_empty());
    }

    #[test]
    fn test_writes_mark_dirty_in_declaration_order() {
        let mut model = persisted();
        model.write("size", "20").unwrap();
        model.write("name", "disk").unwrap();
        model.write("size", "30").unwrap();

        assert_eq!(model.state(), ModelState::PersistedDirty);
        assert_eq!(model.dirty_attributes(), vec!["name", "size"]);
        assert_eq!(
            model.changes()[1],
            ("size", Value::from("10"), Value::from("30"))
        );
    }

    #[test]
    fn test_internal_attributes_are_not_tracked() {
        let mut model = persisted();
        model.write("owner", "vm").unwrap();
        assert!(!model.is_dirty());
    }

    #[test]
    fn test_boolean_write_is_coerced() {
        let mut model = persisted();
        model.write("enabled", "yes").unwrap();
        assert_eq!(model.flag("enabled"), Some(true));
    }

    #[test]
    fn test_payloads() {
        let mut model = Model::new(&GADGET);
        model.write("size", "10").unwrap();
        let full: Vec<&str> = model.full_payload().iter().map(|(n, _)| *n).collect();
        assert_eq!(full, vec!["size", "format"]);

        let mut model = persisted();
        model.write("name", "disk").unwrap();
        let dirty: Vec<&str> = model.dirty_payload().iter().map(|(n, _)| *n).collect();
        assert_eq!(dirty, vec!["name"]);
    }

    #[test]
    fn test_validation_is_recomputed() {
        let mut model = Model::new(&GADGET);
        assert!(!model.validate());
        assert_eq!(model.errors(), ["size can't be blank".to_string()]);

        model.write("size", "700").unwrap();
        assert!(model.validate());
        assert!(model.errors().is_empty());
    }

    #[test]
    fn test_destroyed_rejects_writes() {
        let mut model = persisted();
        model.mark_destroyed();
        assert!(matches!(
            model.write("name", "x"),
            Err(ModelError::AlreadyDestroyed { .. })
        ));
    }
}
