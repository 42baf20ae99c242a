use crate::core::{ModelError, Result, Value};
use serde::Serialize;

/// Declaration flags for one attribute.
#[derive(Debug, Clone, Default)]
pub struct AttributeOptions {
    pub read_only: bool,
    pub boolean: bool,
    /// `false` marks internal bookkeeping fields that never load or save.
    pub property: bool,
    pub default_value: Option<Value>,
}

impl AttributeOptions {
    /// A settable property with no default.
    pub fn new() -> Self {
        Self {
            property: true,
            ..Self::default()
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.property = false;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Describes one declared attribute of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeSpec {
    pub name: &'static str,
    pub read_only: bool,
    pub boolean: bool,
    pub property: bool,
    #[serde(skip)]
    pub default_value: Option<Value>,
}

impl AttributeSpec {
    /// Applies boolean coercion to an incoming value.
    pub fn coerce(&self, value: Value) -> Value {
        if self.boolean {
            Value::Boolean(value.is_truthy())
        } else {
            value
        }
    }

    /// Whether callers may change the attribute and have it saved.
    pub fn is_settable(&self) -> bool {
        self.property && !self.read_only
    }
}

/// Rules evaluated by `Model::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationRule {
    Presence(&'static str),
    Numeric(&'static str),
}

impl ValidationRule {
    pub(crate) fn check(&self, value: &Value) -> Option<String> {
        match self {
            Self::Presence(name) => {
                let blank = match value {
                    Value::Null => true,
                    Value::Text(s) => s.trim().is_empty(),
                    _ => false,
                };
                blank.then(|| format!("{} can't be blank", name))
            }
            Self::Numeric(name) => {
                if value.is_null() || value.as_i64().is_some() {
                    None
                } else {
                    Some(format!("{} must be a number", name))
                }
            }
        }
    }

    pub fn attribute(&self) -> &'static str {
        match self {
            Self::Presence(name) | Self::Numeric(name) => name,
        }
    }
}

/// Per-entity-type table of attribute declarations and validation rules.
///
/// Built once when the entity type is first used and shared by every instance.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    entity: &'static str,
    specs: Vec<AttributeSpec>,
    rules: Vec<ValidationRule>,
}

impl AttributeRegistry {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            specs: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Registers an attribute. Names must be unique within the entity type.
    pub fn declare(mut self, name: &'static str, options: AttributeOptions) -> Result<Self> {
        if self.spec(name).is_some() {
            return Err(ModelError::DuplicateAttribute {
                entity: self.entity.to_string(),
                name: name.to_string(),
            });
        }

        self.specs.push(AttributeSpec {
            name,
            read_only: options.read_only,
            boolean: options.boolean,
            property: options.property,
            default_value: options.default_value,
        });
        Ok(self)
    }

    /// Adds a validation rule for a declared attribute.
    pub fn validates(mut self, rule: ValidationRule) -> Result<Self> {
        self.require(rule.attribute())?;
        self.rules.push(rule);
        Ok(self)
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Like `spec`, but reports undeclared names as `UnknownAttribute`.
    pub fn require(&self, name: &str) -> Result<&AttributeSpec> {
        self.spec(name).ok_or_else(|| ModelError::UnknownAttribute {
            entity: self.entity.to_string(),
            name: name.to_string(),
        })
    }

    /// Declared attributes in declaration order.
    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }

    pub fn properties(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.specs.iter().filter(|spec| spec.property)
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = AttributeRegistry::new("Widget")
            .declare("name", AttributeOptions::new())
            .unwrap()
            .declare("name", AttributeOptions::new().read_only())
            .unwrap_err();
        assert!(matches!(err, ModelError::DuplicateAttribute { .. }));
    }

    #[test]
    fn test_rules_must_reference_declared_attributes() {
        let err = AttributeRegistry::new("Widget")
            .validates(ValidationRule::Presence("size"))
            .unwrap_err();
        assert!(matches!(err, ModelError::UnknownAttribute { .. }));
    }

    #[test]
    fn test_boolean_coercion() {
        let registry = AttributeRegistry::new("Widget")
            .declare("enabled", AttributeOptions::new().boolean())
            .unwrap();
        let spec = registry.require("enabled").unwrap();
        assert_eq!(spec.coerce(Value::from("yes")), Value::Boolean(true));
        assert_eq!(spec.coerce(Value::Null), Value::Boolean(false));
    }

    #[test]
    fn test_presence_rule() {
        let rule = ValidationRule::Presence("size");
        assert!(rule.check(&Value::Null).is_some());
        assert!(rule.check(&Value::from("  ")).is_some());
        assert!(rule.check(&Value::Integer(0)).is_none());
    }
}
