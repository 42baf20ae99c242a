//! Element tree of a configuration document such as `VirtualBox.xml`.

use crate::core::{ModelError, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::path::Path;
use std::str;

/// One element with its attributes in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<DocumentElement>,
}

impl DocumentElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: DocumentElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn collect_named<'a>(&'a self, tag: &str, found: &mut Vec<&'a DocumentElement>) {
        if self.tag == tag {
            found.push(self);
        }
        for child in &self.children {
            child.collect_named(tag, found);
        }
    }
}

/// A parsed configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    root: DocumentElement,
}

impl ConfigDocument {
    pub fn from_root(root: DocumentElement) -> Self {
        Self { root }
    }

    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<DocumentElement> = Vec::new();
        let mut root: Option<DocumentElement> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => stack.push(element_from(e)?),
                Ok(Event::Empty(ref e)) => {
                    let element = element_from(e)?;
                    attach(&mut stack, &mut root, element);
                }
                Ok(Event::End(_)) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(ModelError::ParseError(format!(
                        "XML error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )));
                }
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ModelError::ParseError(format!(
                "unclosed element '{}'",
                stack[stack.len() - 1].tag
            )));
        }

        root.map(Self::from_root)
            .ok_or_else(|| ModelError::ParseError("document has no root element".to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub fn root(&self) -> &DocumentElement {
        &self.root
    }

    /// Every element with `tag`, depth-first in document order.
    pub fn elements_named(&self, tag: &str) -> Vec<&DocumentElement> {
        let mut found = Vec::new();
        self.root.collect_named(tag, &mut found);
        found
    }
}

fn attach(
    stack: &mut [DocumentElement],
    root: &mut Option<DocumentElement>,
    element: DocumentElement,
) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

fn element_from(e: &BytesStart) -> Result<DocumentElement> {
    let name = e.name();
    let tag = str::from_utf8(name.as_ref())
        .map_err(|_| ModelError::ParseError("Invalid UTF-8 in tag name".into()))?;

    let mut element = DocumentElement::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ModelError::ParseError(e.to_string()))?;
        let key = str::from_utf8(attr.key.as_ref())
            .map_err(|_| ModelError::ParseError("Invalid UTF-8 in attribute name".into()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ModelError::ParseError(e.to_string()))?;
        element.attributes.push((key.to_string(), value.to_string()));
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = r#"<MediaRegistry>
  <HardDisks>
    <HardDisk uuid="{9d2e4353-d1e9-466c-ac58-f2249264147b}" location="HardDisks/TestJeOS.vdi" format="VDI" type="Normal"/>
    <HardDisk uuid="{5f7ccd06-78ef-47e9-b2bc-515aedd2f288}" location="HardDisks/hobobase.vdi" format="VDI" type="Normal">
      <HardDisk uuid="{00000000-0000-0000-0000-000000000001}" location="diff.vdi" format="VDI"/>
    </HardDisk>
  </HardDisks>
</MediaRegistry>"#;

    #[test]
    fn test_elements_in_document_order() {
        let doc = ConfigDocument::parse(REGISTRY).unwrap();
        assert_eq!(doc.root().tag, "MediaRegistry");

        let disks = doc.elements_named("HardDisk");
        let locations: Vec<&str> = disks
            .iter()
            .filter_map(|disk| disk.attribute("location"))
            .collect();
        assert_eq!(
            locations,
            vec!["HardDisks/TestJeOS.vdi", "HardDisks/hobobase.vdi", "diff.vdi"]
        );
    }

    #[test]
    fn test_attributes_keep_order() {
        let doc = ConfigDocument::parse(REGISTRY).unwrap();
        let first = doc.elements_named("HardDisk")[0];
        let keys: Vec<&str> = first.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["uuid", "location", "format", "type"]);
    }

    #[test]
    fn test_rejects_unclosed_document() {
        assert!(matches!(
            ConfigDocument::parse("<MediaRegistry><HardDisks>"),
            Err(ModelError::ParseError(_))
        ));
        assert!(ConfigDocument::parse("").is_err());
    }
}
