//! Parser for colon-delimited, line-oriented reports such as `showhdinfo`.
//!
//! The parser only splits keys from values. Field semantics (unit suffixes,
//! parenthetical notes) belong to the entity, which applies the converters
//! in [`convert`].

use log::trace;
use serde::Serialize;

/// One entity's fields as raw strings, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedRecord {
    fields: Vec<(String, String)>,
}

impl ParsedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive lookup; `Some("")` for a key reported without a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys exactly as reported.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, key: String, value: String) {
        self.fields.push((key, value));
    }

    fn append_to_last(&mut self, line: &str) {
        if let Some((_, value)) = self.fields.last_mut() {
            if !value.is_empty() {
                value.push(' ');
            }
            value.push_str(line);
        }
    }
}

/// Splits a report into one [`ParsedRecord`] per entity.
///
/// A record ends at a blank line or when a key repeats. An indented line
/// inside a record continues the previous value even when it holds a colon.
/// With a marker key set, records that never report it are dropped.
#[derive(Debug, Clone, Default)]
pub struct TextBlockParser {
    marker: Option<String>,
}

impl TextBlockParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: Some(marker.into()),
        }
    }

    pub fn parse(&self, text: &str) -> Vec<ParsedRecord> {
        let mut records = Vec::new();
        let mut current = ParsedRecord::new();

        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() {
                self.finish(&mut records, &mut current);
                continue;
            }
            if !current.is_empty() && raw_line.starts_with(char::is_whitespace) {
                current.append_to_last(line);
                continue;
            }

            match line.split_once(':') {
                Some((key, value)) if !key.trim().is_empty() => {
                    let key = key.trim();
                    if current.contains(key) {
                        self.finish(&mut records, &mut current);
                    }
                    current.push(key.to_string(), value.trim().to_string());
                }
                _ => current.append_to_last(line),
            }
        }
        self.finish(&mut records, &mut current);

        trace!("parsed {} record(s)", records.len());
        records
    }

    /// First record of the report, if any.
    pub fn parse_first(&self, text: &str) -> Option<ParsedRecord> {
        self.parse(text).into_iter().next()
    }

    fn finish(&self, records: &mut Vec<ParsedRecord>, current: &mut ParsedRecord) {
        let record = std::mem::take(current);
        if record.is_empty() {
            return;
        }
        match &self.marker {
            Some(marker) if !record.contains(marker) => {
                trace!("dropping block without '{}' marker", marker);
            }
            _ => records.push(record),
        }
    }
}

/// Field converters applied by entities to raw report values.
pub mod convert {
    use lazy_static::lazy_static;
    use regex::Regex;

    lazy_static! {
        static ref UUID_LINE: Regex = Regex::new(r"(?m)UUID:\s*(\S.*?)\s*$")
            .unwrap_or_else(|err| panic!("invalid UUID pattern: {}", err));
    }

    /// First whitespace-separated token: `"20480 MBytes"` -> `"20480"`.
    pub fn leading_token(value: &str) -> Option<&str> {
        value.split_whitespace().next()
    }

    /// Drops trailing parenthetical notes: `"FooVM (UUID: 69..)"` -> `"FooVM"`.
    pub fn strip_parenthetical(value: &str) -> &str {
        match value.find('(') {
            Some(index) => value[..index].trim_end(),
            None => value.trim(),
        }
    }

    /// Text between parenthetical notes, one entry per note-terminated name:
    /// `"FooVM (UUID: 1) BarVM (UUID: 2)"` -> `["FooVM", "BarVM"]`.
    pub fn outside_parentheses(value: &str) -> Vec<&str> {
        let mut names = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (index, ch) in value.char_indices() {
            match ch {
                '(' => {
                    if depth == 0 {
                        names.push(value[start..index].trim());
                    }
                    depth += 1;
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        start = index + 1;
                    }
                }
                _ => {}
            }
        }
        if depth == 0 {
            names.push(value[start..].trim());
        }
        names.retain(|name| !name.is_empty());
        names
    }

    /// Finds the identifier reported on a `UUID: <id>` line of free command output.
    pub fn find_uuid(output: &str) -> Option<&str> {
        UUID_LINE
            .captures(output)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Removes the braces configuration files put around identifiers.
    pub fn strip_braces(value: &str) -> &str {
        value
            .trim()
            .strip_prefix('{')
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or_else(|| value.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::convert::*;
    use super::*;

    const LISTING: &str = "UUID:                 aaa
Location:             /vms/a.vdi

UUID:                 bbb
Location:             /vms/b.vdi
";

    #[test]
    fn test_blank_lines_split_records() {
        let records = TextBlockParser::new().parse(LISTING);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("uuid"), Some("bbb"));
    }

    #[test]
    fn test_repeated_key_splits_records() {
        let text = "UUID: aaa\nLocation: /a\nUUID: bbb\nLocation: /b\n";
        let records = TextBlockParser::new().parse(text);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Location"), Some("/a"));
    }

    #[test]
    fn test_marker_drops_foreign_blocks() {
        let text = "Oracle VM VirtualBox Command Line Management Interface\n\nUUID: aaa\n";
        let records = TextBlockParser::with_marker("UUID").parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("UUID"), Some("aaa"));
    }

    #[test]
    fn test_empty_value_is_kept() {
        let record = TextBlockParser::new()
            .parse_first("Description:\nType: normal (base)\n")
            .unwrap();
        assert_eq!(record.get("description"), Some(""));
        assert_eq!(record.get("type"), Some("normal (base)"));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_unknown_keys_are_verbatim() {
        let record = TextBlockParser::new()
            .parse_first("  Current size on disk: 1218 MBytes  \n")
            .unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["Current size on disk"]);
        assert_eq!(record.get("current size on disk"), Some("1218 MBytes"));
    }

    #[test]
    fn test_lines_without_colon_continue_previous_value() {
        let record = TextBlockParser::new()
            .parse_first("In use by VMs: FooVM\nBarVM\n")
            .unwrap();
        assert_eq!(record.get("in use by vms"), Some("FooVM BarVM"));
    }

    #[test]
    fn test_indented_lines_continue_even_with_colons() {
        let text = "UUID:           aaa
In use by VMs:  FooVM (UUID: 1111)
                BarVM (UUID: 2222)
Location:       /vms/a.vdi
";
        let record = TextBlockParser::with_marker("UUID").parse_first(text).unwrap();
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["UUID", "In use by VMs", "Location"]
        );
        assert_eq!(
            outside_parentheses(record.get("in use by vms").unwrap()),
            vec!["FooVM", "BarVM"]
        );
    }

    #[test]
    fn test_outside_parentheses() {
        assert_eq!(outside_parentheses("FooVM (UUID: 1)"), vec!["FooVM"]);
        assert_eq!(
            outside_parentheses("Foo VM (UUID: 1) BarVM (UUID: 2 (snapshot))"),
            vec!["Foo VM", "BarVM"]
        );
        assert_eq!(outside_parentheses("plain"), vec!["plain"]);
        assert!(outside_parentheses("").is_empty());
    }

    #[test]
    fn test_converters() {
        assert_eq!(leading_token("20480 MBytes"), Some("20480"));
        assert_eq!(leading_token("   "), None);
        assert_eq!(
            strip_parenthetical("FooVM (UUID: 696249ad-00b6-4087-b47f-9b82629efc31)"),
            "FooVM"
        );
        assert_eq!(strip_parenthetical("/a/b.vdi"), "/a/b.vdi");
        assert_eq!(
            find_uuid("0%...100%\nDisk image created. UUID: 5f7ccd06-78ef\n"),
            Some("5f7ccd06-78ef")
        );
        assert_eq!(find_uuid("UUID: FOO"), Some("FOO"));
        assert_eq!(find_uuid("nothing here"), None);
        assert_eq!(strip_braces("{9d2e4353}"), "9d2e4353");
        assert_eq!(strip_braces("9d2e4353"), "9d2e4353");
    }
}
