use crate::core::Value;
use std::collections::BTreeMap;

/// Per-instance record of attributes written since the last sync.
///
/// Keeps the baseline value of each dirty attribute so `changes` can report
/// `(baseline, current)` pairs. Writing a value back to its baseline does not
/// clear the entry.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    baselines: BTreeMap<&'static str, Value>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write; the first write since `clear` captures the baseline.
    pub fn record(&mut self, name: &'static str, baseline: &Value) {
        self.baselines
            .entry(name)
            .or_insert_with(|| baseline.clone());
    }

    pub fn clear(&mut self) {
        self.baselines.clear();
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.baselines.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.baselines.keys().copied()
    }

    pub fn baseline(&self, name: &str) -> Option<&Value> {
        self.baselines.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_write_keeps_baseline() {
        let mut tracker = DirtyTracker::new();
        tracker.record("size", &Value::from("100"));
        tracker.record("size", &Value::from("200"));

        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.baseline("size"), Some(&Value::from("100")));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut tracker = DirtyTracker::new();
        tracker.record("size", &Value::Null);
        tracker.record("location", &Value::Null);
        tracker.clear();

        assert!(tracker.is_empty());
        assert!(!tracker.is_dirty("size"));
    }
}
