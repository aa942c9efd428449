//! Tag diff synthesis for issue fixes

use crate::capture::Captures;
use crate::feature::TagMap;
use crate::template::MessageTemplate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Concrete tag changes proposed for a feature.
///
/// Apply removals first, then additions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixDiff {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additions: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub removals: BTreeSet<String>,
}

impl FixDiff {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Return a copy of `tags` with this diff applied
    pub fn apply(&self, tags: &TagMap) -> TagMap {
        let mut fixed = tags.clone();
        for key in &self.removals {
            fixed.remove(key);
        }
        for (key, value) in &self.additions {
            fixed.insert(key.clone(), value.clone());
        }
        fixed
    }
}

impl fmt::Display for FixDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        parts.extend(self.removals.iter().map(|k| format!("-{}", k)));
        parts.extend(self.additions.iter().map(|(k, v)| format!("+{}={}", k, v)));
        write!(f, "{}", parts.join(" "))
    }
}

/// Compiled fix: literal keys with templated values, plus keys to remove
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixTemplate {
    additions: Vec<(String, MessageTemplate)>,
    removals: Vec<String>,
}

impl FixTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `key` with a value rendered from `value`
    pub fn add(mut self, key: &str, value: MessageTemplate) -> Self {
        self.additions.push((key.to_string(), value));
        self
    }

    /// Remove `key`
    pub fn remove(mut self, key: &str) -> Self {
        self.removals.push(key.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// First key that is both added and removed, or added twice
    pub fn contradiction(&self) -> Option<&str> {
        self.additions.iter().enumerate().find_map(|(i, (key, _))| {
            let removed = self.removals.iter().any(|r| r == key);
            let added_before = self.additions[..i].iter().any(|(k, _)| k == key);
            (removed || added_before).then_some(key.as_str())
        })
    }

    /// Slots referenced by addition values
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.additions.iter().flat_map(|(_, value)| value.slots())
    }

    pub fn synthesize(&self, captures: &Captures<'_>) -> FixDiff {
        FixDiff {
            additions: self
                .additions
                .iter()
                .map(|(key, value)| (key.clone(), value.render(captures)))
                .collect(),
            removals: self.removals.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn template(text: &str) -> MessageTemplate {
        MessageTemplate::parse(text).unwrap()
    }

    #[test]
    fn test_synthesize_rename() {
        let mut captures = Captures::with_slots(2);
        captures.set(1, "fee", "yes");

        let fix = FixTemplate::new().remove("fee").add("toll", template("{1.value}"));
        let diff = fix.synthesize(&captures);

        assert_eq!(diff.additions.get("toll").map(String::as_str), Some("yes"));
        assert!(diff.removals.contains("fee"));
        assert_eq!(diff.to_string(), "-fee +toll=yes");
    }

    #[test]
    fn test_synthesize_literal() {
        let fix = FixTemplate::new()
            .remove("recycling:glass")
            .add("recycling:glass_bottles", template("yes"));
        let diff = fix.synthesize(&Captures::with_slots(0));

        assert_eq!(
            diff.additions,
            BTreeMap::from([("recycling:glass_bottles".to_string(), "yes".to_string())])
        );
        assert_eq!(diff.removals, BTreeSet::from(["recycling:glass".to_string()]));
    }

    #[test]
    fn test_contradiction() {
        let fix = FixTemplate::new().remove("area").add("area", template("no"));
        assert_eq!(fix.contradiction(), Some("area"));
        assert_eq!(FixTemplate::new().remove("area").contradiction(), None);

        let fix = FixTemplate::new()
            .add("toll", template("yes"))
            .add("toll", template("no"));
        assert_eq!(fix.contradiction(), Some("toll"));
    }

    #[test]
    fn test_apply_removes_then_adds() {
        let tags: TagMap = [("fee", "yes"), ("highway", "primary")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let diff = FixDiff {
            additions: BTreeMap::from([("toll".to_string(), "yes".to_string())]),
            removals: BTreeSet::from(["fee".to_string()]),
        };

        let fixed = diff.apply(&tags);
        assert!(!fixed.contains_key("fee"));
        assert_eq!(fixed.get("toll").map(String::as_str), Some("yes"));
        assert_eq!(fixed.len(), 2);
    }

    #[test]
    fn test_serialize_skips_empty_parts() {
        let diff = FixDiff {
            additions: BTreeMap::new(),
            removals: BTreeSet::from(["area".to_string()]),
        };
        let json = serde_json::to_string(&diff).unwrap();
        assert_eq!(json, r#"{"removals":["area"]}"#);
    }
}
