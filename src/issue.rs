//! Issues emitted when a rule matches a feature

use crate::class::ClassId;
use crate::feature::FeatureRef;
use crate::fix::FixDiff;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rule match on one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Class id
    pub class: ClassId,

    /// Stable identity within the class
    pub subclass: i64,

    /// Rendered message
    pub text: String,

    /// Proposed tag changes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<FixDiff>,

    /// Whether consumers may replace the fix with their own
    #[serde(default)]
    pub allow_fix_override: bool,

    /// Feature the issue is about
    pub feature: FeatureRef,
}

impl Issue {
    /// Key used to deduplicate equivalent issues across runs
    pub fn identity(&self) -> (ClassId, i64, &FeatureRef) {
        (self.class, self.subclass, &self.feature)
    }

    pub fn has_fix(&self) -> bool {
        self.fix.as_ref().is_some_and(|f| !f.is_empty())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}/{}] {}",
            self.feature, self.class, self.subclass, self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn issue() -> Issue {
        Issue {
            class: 40201,
            subclass: 0,
            text: "Roundabout as area".to_string(),
            fix: Some(FixDiff {
                removals: BTreeSet::from(["area".to_string()]),
                ..FixDiff::default()
            }),
            allow_fix_override: true,
            feature: FeatureRef::line(12, vec![1, 2, 3, 1]),
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(issue().to_string(), "line 12 [40201/0] Roundabout as area");
    }

    #[test]
    fn test_has_fix() {
        let mut issue = issue();
        assert!(issue.has_fix());
        issue.fix = Some(FixDiff::default());
        assert!(!issue.has_fix());
        issue.fix = None;
        assert!(!issue.has_fix());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(issue()).unwrap();
        assert_eq!(json["class"], 40201);
        assert_eq!(json["feature"]["type"], "line");
        assert_eq!(json["feature"]["nodes"][3], 1);
        assert_eq!(json["fix"]["removals"][0], "area");

        let back: Issue = serde_json::from_value(json).unwrap();
        assert_eq!(back.identity(), issue().identity());
    }
}
