//! JSON output formatter

use super::OutputFormatter;
use crate::class::{ClassId, ClassRegistry};
use crate::engine::CheckResult;
use crate::feature::FeatureRef;
use crate::fix::FixDiff;
use crate::issue::Issue;
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    issues: Vec<JsonIssue<'a>>,
    summary: JsonSummary<'a>,
}

#[derive(Serialize)]
struct JsonIssue<'a> {
    class: ClassId,
    subclass: i64,
    item: Option<u32>,
    level: Option<u8>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fix: Option<&'a FixDiff>,
    allow_fix_override: bool,
    feature: &'a FeatureRef,
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    features_processed: usize,
    features_with_issues: usize,
    error_count: usize,
    warning_count: usize,
    info_count: usize,
    class_counts: &'a BTreeMap<ClassId, usize>,
    duration_ms: u128,
}

fn json_issue<'a>(issue: &'a Issue, classes: &ClassRegistry) -> JsonIssue<'a> {
    let class = classes.get(issue.class);
    JsonIssue {
        class: issue.class,
        subclass: issue.subclass,
        item: class.map(|c| c.item),
        level: class.map(|c| c.level),
        text: &issue.text,
        fix: issue.fix.as_ref(),
        allow_fix_override: issue.allow_fix_override,
        feature: &issue.feature,
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, result: &CheckResult, classes: &ClassRegistry) -> String {
        let output = JsonOutput {
            issues: result.issues.iter().map(|i| json_issue(i, classes)).collect(),
            summary: JsonSummary {
                features_processed: result.features_processed,
                features_with_issues: result.features_with_issues,
                error_count: result.error_count,
                warning_count: result.warning_count,
                info_count: result.info_count,
                class_counts: &result.class_counts,
                duration_ms: result.duration.as_millis(),
            },
        };
        self.render(&output)
    }

    fn format_issue(&self, issue: &Issue, classes: &ClassRegistry) -> String {
        self.render(&json_issue(issue, classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassRegistryBuilder, RuleClass};
    use std::collections::BTreeSet;

    fn classes() -> ClassRegistry {
        let mut builder = ClassRegistryBuilder::new();
        builder
            .register(RuleClass::new(40201, 4020, 1, "Roundabout as area"))
            .unwrap();
        builder.build()
    }

    fn issue() -> Issue {
        Issue {
            class: 40201,
            subclass: 0,
            text: "Roundabout as area".to_string(),
            fix: Some(FixDiff {
                additions: BTreeMap::new(),
                removals: BTreeSet::from(["area".to_string()]),
            }),
            allow_fix_override: true,
            feature: FeatureRef::line(9, vec![]),
        }
    }

    #[test]
    fn test_json_format_issue() {
        let output = JsonFormatter::new().format_issue(&issue(), &classes());
        assert!(output.contains("\"class\":40201"));
        assert!(output.contains("\"item\":4020"));
        assert!(output.contains("\"removals\":[\"area\"]"));
        assert!(output.contains("\"type\":\"line\""));
    }

    #[test]
    fn test_json_format_result() {
        let result = CheckResult {
            issues: vec![issue()],
            features_processed: 5,
            features_with_issues: 1,
            error_count: 1,
            class_counts: BTreeMap::from([(40201, 1)]),
            ..Default::default()
        };

        let output = JsonFormatter::new().format(&result, &classes());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["summary"]["features_processed"], 5);
        assert_eq!(value["summary"]["class_counts"]["40201"], 1);
        assert_eq!(value["issues"][0]["subclass"], 0);
    }

    #[test]
    fn test_json_pretty() {
        let output = JsonFormatter::new().pretty().format_issue(&issue(), &classes());
        assert!(output.contains('\n'));
    }
}
