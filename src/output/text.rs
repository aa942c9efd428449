//! Human-readable text output formatter

use super::OutputFormatter;
use crate::class::{ClassRegistry, Severity};
use crate::engine::CheckResult;
use crate::feature::FeatureRef;
use crate::issue::Issue;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show class title, trap and detail
    pub verbose: bool,

    /// Show fix diffs
    pub show_fixes: bool,

    /// Show summary and per-class counts
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            verbose: false,
            show_fixes: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Error => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn paint(&self, text: String, color: Color) -> String {
        if self.colored {
            text.color(color).to_string()
        } else {
            text
        }
    }

    fn count(&self, n: usize, singular: &str, plural: &str, color: Color) -> Option<String> {
        (n > 0).then(|| self.paint(format!("{} {}", n, if n == 1 { singular } else { plural }), color))
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, result: &CheckResult, classes: &ClassRegistry) -> String {
        let mut output = String::new();

        // Issues arrive in feature order; print a header per feature
        let mut current: Option<&FeatureRef> = None;
        for issue in &result.issues {
            if current != Some(&issue.feature) {
                if current.is_some() {
                    output.push('\n');
                }
                let header = issue.feature.to_string();
                if self.colored {
                    output.push_str(&format!("{}\n", header.underline()));
                } else {
                    output.push_str(&format!("{}\n", header));
                }
                current = Some(&issue.feature);
            }
            output.push_str(&self.format_issue(issue, classes));
        }

        if self.show_stats {
            if !result.issues.is_empty() {
                output.push('\n');
            }
            output.push_str(&format!(
                "{} {} checked",
                result.features_processed,
                if result.features_processed == 1 {
                    "feature"
                } else {
                    "features"
                }
            ));

            let counts: Vec<String> = [
                self.count(result.error_count, "error", "errors", Color::Red),
                self.count(result.warning_count, "warning", "warnings", Color::Yellow),
                self.count(result.info_count, "info", "infos", Color::Blue),
            ]
            .into_iter()
            .flatten()
            .collect();

            if !counts.is_empty() {
                output.push_str(&format!(": {}", counts.join(", ")));
            }
            output.push('\n');

            if self.verbose && !result.class_counts.is_empty() {
                for (class, count) in &result.class_counts {
                    let title = classes.get(*class).map(|c| c.title.as_str()).unwrap_or("");
                    output.push_str(&format!("{:>8} {:>6}  {}\n", class, count, title));
                }
            }

            output.push_str(&format!(
                "Finished in {:.2}s\n",
                result.duration.as_secs_f64()
            ));
        }

        output
    }

    fn format_issue(&self, issue: &Issue, classes: &ClassRegistry) -> String {
        let mut output = String::new();
        let class = classes.get(issue.class);

        output.push_str(&format!(
            "  {}[{}]: {}\n",
            self.severity_str(classes.severity(issue.class)),
            self.paint(format!("{}/{}", issue.class, issue.subclass), Color::Cyan),
            issue.text
        ));

        if self.show_fixes {
            if let Some(fix) = issue.fix.as_ref().filter(|f| !f.is_empty()) {
                output.push_str(&format!(
                    "    {} fix: {}\n",
                    self.paint("=".to_string(), Color::Green),
                    self.paint(fix.to_string(), Color::Green)
                ));
            }
        }

        if self.verbose {
            if let Some(class) = class {
                if class.title != issue.text && !class.title_is_template() {
                    output.push_str(&format!("    = {}\n", class.title));
                }
                if let Some(trap) = &class.trap {
                    output.push_str(&format!("    = trap: {}\n", trap));
                }
                if let Some(detail) = &class.detail {
                    output.push_str(&format!("    = detail: {}\n", detail));
                }
                if let Some(resource) = &class.resource {
                    output.push_str(&format!("    = see: {}\n", resource));
                }
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassRegistryBuilder, RuleClass};
    use crate::fix::FixDiff;
    use std::collections::{BTreeMap, BTreeSet};

    fn classes() -> ClassRegistry {
        let mut builder = ClassRegistryBuilder::new();
        builder
            .register(
                RuleClass::new(30320, 3032, 1, "Watch multiple tags")
                    .with_trap("Check the toll first."),
            )
            .unwrap();
        builder.build()
    }

    fn issue() -> Issue {
        Issue {
            class: 30320,
            subclass: 1000,
            text: "Use tag \"toll\" instead of \"fee\"".to_string(),
            fix: Some(FixDiff {
                additions: BTreeMap::from([("toll".to_string(), "yes".to_string())]),
                removals: BTreeSet::from(["fee".to_string()]),
            }),
            allow_fix_override: true,
            feature: FeatureRef::line(42, vec![1, 2]),
        }
    }

    #[test]
    fn test_format_issue() {
        let formatter = TextFormatter::new().without_color();
        let output = formatter.format_issue(&issue(), &classes());

        assert!(output.contains("error[30320/1000]"));
        assert!(output.contains("instead of \"fee\""));
        assert!(output.contains("fix: -fee +toll=yes"));
        assert!(!output.contains("trap:"));
    }

    #[test]
    fn test_format_issue_verbose() {
        let formatter = TextFormatter::new().without_color().verbose(true);
        let output = formatter.format_issue(&issue(), &classes());

        assert!(output.contains("= Watch multiple tags"));
        assert!(output.contains("trap: Check the toll first."));
    }

    #[test]
    fn test_format_issue_verbose_skips_template_title() {
        let mut builder = ClassRegistryBuilder::new();
        builder
            .register(RuleClass::new(30320, 3032, 1, "{0.tag} with {1.tag}"))
            .unwrap();
        let formatter = TextFormatter::new().without_color().verbose(true);
        let output = formatter.format_issue(&issue(), &builder.build());

        assert!(output.contains("instead of \"fee\""));
        assert!(!output.contains("{0.tag}"));
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_format_result() {
        let formatter = TextFormatter::new().without_color();
        let result = CheckResult {
            issues: vec![issue()],
            features_processed: 3,
            features_with_issues: 1,
            error_count: 1,
            ..Default::default()
        };

        let output = formatter.format(&result, &classes());
        assert!(output.starts_with("line 42\n"));
        assert!(output.contains("3 features checked: 1 error"));
    }

    #[test]
    fn test_format_clean_result() {
        let formatter = TextFormatter::new().without_color();
        let result = CheckResult {
            features_processed: 1,
            ..Default::default()
        };

        let output = formatter.format(&result, &classes());
        assert!(output.starts_with("1 feature checked\n"));
    }
}
