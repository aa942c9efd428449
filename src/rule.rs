//! Rule definitions, rule files and compiled rule bodies

use crate::assertion::RuleAssertion;
use crate::class::{ClassId, ClassRegistry, RuleClass};
use crate::config::ConfigError;
use crate::error::CompileError;
use crate::feature::{FeatureKind, FeatureRef, KindSet, TagMap};
use crate::fix::FixTemplate;
use crate::issue::Issue;
use crate::region::RegionScope;
use crate::selector::{self, Selector};
use crate::subclass::Subclass;
use crate::template::MessageTemplate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Subclass as written in a rule file: a number, or `{hash: "<template>"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubclassDefinition {
    Fixed(i64),
    Hash { hash: String },
}

impl Default for SubclassDefinition {
    fn default() -> Self {
        SubclassDefinition::Fixed(0)
    }
}

/// Assertion as written in a rule file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionDefinition {
    Plain(String),
    InCountry {
        feature: String,
        #[serde(default)]
        country: Option<String>,
    },
}

impl AssertionDefinition {
    fn parts(&self) -> (&str, Option<&str>) {
        match self {
            AssertionDefinition::Plain(feature) => (feature, None),
            AssertionDefinition::InCountry { feature, country } => (feature, country.as_deref()),
        }
    }
}

/// A rule before compilation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Display name (defaults to `<class>:<selector>`)
    #[serde(default)]
    pub name: Option<String>,

    pub class: ClassId,

    #[serde(default)]
    pub subclass: SubclassDefinition,

    pub selector: String,

    /// Message template (defaults to the class title)
    #[serde(default)]
    pub text: Option<String>,

    /// `key=value template` additions
    #[serde(default)]
    pub fix_add: Vec<String>,

    /// Keys to remove
    #[serde(default)]
    pub fix_remove: Vec<String>,

    /// `old=>new` key renames
    #[serde(default)]
    pub fix_change_key: Vec<String>,

    /// Defaults to true when the rule has a fix
    #[serde(default)]
    pub allow_fix_override: Option<bool>,

    #[serde(default)]
    pub assert_match: Vec<AssertionDefinition>,

    #[serde(default)]
    pub assert_no_match: Vec<AssertionDefinition>,
}

impl RuleDefinition {
    pub fn new(class: ClassId, selector: &str) -> Self {
        Self {
            class,
            selector: selector.to_string(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_subclass(mut self, subclass: i64) -> Self {
        self.subclass = SubclassDefinition::Fixed(subclass);
        self
    }

    pub fn with_subclass_hash(mut self, template: &str) -> Self {
        self.subclass = SubclassDefinition::Hash {
            hash: template.to_string(),
        };
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn fix_add(mut self, addition: &str) -> Self {
        self.fix_add.push(addition.to_string());
        self
    }

    pub fn fix_remove(mut self, key: &str) -> Self {
        self.fix_remove.push(key.to_string());
        self
    }

    pub fn fix_change_key(mut self, rename: &str) -> Self {
        self.fix_change_key.push(rename.to_string());
        self
    }

    pub fn with_allow_fix_override(mut self, allow: bool) -> Self {
        self.allow_fix_override = Some(allow);
        self
    }

    pub fn assert_match(mut self, feature: &str) -> Self {
        self.assert_match.push(AssertionDefinition::Plain(feature.to_string()));
        self
    }

    pub fn assert_match_in(mut self, feature: &str, country: &str) -> Self {
        self.assert_match.push(AssertionDefinition::InCountry {
            feature: feature.to_string(),
            country: Some(country.to_string()),
        });
        self
    }

    pub fn assert_no_match(mut self, feature: &str) -> Self {
        self.assert_no_match.push(AssertionDefinition::Plain(feature.to_string()));
        self
    }

    pub fn assert_no_match_in(mut self, feature: &str, country: &str) -> Self {
        self.assert_no_match.push(AssertionDefinition::InCountry {
            feature: feature.to_string(),
            country: Some(country.to_string()),
        });
        self
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("{}:{}", self.class, self.selector))
    }
}

/// Classes and rules loaded from a YAML or JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub classes: Vec<RuleClass>,

    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let file: Self = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown rule file format: {}",
                    ext
                )))
            }
        };

        debug!(
            "loaded {} classes and {} rules from {}",
            file.classes.len(),
            file.rules.len(),
            path.display()
        );
        Ok(file)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// A compiled, immutable rule
#[derive(Debug, Clone)]
pub struct RuleBody {
    name: String,
    class: ClassId,
    subclass: Subclass,
    selector: Selector,
    text: MessageTemplate,
    fix: Option<FixTemplate>,
    allow_fix_override: bool,
    assertions: Vec<RuleAssertion>,
}

impl RuleBody {
    /// Compile a definition against a built class registry
    pub fn compile(def: &RuleDefinition, classes: &ClassRegistry) -> Result<Self, CompileError> {
        let name = def.display_name();

        let class = classes.get(def.class).ok_or_else(|| CompileError::UnknownClass {
            rule: name.clone(),
            class: def.class,
        })?;

        let selector = selector::parse(&def.selector)?;

        let text = MessageTemplate::parse(def.text.as_deref().unwrap_or(&class.title))?;

        let subclass = match &def.subclass {
            SubclassDefinition::Fixed(value) => Subclass::Fixed(*value),
            SubclassDefinition::Hash { hash } => Subclass::Hashed(MessageTemplate::parse(hash)?),
        };

        let fix = compile_fix(def, &name, &selector)?;

        let referenced = text
            .slots()
            .chain(subclass.slots())
            .chain(fix.iter().flat_map(FixTemplate::slots));
        for slot in referenced {
            if let Some(clause) = selector.clauses().iter().position(|c| !c.guarantees(slot)) {
                return Err(CompileError::UncapturedSlot {
                    rule: name,
                    slot,
                    clause,
                });
            }
        }

        let mut assertions = Vec::new();
        let expectations = def
            .assert_match
            .iter()
            .map(|a| (a, true))
            .chain(def.assert_no_match.iter().map(|a| (a, false)));
        for (assertion, expect_match) in expectations {
            let (feature, country) = assertion.parts();
            let assertion = RuleAssertion::new(feature, country, expect_match).map_err(|e| {
                CompileError::InvalidAssertion {
                    rule: name.clone(),
                    text: feature.to_string(),
                    message: e.to_string(),
                }
            })?;
            assertions.push(assertion);
        }

        let allow_fix_override = def.allow_fix_override.unwrap_or(fix.is_some());

        Ok(Self {
            name,
            class: def.class,
            subclass,
            selector,
            text,
            fix,
            allow_fix_override,
            assertions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> ClassId {
        self.class
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn kinds(&self) -> KindSet {
        self.selector.kinds()
    }

    pub fn applies_to(&self, kind: FeatureKind) -> bool {
        self.kinds().contains(kind)
    }

    pub fn has_fix(&self) -> bool {
        self.fix.is_some()
    }

    pub fn assertions(&self) -> &[RuleAssertion] {
        &self.assertions
    }

    /// Run the rule on one feature
    pub fn evaluate(
        &self,
        feature: &FeatureRef,
        tags: &TagMap,
        region: &dyn RegionScope,
    ) -> Option<Issue> {
        let captures = self.selector.select(feature.kind(), tags, region)?;

        Some(Issue {
            class: self.class,
            subclass: self.subclass.resolve(&captures),
            text: self.text.render(&captures),
            fix: self.fix.as_ref().map(|fix| fix.synthesize(&captures)),
            allow_fix_override: self.allow_fix_override,
            feature: feature.clone(),
        })
    }
}

fn compile_fix(
    def: &RuleDefinition,
    rule: &str,
    selector: &Selector,
) -> Result<Option<FixTemplate>, CompileError> {
    let invalid = |fix: &str, message: &str| CompileError::InvalidFix {
        rule: rule.to_string(),
        fix: fix.to_string(),
        message: message.to_string(),
    };

    let mut fix = FixTemplate::new();

    for addition in &def.fix_add {
        let (key, value) = addition
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| invalid(addition, "expected key=value"))?;
        fix = fix.add(key.trim(), MessageTemplate::parse(value.trim())?);
    }

    for key in &def.fix_remove {
        fix = fix.remove(key.trim());
    }

    for rename in &def.fix_change_key {
        let (old, new) = rename
            .split_once("=>")
            .map(|(old, new)| (old.trim(), new.trim()))
            .filter(|(old, new)| !old.is_empty() && !new.is_empty())
            .ok_or_else(|| invalid(rename, "expected old=>new"))?;

        let slot = captured_slot(selector, old)
            .ok_or_else(|| invalid(rename, "key is not captured at the same position in every alternative"))?;

        fix = fix
            .remove(old)
            .add(new, MessageTemplate::parse(&format!("{{{}.value}}", slot))?);
    }

    if let Some(key) = fix.contradiction() {
        return Err(CompileError::ContradictoryFix {
            rule: rule.to_string(),
            key: key.to_string(),
        });
    }

    Ok((!fix.is_empty()).then_some(fix))
}

/// Position at which every alternative captures `key`
fn captured_slot(selector: &Selector, key: &str) -> Option<usize> {
    let mut found = None;
    for clause in selector.clauses() {
        let slot = clause
            .predicates()
            .iter()
            .position(|p| p.guarantees_capture() && p.key() == Some(key))?;
        match found {
            Some(previous) if previous != slot => return None,
            _ => found = Some(slot),
        }
    }
    found
}
