//! Core rule engine

use crate::assertion::AssertionFailure;
use crate::class::{check_level, ClassId, ClassRegistry, ClassRegistryBuilder, RuleClass, Severity};
use crate::config::{Config, EngineConfig};
use crate::error::{CompileError, EvalError, SetupError};
use crate::feature::{Feature, FeatureKind, FeatureRef, TagMap};
use crate::issue::Issue;
use crate::region::{CountryScope, RegionScope};
use crate::rule::{RuleBody, RuleDefinition, RuleFile};
use crate::rules;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Result of checking a batch of features
#[derive(Debug, Default)]
pub struct CheckResult {
    /// All issues, in input order
    pub issues: Vec<Issue>,

    /// Features processed
    pub features_processed: usize,

    /// Features with at least one issue
    pub features_with_issues: usize,

    /// Issues of level 1
    pub error_count: usize,

    /// Issues of level 2
    pub warning_count: usize,

    /// Issues of level 3
    pub info_count: usize,

    /// Issue count per class
    pub class_counts: BTreeMap<ClassId, usize>,

    /// Processing duration
    pub duration: Duration,
}

impl CheckResult {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Get exit code (0 = clean, 1 = issues found)
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() {
            0
        } else {
            1
        }
    }

    fn record(&mut self, issues: Vec<Issue>, classes: &ClassRegistry) {
        self.features_processed += 1;
        if !issues.is_empty() {
            self.features_with_issues += 1;
        }
        for issue in &issues {
            match classes.severity(issue.class) {
                Severity::Error => self.error_count += 1,
                Severity::Warning => self.warning_count += 1,
                Severity::Info => self.info_count += 1,
            }
            *self.class_counts.entry(issue.class).or_default() += 1;
        }
        self.issues.extend(issues);
    }
}

/// Collects classes and rule definitions, then compiles them into an [`Engine`]
pub struct EngineBuilder {
    classes: ClassRegistryBuilder,
    definitions: Vec<RuleDefinition>,
    scope: Arc<dyn RegionScope>,
    settings: EngineConfig,
    disabled: HashSet<ClassId>,
    only: HashSet<ClassId>,
    levels: HashMap<ClassId, u8>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            classes: ClassRegistryBuilder::new(),
            definitions: Vec::new(),
            scope: Arc::new(CountryScope::unknown()),
            settings: EngineConfig::default(),
            disabled: HashSet::new(),
            only: HashSet::new(),
            levels: HashMap::new(),
        }
    }

    /// Builder configured from a loaded [`Config`]
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        let mut builder = Self::new()
            .with_settings(config.engine.clone())
            .with_scope(Arc::new(config.region_scope()));

        if config.rules.builtin {
            builder = builder.with_builtin_rules()?;
        }
        for path in &config.rules.files {
            builder.add_rule_file(RuleFile::load(path)?)?;
        }

        builder.disabled.extend(config.rules.disabled.iter().copied());
        builder.only.extend(config.rules.only.iter().copied());
        builder.levels.extend(config.rules.level.iter().map(|(k, v)| (*k, *v)));

        Ok(builder)
    }

    pub fn with_scope(mut self, scope: Arc<dyn RegionScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_settings(mut self, settings: EngineConfig) -> Self {
        self.settings = settings;
        self
    }

    /// Register the built-in classes and rules
    pub fn with_builtin_rules(mut self) -> Result<Self, CompileError> {
        for class in rules::builtin_classes() {
            self.register_class(class)?;
        }
        self.definitions.extend(rules::builtin_rules());
        Ok(self)
    }

    pub fn register_class(&mut self, class: RuleClass) -> Result<ClassId, CompileError> {
        self.classes.register(class)
    }

    pub fn add_rule(&mut self, definition: RuleDefinition) {
        self.definitions.push(definition);
    }

    /// Register a rule file's classes and queue its rules
    pub fn add_rule_file(&mut self, file: RuleFile) -> Result<(), CompileError> {
        for class in file.classes {
            self.register_class(class)?;
        }
        self.definitions.extend(file.rules);
        Ok(())
    }

    pub fn disable_class(mut self, class: ClassId) -> Self {
        self.disabled.insert(class);
        self
    }

    pub fn only_classes(mut self, classes: &[ClassId]) -> Self {
        self.only.extend(classes.iter().copied());
        self
    }

    pub fn with_level(mut self, class: ClassId, level: u8) -> Self {
        self.levels.insert(class, level);
        self
    }

    fn is_enabled(&self, class: ClassId) -> bool {
        !self.disabled.contains(&class) && (self.only.is_empty() || self.only.contains(&class))
    }

    /// Freeze the class registry and compile every enabled rule
    pub fn build(mut self) -> Result<Engine, CompileError> {
        for (&class, &level) in &self.levels {
            check_level(class, level)?;
            match self.classes.get_mut(class) {
                Some(c) => c.level = level,
                None => warn!("level override for unknown class {}", class),
            }
        }

        let registry = Arc::new(std::mem::take(&mut self.classes).build());

        let mut compiled = Vec::new();
        for definition in &self.definitions {
            if !self.is_enabled(definition.class) {
                debug!("skipping disabled rule {}", definition.display_name());
                continue;
            }
            compiled.push(RuleBody::compile(definition, &registry)?);
        }

        debug!(
            "compiled {} rules across {} classes",
            compiled.len(),
            registry.len()
        );

        Ok(Engine {
            classes: registry,
            rules: compiled,
            scope: self.scope,
            settings: self.settings,
        })
    }
}

/// Compiled rules plus the region scope they run in
pub struct Engine {
    classes: Arc<ClassRegistry>,
    rules: Vec<RuleBody>,
    scope: Arc<dyn RegionScope>,
    settings: EngineConfig,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Engine with the built-in rules and default settings
    pub fn with_builtin_rules() -> Result<Self, CompileError> {
        EngineBuilder::new().with_builtin_rules()?.build()
    }

    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        Ok(EngineBuilder::from_config(config)?.build()?)
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Shared handle to the class registry
    pub fn class_registry(&self) -> Arc<ClassRegistry> {
        Arc::clone(&self.classes)
    }

    pub fn rules(&self) -> &[RuleBody] {
        &self.rules
    }

    pub fn evaluate_point(&self, feature: &FeatureRef, tags: &TagMap) -> Result<Vec<Issue>, EvalError> {
        self.evaluate_kind(FeatureKind::Point, feature, tags)
    }

    pub fn evaluate_line(&self, feature: &FeatureRef, tags: &TagMap) -> Result<Vec<Issue>, EvalError> {
        self.evaluate_kind(FeatureKind::Line, feature, tags)
    }

    pub fn evaluate_relation(
        &self,
        feature: &FeatureRef,
        tags: &TagMap,
    ) -> Result<Vec<Issue>, EvalError> {
        self.evaluate_kind(FeatureKind::Relation, feature, tags)
    }

    /// Evaluate a feature of any kind
    pub fn evaluate(&self, feature: &Feature) -> Vec<Issue> {
        self.run(&feature.reference, &feature.tags, self.scope.as_ref())
    }

    fn evaluate_kind(
        &self,
        expected: FeatureKind,
        feature: &FeatureRef,
        tags: &TagMap,
    ) -> Result<Vec<Issue>, EvalError> {
        let found = feature.kind();
        if found != expected {
            return Err(EvalError::KindMismatch { expected, found });
        }
        Ok(self.run(feature, tags, self.scope.as_ref()))
    }

    fn run(&self, feature: &FeatureRef, tags: &TagMap, region: &dyn RegionScope) -> Vec<Issue> {
        let kind = feature.kind();
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(kind))
            .filter_map(|rule| rule.evaluate(feature, tags, region))
            .collect()
    }

    /// Evaluate many features, in parallel when enabled
    pub fn evaluate_all(&self, features: &[Feature]) -> CheckResult {
        let start = Instant::now();

        let per_feature: Vec<Vec<Issue>> = if self.settings.parallel && features.len() > 1 {
            let jobs = if self.settings.jobs > 0 {
                self.settings.jobs
            } else {
                num_cpus::get()
            };
            match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(|| features.par_iter().map(|f| self.evaluate(f)).collect()),
                Err(e) => {
                    warn!("could not start thread pool ({}), running sequentially", e);
                    features.iter().map(|f| self.evaluate(f)).collect()
                }
            }
        } else {
            features.iter().map(|f| self.evaluate(f)).collect()
        };

        let mut result = CheckResult::default();
        for issues in per_feature {
            result.record(issues, &self.classes);
        }
        result.duration = start.elapsed();

        debug!(
            "checked {} features in {:?}, {} issues",
            result.features_processed,
            result.duration,
            result.issues.len()
        );
        result
    }

    /// Run every rule's match / no-match assertions
    pub fn self_check(&self) -> Vec<AssertionFailure> {
        let mut failures = Vec::new();
        for rule in &self.rules {
            for assertion in rule.assertions() {
                let scope = assertion.scope();
                let feature = &assertion.feature;
                let matched = rule.applies_to(feature.kind())
                    && rule
                        .evaluate(&feature.reference, &feature.tags, &scope)
                        .is_some();

                if matched != assertion.expect_match {
                    failures.push(AssertionFailure {
                        rule: rule.name().to_string(),
                        class: rule.class(),
                        feature: assertion.text.clone(),
                        country: assertion.country.clone(),
                        expected: assertion.expect_match,
                    });
                }
            }
        }
        debug!("self check: {} failures", failures.len());
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleDefinition;

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn small_engine() -> Engine {
        let mut builder = EngineBuilder::new();
        builder
            .register_class(RuleClass::new(1, 1, 1, "first"))
            .unwrap();
        builder
            .register_class(RuleClass::new(2, 1, 3, "second"))
            .unwrap();
        builder.add_rule(RuleDefinition::new(1, "way[highway][fee]").assert_match("way highway=x fee=yes"));
        builder.add_rule(RuleDefinition::new(2, "*[fee]").assert_no_match("node fee=yes"));
        builder.build().unwrap()
    }

    #[test]
    fn test_check_result_exit_code() {
        let mut result = CheckResult::default();
        assert_eq!(result.exit_code(), 0);
        assert!(result.is_clean());

        result.issues.push(Issue {
            class: 1,
            subclass: 0,
            text: String::new(),
            fix: None,
            allow_fix_override: false,
            feature: FeatureRef::point(1),
        });
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_rules_run_in_registration_order() {
        let engine = small_engine();
        let issues = engine
            .evaluate_line(&FeatureRef::line(1, vec![]), &tags(&[("fee", "yes"), ("highway", "x")]))
            .unwrap();
        let classes: Vec<_> = issues.iter().map(|i| i.class).collect();
        assert_eq!(classes, vec![1, 2]);
    }

    #[test]
    fn test_kind_mismatch() {
        let engine = small_engine();
        let err = engine
            .evaluate_point(&FeatureRef::line(1, vec![]), &TagMap::new())
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::KindMismatch {
                expected: FeatureKind::Point,
                found: FeatureKind::Line
            }
        );
    }

    #[test]
    fn test_kind_filter() {
        let engine = small_engine();
        let issues = engine
            .evaluate_point(&FeatureRef::point(1), &tags(&[("fee", "yes"), ("highway", "x")]))
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].class, 2);
    }

    #[test]
    fn test_self_check_reports_failures() {
        let failures = small_engine().self_check();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].class, 2);
        assert!(!failures[0].expected);
    }

    #[test]
    fn test_disabled_and_level_override() {
        let mut builder = EngineBuilder::new();
        builder.register_class(RuleClass::new(1, 1, 1, "a")).unwrap();
        builder.register_class(RuleClass::new(2, 1, 1, "b")).unwrap();
        builder.add_rule(RuleDefinition::new(1, "*[a]"));
        builder.add_rule(RuleDefinition::new(2, "*[a]"));
        let engine = builder.disable_class(1).with_level(2, 3).build().unwrap();

        assert_eq!(engine.rules().len(), 1);
        assert_eq!(engine.classes().severity(2), Severity::Info);
    }

    #[test]
    fn test_duplicate_class_fails() {
        let mut builder = EngineBuilder::new();
        builder.register_class(RuleClass::new(1, 1, 1, "a")).unwrap();
        assert!(builder.register_class(RuleClass::new(1, 1, 1, "a")).is_err());
    }

    #[test]
    fn test_level_override_out_of_range_fails() {
        let mut builder = EngineBuilder::new();
        builder.register_class(RuleClass::new(1, 1, 1, "a")).unwrap();

        assert!(matches!(
            builder.with_level(1, 4).build(),
            Err(CompileError::InvalidLevel { class: 1, level: 4 })
        ));
    }

    #[test]
    fn test_evaluate_all_counts() {
        let engine = small_engine();
        let features = vec![
            Feature::new(FeatureRef::line(1, vec![]), tags(&[("fee", "yes"), ("highway", "x")])),
            Feature::new(FeatureRef::point(2), tags(&[("amenity", "bench")])),
            Feature::new(FeatureRef::point(3), tags(&[("fee", "no")])),
        ];

        let result = engine.evaluate_all(&features);
        assert_eq!(result.features_processed, 3);
        assert_eq!(result.features_with_issues, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.info_count, 2);
        assert_eq!(result.class_counts.get(&2), Some(&2));

        let ids: Vec<_> = result.issues.iter().map(|i| i.feature.id()).collect();
        assert_eq!(ids, vec![1, 1, 3]);
    }

    #[test]
    fn test_evaluate_all_sequential_matches_parallel() {
        let features: Vec<Feature> = (0..50)
            .map(|i| Feature::new(FeatureRef::point(i), tags(&[("fee", "yes")])))
            .collect();

        let parallel = small_engine().evaluate_all(&features);

        let mut sequential_engine = small_engine();
        sequential_engine.settings.parallel = false;
        let sequential = sequential_engine.evaluate_all(&features);

        assert_eq!(parallel.issues, sequential.issues);
    }
}
