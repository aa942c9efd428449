//! Rule classes and the class registry

use crate::error::CompileError;
use crate::template::MessageTemplate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Numeric class identifier, unique per process
pub type ClassId = u32;

/// Severity derived from a class level
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Level 3
    Info,
    /// Level 2
    #[default]
    Warning,
    /// Level 1
    Error,
}

impl Severity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 | 1 => Severity::Error,
            2 => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Issue class metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleClass {
    pub id: ClassId,

    /// Item grouping several classes
    pub item: u32,

    /// 1 = most severe, 3 = least
    pub level: u8,

    /// Category tags (e.g. "tag", "highway", "fix:chair")
    #[serde(default)]
    pub tags: Vec<String>,

    /// Title; may reference captures like rule text
    pub title: String,

    /// What to double check before fixing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trap: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// How to fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,

    /// Documentation link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl RuleClass {
    pub fn new(id: ClassId, item: u32, level: u8, title: &str) -> Self {
        Self {
            id,
            item,
            level,
            tags: Vec::new(),
            title: title.to_string(),
            trap: None,
            detail: None,
            fix: None,
            resource: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags.extend(tags.iter().map(|t| t.to_string()));
        self
    }

    pub fn with_trap(mut self, trap: &str) -> Self {
        self.trap = Some(trap.to_string());
        self
    }

    pub fn with_detail(mut self, detail: &str) -> Self {
        self.detail = Some(detail.to_string());
        self
    }

    pub fn with_fix(mut self, fix: &str) -> Self {
        self.fix = Some(fix.to_string());
        self
    }

    pub fn with_resource(mut self, url: &str) -> Self {
        self.resource = Some(url.to_string());
        self
    }

    pub fn severity(&self) -> Severity {
        Severity::from_level(self.level)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// True when the title references captures and only makes sense rendered
    pub fn title_is_template(&self) -> bool {
        MessageTemplate::parse(&self.title).map_or(false, |t| !t.is_static())
    }
}

/// Levels run from 1 (most severe) to 3
pub const LEVELS: std::ops::RangeInclusive<u8> = 1..=3;

pub(crate) fn check_level(class: ClassId, level: u8) -> Result<(), CompileError> {
    if LEVELS.contains(&level) {
        Ok(())
    } else {
        Err(CompileError::InvalidLevel { class, level })
    }
}

/// Collects classes before the registry is frozen
#[derive(Debug, Default)]
pub struct ClassRegistryBuilder {
    classes: Vec<RuleClass>,
    index: HashMap<ClassId, usize>,
}

impl ClassRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class. Registering an id twice or a level outside 1..=3 is an error.
    pub fn register(&mut self, class: RuleClass) -> Result<ClassId, CompileError> {
        let id = class.id;
        if self.index.contains_key(&id) {
            return Err(CompileError::DuplicateClass(id));
        }
        check_level(id, class.level)?;
        self.index.insert(id, self.classes.len());
        self.classes.push(class);
        Ok(id)
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.index.contains_key(&id)
    }

    /// Mutable access before the registry is built
    pub fn get_mut(&mut self, id: ClassId) -> Option<&mut RuleClass> {
        let i = *self.index.get(&id)?;
        self.classes.get_mut(i)
    }

    pub fn build(self) -> ClassRegistry {
        ClassRegistry {
            classes: self.classes,
            index: self.index,
        }
    }
}

/// Immutable class registry
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<RuleClass>,
    index: HashMap<ClassId, usize>,
}

impl ClassRegistry {
    pub fn get(&self, id: ClassId) -> Option<&RuleClass> {
        self.index.get(&id).and_then(|&i| self.classes.get(i))
    }

    pub fn contains(&self, id: ClassId) -> bool {
        self.index.contains_key(&id)
    }

    /// Severity of a class; unknown classes are warnings
    pub fn severity(&self, id: ClassId) -> Severity {
        self.get(id).map(RuleClass::severity).unwrap_or_default()
    }

    /// Classes in registration order
    pub fn iter(&self) -> impl Iterator<Item = &RuleClass> {
        self.classes.iter()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_from_level() {
        assert_eq!(Severity::from_level(1), Severity::Error);
        assert_eq!(Severity::from_level(2), Severity::Warning);
        assert_eq!(Severity::from_level(3), Severity::Info);
    }

    #[test]
    fn test_register_and_get() {
        let mut builder = ClassRegistryBuilder::new();
        let id = builder
            .register(
                RuleClass::new(21102, 2110, 2, "Missing relation type")
                    .with_tags(&["tag"])
                    .with_detail("The relation is missing a `type` tag."),
            )
            .unwrap();
        assert_eq!(id, 21102);

        let registry = builder.build();
        let class = registry.get(21102).unwrap();
        assert_eq!(class.item, 2110);
        assert_eq!(class.severity(), Severity::Warning);
        assert!(class.has_tag("tag"));
        assert!(registry.get(1).is_none());
    }

    #[test]
    fn test_title_is_template() {
        assert!(!RuleClass::new(1, 1, 1, "Missing relation type").title_is_template());
        assert!(RuleClass::new(2, 1, 1, "{0.tag} together with {1.tag}").title_is_template());
    }

    #[test]
    fn test_duplicate_class() {
        let mut builder = ClassRegistryBuilder::new();
        builder.register(RuleClass::new(1, 1, 1, "a")).unwrap();

        assert!(matches!(
            builder.register(RuleClass::new(1, 1, 2, "b")),
            Err(CompileError::DuplicateClass(1))
        ));
    }

    #[test]
    fn test_level_out_of_range() {
        let mut builder = ClassRegistryBuilder::new();

        assert!(matches!(
            builder.register(RuleClass::new(1, 1, 0, "a")),
            Err(CompileError::InvalidLevel { class: 1, level: 0 })
        ));
        assert!(matches!(
            builder.register(RuleClass::new(2, 1, 9, "b")),
            Err(CompileError::InvalidLevel { class: 2, level: 9 })
        ));
        assert!(builder.build().is_empty());
    }

    #[test]
    fn test_registration_order() {
        let mut builder = ClassRegistryBuilder::new();
        for id in [30, 10, 20] {
            builder.register(RuleClass::new(id, 1, 3, "t")).unwrap();
        }
        let ids: Vec<_> = builder.build().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[test]
    fn test_get_mut_before_build() {
        let mut builder = ClassRegistryBuilder::new();
        builder.register(RuleClass::new(7, 1, 3, "t")).unwrap();
        if let Some(class) = builder.get_mut(7) {
            class.level = 1;
        }
        assert_eq!(builder.build().severity(7), Severity::Error);
    }

    #[test]
    fn test_class_yaml() {
        let yaml = r#"
id: 30320
item: 3032
level: 1
tags: ["fix:chair", highway, tag]
title: Watch multiple tags
"#;
        let class: RuleClass = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(class.id, 30320);
        assert_eq!(class.tags.len(), 3);
        assert!(class.trap.is_none());
    }
}
