//! Feature references, tag maps and feature input files

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Tags of a single feature (unique keys)
pub type TagMap = BTreeMap<String, String>;

/// Feature kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// A point (OSM node)
    #[serde(alias = "node")]
    Point,
    /// A line (OSM way)
    #[serde(alias = "way")]
    Line,
    /// A relation between other features
    Relation,
}

impl FeatureKind {
    /// All kinds, in evaluation order
    pub const ALL: [FeatureKind; 3] = [FeatureKind::Point, FeatureKind::Line, FeatureKind::Relation];

    fn bit(self) -> u8 {
        match self {
            FeatureKind::Point => 0b001,
            FeatureKind::Line => 0b010,
            FeatureKind::Relation => 0b100,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Point => write!(f, "point"),
            FeatureKind::Line => write!(f, "line"),
            FeatureKind::Relation => write!(f, "relation"),
        }
    }
}

impl std::str::FromStr for FeatureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "point" | "node" | "n" => Ok(FeatureKind::Point),
            "line" | "way" | "w" => Ok(FeatureKind::Line),
            "relation" | "rel" | "r" => Ok(FeatureKind::Relation),
            _ => Err(format!("Unknown feature kind: {}", s)),
        }
    }
}

/// A set of feature kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KindSet(u8);

impl KindSet {
    /// Every kind
    pub const ALL: KindSet = KindSet(0b111);

    /// The empty set
    pub const fn empty() -> Self {
        KindSet(0)
    }

    /// A set holding a single kind
    pub fn only(kind: FeatureKind) -> Self {
        KindSet(kind.bit())
    }

    pub fn insert(&mut self, kind: FeatureKind) {
        self.0 |= kind.bit();
    }

    pub fn union(self, other: KindSet) -> Self {
        KindSet(self.0 | other.0)
    }

    pub fn contains(self, kind: FeatureKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the kinds in the set
    pub fn iter(self) -> impl Iterator<Item = FeatureKind> {
        FeatureKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl fmt::Display for KindSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == KindSet::ALL {
            return write!(f, "*");
        }
        let names: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        write!(f, "{}", names.join("|"))
    }
}

/// Relation member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// Kind of the referenced feature
    pub kind: FeatureKind,
    /// Id of the referenced feature
    pub id: i64,
    /// Role inside the relation
    #[serde(default)]
    pub role: String,
}

impl Member {
    pub fn new(kind: FeatureKind, id: i64, role: &str) -> Self {
        Self {
            kind,
            id,
            role: role.to_string(),
        }
    }
}

/// Reference to the feature an issue is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeatureRef {
    #[serde(alias = "node")]
    Point { id: i64 },
    #[serde(alias = "way")]
    Line {
        id: i64,
        /// Ordered member points
        #[serde(default)]
        nodes: Vec<i64>,
    },
    Relation {
        id: i64,
        /// Ordered members
        #[serde(default)]
        members: Vec<Member>,
    },
}

impl FeatureRef {
    pub fn point(id: i64) -> Self {
        FeatureRef::Point { id }
    }

    pub fn line(id: i64, nodes: Vec<i64>) -> Self {
        FeatureRef::Line { id, nodes }
    }

    pub fn relation(id: i64, members: Vec<Member>) -> Self {
        FeatureRef::Relation { id, members }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureRef::Point { .. } => FeatureKind::Point,
            FeatureRef::Line { .. } => FeatureKind::Line,
            FeatureRef::Relation { .. } => FeatureKind::Relation,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            FeatureRef::Point { id } | FeatureRef::Line { id, .. } | FeatureRef::Relation { id, .. } => {
                *id
            }
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// A feature together with its tags, as read from input files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(flatten)]
    pub reference: FeatureRef,
    #[serde(default)]
    pub tags: TagMap,
}

impl Feature {
    pub fn new(reference: FeatureRef, tags: TagMap) -> Self {
        Self { reference, tags }
    }

    /// Add a tag (builder style)
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn kind(&self) -> FeatureKind {
        self.reference.kind()
    }
}

/// Error loading features from a file
#[derive(Debug, Error)]
pub enum FeatureLoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error at line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unknown feature file format: {0}")]
    UnknownFormat(String),
}

/// Load features from a JSON array, JSON lines or YAML list file
pub fn load_features(path: &Path) -> Result<Vec<Feature>, FeatureLoadError> {
    let content = std::fs::read_to_string(path)?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        "yaml" | "yml" => Ok(serde_yaml::from_str(&content)?),
        "json" if content.trim_start().starts_with('[') => serde_json::from_str(&content)
            .map_err(|source| FeatureLoadError::Json { line: source.line(), source }),
        "json" | "jsonl" | "ndjson" | "geojsonl" => parse_json_lines(&content),
        _ => Err(FeatureLoadError::UnknownFormat(ext.to_string())),
    }
}

/// Parse one feature per non-empty line
pub fn parse_json_lines(content: &str) -> Result<Vec<Feature>, FeatureLoadError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| FeatureLoadError::Json { line: i + 1, source })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("node".parse::<FeatureKind>(), Ok(FeatureKind::Point));
        assert_eq!("way".parse::<FeatureKind>(), Ok(FeatureKind::Line));
        assert_eq!("relation".parse::<FeatureKind>(), Ok(FeatureKind::Relation));
        assert!("area".parse::<FeatureKind>().is_err());
    }

    #[test]
    fn test_kind_set() {
        let mut set = KindSet::empty();
        assert!(set.is_empty());

        set.insert(FeatureKind::Line);
        assert!(set.contains(FeatureKind::Line));
        assert!(!set.contains(FeatureKind::Point));

        let all = set
            .union(KindSet::only(FeatureKind::Point))
            .union(KindSet::only(FeatureKind::Relation));
        assert_eq!(all, KindSet::ALL);
        assert_eq!(all.to_string(), "*");
        assert_eq!(set.to_string(), "line");
    }

    #[test]
    fn test_feature_ref_accessors() {
        let line = FeatureRef::line(7, vec![1, 2, 3]);
        assert_eq!(line.kind(), FeatureKind::Line);
        assert_eq!(line.id(), 7);
        assert_eq!(line.to_string(), "line 7");
    }

    #[test]
    fn test_feature_deserialize_json() {
        let json = r#"{"type": "way", "id": 42, "nodes": [1, 2], "tags": {"highway": "primary"}}"#;
        let feature: Feature = serde_json::from_str(json).unwrap();

        assert_eq!(feature.reference, FeatureRef::line(42, vec![1, 2]));
        assert_eq!(feature.tags.get("highway").map(String::as_str), Some("primary"));
    }

    #[test]
    fn test_feature_deserialize_relation_yaml() {
        let yaml = r#"
type: relation
id: 5
members:
  - kind: way
    id: 10
    role: outer
"#;
        let feature: Feature = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            feature.reference,
            FeatureRef::relation(5, vec![Member::new(FeatureKind::Line, 10, "outer")])
        );
        assert!(feature.tags.is_empty());
    }

    #[test]
    fn test_parse_json_lines_reports_line() {
        let content = "{\"type\": \"node\", \"id\": 1}\n\nnot json\n";
        match parse_json_lines(content) {
            Err(FeatureLoadError::Json { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_features_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("features.csv");
        std::fs::write(&path, "id,type").unwrap();

        assert!(matches!(
            load_features(&path),
            Err(FeatureLoadError::UnknownFormat(ext)) if ext == "csv"
        ));
    }
}
