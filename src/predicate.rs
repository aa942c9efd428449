//! Leaf conditions evaluated against a feature's tags

use crate::capture::Captures;
use crate::feature::TagMap;
use crate::region::RegionScope;
use regex::Regex;
use std::fmt;

/// Direction of a region condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Inside,
    Outside,
}

/// A single boolean condition on a tag map
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Key present with a non-empty value
    Exists { key: String },
    /// Key missing or empty
    Absent { key: String },
    /// Key present with exactly this value
    Equals { key: String, value: String },
    /// Key missing, or present with another value
    NotEquals { key: String, value: String },
    /// Key present and value matched by the pattern (unanchored)
    Matches { key: String, pattern: Regex },
    /// Key present with the value captured in an earlier slot
    EqualsCapture { key: String, slot: usize },
    /// Feature inside / outside a set of countries
    Region { scope: Scope, countries: String },
}

impl Predicate {
    pub fn exists(key: &str) -> Self {
        Predicate::Exists { key: key.to_string() }
    }

    pub fn absent(key: &str) -> Self {
        Predicate::Absent { key: key.to_string() }
    }

    pub fn equals(key: &str, value: &str) -> Self {
        Predicate::Equals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn not_equals(key: &str, value: &str) -> Self {
        Predicate::NotEquals {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    pub fn matches(key: &str, pattern: Regex) -> Self {
        Predicate::Matches {
            key: key.to_string(),
            pattern,
        }
    }

    pub fn equals_capture(key: &str, slot: usize) -> Self {
        Predicate::EqualsCapture {
            key: key.to_string(),
            slot,
        }
    }

    pub fn inside(countries: &str) -> Self {
        Predicate::Region {
            scope: Scope::Inside,
            countries: countries.to_string(),
        }
    }

    pub fn outside(countries: &str) -> Self {
        Predicate::Region {
            scope: Scope::Outside,
            countries: countries.to_string(),
        }
    }

    /// Tag key the predicate looks at, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Predicate::Exists { key }
            | Predicate::Absent { key }
            | Predicate::Equals { key, .. }
            | Predicate::NotEquals { key, .. }
            | Predicate::Matches { key, .. }
            | Predicate::EqualsCapture { key, .. } => Some(key),
            Predicate::Region { .. } => None,
        }
    }

    /// Key that must be in the tag map for the predicate to hold
    pub fn required_key(&self) -> Option<&str> {
        match self {
            Predicate::Exists { key }
            | Predicate::Equals { key, .. }
            | Predicate::Matches { key, .. }
            | Predicate::EqualsCapture { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Whether a true result always leaves this predicate's slot populated
    pub fn guarantees_capture(&self) -> bool {
        self.required_key().is_some()
    }

    /// Evaluate against `tags`, recording a capture in `slot` where applicable.
    pub fn evaluate<'t>(
        &self,
        slot: usize,
        tags: &'t TagMap,
        captures: &mut Captures<'t>,
        region: &dyn RegionScope,
    ) -> bool {
        match self {
            Predicate::Exists { key } => match non_empty(tags, key) {
                Some((k, v)) => {
                    captures.set(slot, k, v);
                    true
                }
                None => false,
            },
            Predicate::Absent { key } => non_empty(tags, key).is_none(),
            Predicate::Equals { key, value } => match tags.get_key_value(key.as_str()) {
                Some((k, v)) if v == value => {
                    captures.set(slot, k, v);
                    true
                }
                _ => false,
            },
            Predicate::NotEquals { key, value } => match tags.get_key_value(key.as_str()) {
                Some((k, v)) => {
                    captures.set(slot, k, v);
                    v != value
                }
                None => true,
            },
            Predicate::Matches { key, pattern } => match tags.get_key_value(key.as_str()) {
                Some((k, v)) if pattern.is_match(v) => {
                    captures.set(slot, k, v);
                    true
                }
                _ => false,
            },
            Predicate::EqualsCapture { key, slot: source } => {
                let Some(expected) = captures.get(*source).map(|c| c.value) else {
                    return false;
                };
                match tags.get_key_value(key.as_str()) {
                    Some((k, v)) if v == expected => {
                        captures.set(slot, k, v);
                        true
                    }
                    _ => false,
                }
            }
            Predicate::Region { scope, countries } => match scope {
                Scope::Inside => region.is_inside(countries),
                Scope::Outside => region.is_outside(countries),
            },
        }
    }
}

fn non_empty<'t>(tags: &'t TagMap, key: &str) -> Option<(&'t str, &'t str)> {
    tags.get_key_value(key)
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Exists { key } => write!(f, "[{}]", key),
            Predicate::Absent { key } => write!(f, "[!{}]", key),
            Predicate::Equals { key, value } => write!(f, "[{}={}]", key, value),
            Predicate::NotEquals { key, value } => write!(f, "[{}!={}]", key, value),
            Predicate::Matches { key, pattern } => write!(f, "[{}=~/{}/]", key, pattern.as_str()),
            Predicate::EqualsCapture { key, slot } => write!(f, "[{}={{{}.value}}]", key, slot),
            Predicate::Region { scope: Scope::Inside, countries } => {
                write!(f, "[inside(\"{}\")]", countries)
            }
            Predicate::Region { scope: Scope::Outside, countries } => {
                write!(f, "[outside(\"{}\")]", countries)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::CountryScope;

    fn tags(pairs: &[(&str, &str)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn eval(predicate: &Predicate, tags: &TagMap) -> bool {
        let mut captures = Captures::with_slots(2);
        predicate.evaluate(0, tags, &mut captures, &CountryScope::unknown())
    }

    #[test]
    fn test_exists_requires_non_empty_value() {
        let p = Predicate::exists("name");
        assert!(eval(&p, &tags(&[("name", "Main Street")])));
        assert!(!eval(&p, &tags(&[("name", "")])));
        assert!(!eval(&p, &tags(&[])));
    }

    #[test]
    fn test_absent_is_negated_exists() {
        let p = Predicate::absent("highway");
        assert!(eval(&p, &tags(&[])));
        assert!(eval(&p, &tags(&[("highway", "")])));
        assert!(!eval(&p, &tags(&[("highway", "primary")])));
    }

    #[test]
    fn test_equals_captures_tag() {
        let t = tags(&[("building", "roof")]);
        let mut captures = Captures::with_slots(1);
        let p = Predicate::equals("building", "roof");

        assert!(p.evaluate(0, &t, &mut captures, &CountryScope::unknown()));
        let capture = captures.get(0).unwrap();
        assert_eq!((capture.key, capture.value), ("building", "roof"));

        assert!(!eval(&Predicate::equals("building", "Roof"), &t));
    }

    #[test]
    fn test_not_equals_absence() {
        let p = Predicate::not_equals("recycling_type", "centre");
        let empty = tags(&[]);
        let mut captures = Captures::with_slots(1);

        assert!(p.evaluate(0, &empty, &mut captures, &CountryScope::unknown()));
        assert!(!captures.is_set(0));

        assert!(eval(&p, &tags(&[("recycling_type", "container")])));
        assert!(!eval(&p, &tags(&[("recycling_type", "centre")])));
    }

    #[test]
    fn test_regex_is_unanchored() {
        let p = Predicate::matches("highway", Regex::new("link").unwrap());
        assert!(eval(&p, &tags(&[("highway", "primary_link")])));
        assert!(!eval(&p, &tags(&[("highway", "primary")])));
        assert!(!eval(&p, &tags(&[])));
    }

    #[test]
    fn test_equals_capture_reads_earlier_slot() {
        let t = tags(&[("name", "Elm"), ("alt_name", "Elm")]);
        let mut captures = Captures::with_slots(2);
        let region = CountryScope::unknown();

        assert!(Predicate::exists("name").evaluate(0, &t, &mut captures, &region));
        assert!(Predicate::equals_capture("alt_name", 0).evaluate(1, &t, &mut captures, &region));
    }

    #[test]
    fn test_equals_capture_unset_slot_is_false() {
        let t = tags(&[("alt_name", "Elm")]);
        let mut captures = Captures::with_slots(2);

        assert!(!Predicate::equals_capture("alt_name", 0).evaluate(
            1,
            &t,
            &mut captures,
            &CountryScope::unknown()
        ));
    }

    #[test]
    fn test_region() {
        let t = tags(&[]);
        let mut captures = Captures::with_slots(1);
        let cz = CountryScope::new(Some("CZ"));

        assert!(Predicate::inside("CZ").evaluate(0, &t, &mut captures, &cz));
        assert!(!Predicate::outside("CZ").evaluate(0, &t, &mut captures, &cz));
        assert!(Predicate::outside("CZ").evaluate(0, &t, &mut captures, &CountryScope::unknown()));
    }

    #[test]
    fn test_guarantees_capture() {
        assert!(Predicate::exists("a").guarantees_capture());
        assert!(Predicate::equals("a", "b").guarantees_capture());
        assert!(!Predicate::not_equals("a", "b").guarantees_capture());
        assert!(!Predicate::absent("a").guarantees_capture());
        assert!(!Predicate::outside("CZ").guarantees_capture());
    }

    #[test]
    fn test_display() {
        assert_eq!(Predicate::absent("ref").to_string(), "[!ref]");
        assert_eq!(Predicate::not_equals("area", "no").to_string(), "[area!=no]");
        assert_eq!(Predicate::outside("CZ").to_string(), "[outside(\"CZ\")]");
        assert_eq!(Predicate::equals_capture("b", 0).to_string(), "[b={0.value}]");
    }
}
