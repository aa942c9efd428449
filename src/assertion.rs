//! Per-rule match / no-match assertions
//!
//! Assertions use a one-line feature notation:
//!
//! ```text
//! node amenity=recycling recycling_type=container name="My nice awesome container"
//! ```

use crate::class::ClassId;
use crate::feature::{Feature, FeatureKind, FeatureRef, TagMap};
use crate::region::CountryScope;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error parsing the one-line feature notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureParseError {
    #[error("empty feature text")]
    Empty,

    #[error("unknown feature kind '{0}'")]
    UnknownKind(String),

    #[error("expected key=value, found '{0}'")]
    BadTag(String),

    #[error("unterminated quote")]
    UnterminatedQuote,
}

/// Parse `kind key=value ...` into a feature with id 0
pub fn parse_feature(text: &str) -> Result<Feature, FeatureParseError> {
    let mut words = split_words(text)?.into_iter();

    let kind_word = words.next().ok_or(FeatureParseError::Empty)?;
    let kind: FeatureKind = kind_word
        .parse()
        .map_err(|_| FeatureParseError::UnknownKind(kind_word.clone()))?;

    let mut tags = TagMap::new();
    for word in words {
        let (key, value) = word
            .split_once('=')
            .filter(|(k, _)| !k.is_empty())
            .ok_or_else(|| FeatureParseError::BadTag(word.clone()))?;
        tags.insert(key.to_string(), value.to_string());
    }

    let reference = match kind {
        FeatureKind::Point => FeatureRef::point(0),
        FeatureKind::Line => FeatureRef::line(0, Vec::new()),
        FeatureKind::Relation => FeatureRef::relation(0, Vec::new()),
    };
    Ok(Feature::new(reference, tags))
}

/// Split on whitespace; double quotes group words and are dropped
fn split_words(text: &str) -> Result<Vec<String>, FeatureParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => current.push(chars.next().ok_or(FeatureParseError::UnterminatedQuote)?),
                        Some(c) => current.push(c),
                        None => return Err(FeatureParseError::UnterminatedQuote),
                    }
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Expected outcome of one rule on one feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleAssertion {
    /// Feature text as written
    pub text: String,
    pub feature: Feature,
    /// Country context the feature is checked in
    pub country: Option<String>,
    pub expect_match: bool,
}

impl RuleAssertion {
    pub fn new(
        text: &str,
        country: Option<&str>,
        expect_match: bool,
    ) -> Result<Self, FeatureParseError> {
        Ok(Self {
            text: text.to_string(),
            feature: parse_feature(text)?,
            country: country.map(str::to_string),
            expect_match,
        })
    }

    pub fn scope(&self) -> CountryScope {
        CountryScope::new(self.country.as_deref())
    }
}

/// A failed assertion reported by the self check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionFailure {
    pub rule: String,
    pub class: ClassId,
    pub feature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Whether a match was expected
    pub expected: bool,
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expectation = if self.expected { "match" } else { "no match" };
        write!(
            f,
            "rule '{}' (class {}): expected {} on `{}`",
            self.rule, self.class, expectation, self.feature
        )?;
        if let Some(country) = &self.country {
            write!(f, " in {}", country)?;
        }
        Ok(())
    }
}
