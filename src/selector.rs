//! Selectors: ordered alternatives of AND-ed predicates
//!
//! Text form, compiled once per rule:
//!
//! ```text
//! way[highway][fee][!amenity][!leisure]
//! *[amenity=recycling][recycling_type!=centre][outside("CZ")]
//! way[tunnel][highway=~/^primary/][tunnel!=no], way[covered][highway=~/^primary/][covered!=no]
//! ```
//!
//! A predicate's capture slot is its position within its alternative.

use crate::capture::Captures;
use crate::error::CompileError;
use crate::feature::{FeatureKind, KindSet, TagMap};
use crate::predicate::Predicate;
use crate::region::RegionScope;
use regex::Regex;
use std::fmt;

/// One alternative: all predicates must hold
#[derive(Debug, Clone)]
pub struct Clause {
    kinds: KindSet,
    predicates: Vec<Predicate>,
    /// Keys positive predicates need, checked before evaluating anything
    required: Vec<String>,
}

impl Clause {
    pub fn new(kinds: KindSet, predicates: Vec<Predicate>) -> Self {
        let mut required: Vec<String> = Vec::new();
        for key in predicates.iter().filter_map(Predicate::required_key) {
            if !required.iter().any(|k| k == key) {
                required.push(key.to_string());
            }
        }
        Self {
            kinds,
            predicates,
            required,
        }
    }

    pub fn kinds(&self) -> KindSet {
        self.kinds
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Whether a successful attempt always fills `slot`
    pub fn guarantees(&self, slot: usize) -> bool {
        self.predicates
            .get(slot)
            .is_some_and(Predicate::guarantees_capture)
    }

    /// Evaluate left to right, stopping at the first false predicate
    pub fn attempt<'t>(
        &self,
        kind: FeatureKind,
        tags: &'t TagMap,
        region: &dyn RegionScope,
    ) -> Option<Captures<'t>> {
        if !self.kinds.contains(kind) {
            return None;
        }
        if !self.required.iter().all(|key| tags.contains_key(key.as_str())) {
            return None;
        }

        let mut captures = Captures::with_slots(self.predicates.len());
        for (slot, predicate) in self.predicates.iter().enumerate() {
            if !predicate.evaluate(slot, tags, &mut captures, region) {
                return None;
            }
        }
        Some(captures)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kinds.iter().collect::<Vec<_>>().as_slice() {
            [FeatureKind::Point] => write!(f, "node")?,
            [FeatureKind::Line] => write!(f, "way")?,
            [FeatureKind::Relation] => write!(f, "relation")?,
            _ => write!(f, "*")?,
        }
        for predicate in &self.predicates {
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

/// Ordered alternatives; the first that matches wins
#[derive(Debug, Clone)]
pub struct Selector {
    clauses: Vec<Clause>,
    kinds: KindSet,
}

impl Selector {
    pub fn new(clauses: Vec<Clause>) -> Self {
        let kinds = clauses
            .iter()
            .fold(KindSet::empty(), |acc, c| acc.union(c.kinds()));
        Self { clauses, kinds }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Union of the kinds targeted by the alternatives
    pub fn kinds(&self) -> KindSet {
        self.kinds
    }

    /// Captures of the first alternative that matches
    pub fn select<'t>(
        &self,
        kind: FeatureKind,
        tags: &'t TagMap,
        region: &dyn RegionScope,
    ) -> Option<Captures<'t>> {
        self.clauses
            .iter()
            .find_map(|clause| clause.attempt(kind, tags, region))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}

/// Parse selector text
pub fn parse(text: &str) -> Result<Selector, CompileError> {
    let mut parser = Parser { src: text, pos: 0 };
    let mut clauses = Vec::new();

    loop {
        clauses.push(parser.alternative()?);
        parser.skip_ws();
        if parser.at_end() {
            break;
        }
        parser.expect(',')?;
    }

    Ok(Selector::new(clauses))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: impl Into<String>) -> CompileError {
        CompileError::Syntax {
            selector: self.src.to_string(),
            position: self.pos,
            message: message.into(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), CompileError> {
        match self.peek() {
            Some(found) if found == c => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(found) => Err(self.error(format!("expected '{}', found '{}'", c, found))),
            None => Err(self.error(format!("expected '{}', found end of input", c))),
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn alternative(&mut self) -> Result<Clause, CompileError> {
        self.skip_ws();
        let kinds = self.kind()?;

        let mut predicates = Vec::new();
        self.skip_ws();
        while self.peek() == Some('[') {
            let predicate = self.condition(&predicates)?;
            predicates.push(predicate);
            self.skip_ws();
        }

        if predicates.is_empty() && kinds == KindSet::ALL {
            return Err(self.error("expected a kind or a condition"));
        }

        Ok(Clause::new(kinds, predicates))
    }

    fn kind(&mut self) -> Result<KindSet, CompileError> {
        if self.eat("*") {
            return Ok(KindSet::ALL);
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.bump();
        }
        let word = &self.src[start..self.pos];
        if word.is_empty() {
            return Ok(KindSet::ALL);
        }

        match word.parse::<FeatureKind>() {
            Ok(kind) => Ok(KindSet::only(kind)),
            Err(_) => {
                self.pos = start;
                Err(self.error(format!("unknown feature kind '{}'", word)))
            }
        }
    }

    /// Parse one `[...]`. `previous` holds the predicates already in the clause.
    fn condition(&mut self, previous: &[Predicate]) -> Result<Predicate, CompileError> {
        self.expect('[')?;
        self.skip_ws();

        let predicate = if self.eat("inside(") {
            Predicate::inside(&self.region_codes()?)
        } else if self.eat("outside(") {
            Predicate::outside(&self.region_codes()?)
        } else if self.eat("!") {
            self.skip_ws();
            Predicate::absent(&self.key()?)
        } else {
            let key = self.key()?;
            self.skip_ws();
            if self.eat("!=") {
                self.skip_ws();
                Predicate::not_equals(&key, &self.value()?)
            } else if self.eat("=~") {
                self.skip_ws();
                Predicate::matches(&key, self.regex()?)
            } else if self.eat("=") {
                self.skip_ws();
                if self.peek() == Some('{') {
                    let slot = self.capture_reference(previous)?;
                    Predicate::equals_capture(&key, slot)
                } else {
                    Predicate::equals(&key, &self.value()?)
                }
            } else {
                Predicate::exists(&key)
            }
        };

        self.skip_ws();
        self.expect(']')?;
        Ok(predicate)
    }

    fn region_codes(&mut self) -> Result<String, CompileError> {
        self.skip_ws();
        let codes = self.quoted()?;
        self.skip_ws();
        self.expect(')')?;
        Ok(codes)
    }

    fn key(&mut self) -> Result<String, CompileError> {
        self.token(|c| matches!(c, '=' | '!' | ']' | '~') || c.is_whitespace(), "key")
    }

    fn value(&mut self) -> Result<String, CompileError> {
        self.token(|c| c == ']' || c.is_whitespace(), "value")
    }

    fn token(&mut self, stop: impl Fn(char) -> bool, what: &str) -> Result<String, CompileError> {
        if self.peek() == Some('"') {
            return self.quoted();
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| !stop(c)) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error(format!("expected {}", what)));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn quoted(&mut self) -> Result<String, CompileError> {
        self.expect('"')?;
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => out.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn regex(&mut self) -> Result<Regex, CompileError> {
        self.expect('/')?;
        let mut pattern = String::new();
        loop {
            match self.bump() {
                Some('/') => break,
                Some('\\') => match self.bump() {
                    Some('/') => pattern.push('/'),
                    Some(c) => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    None => return Err(self.error("unterminated regex")),
                },
                Some(c) => pattern.push(c),
                None => return Err(self.error("unterminated regex")),
            }
        }
        if self.eat("i") {
            pattern.insert_str(0, "(?i)");
        }

        Regex::new(&pattern).map_err(|source| CompileError::InvalidRegex { pattern, source })
    }

    /// `{N.value}` naming an earlier predicate that always captures
    fn capture_reference(&mut self, previous: &[Predicate]) -> Result<usize, CompileError> {
        let start = self.pos;
        self.expect('{')?;
        let end = self
            .rest()
            .find('}')
            .ok_or_else(|| self.error("unclosed capture reference"))?;
        let reference = &self.rest()[..end];

        let slot = reference
            .strip_suffix(".value")
            .and_then(|n| n.trim().parse::<usize>().ok())
            .ok_or_else(|| self.error(format!("expected '{{N.value}}', found '{{{}}}'", reference)))?;

        if !previous.get(slot).is_some_and(Predicate::guarantees_capture) {
            self.pos = start;
            return Err(self.error(format!("slot {} is not captured before this condition", slot)));
        }

        self.pos += end + 1;
        Ok(slot)
    }
}
