//! Taglint - Declarative quality rules for map feature tags
//!
//! Evaluates rules against the key/value tags of point, line and relation
//! features and emits issues, optionally carrying a tag diff that fixes them.
//!
//! # Architecture
//!
//! ```text
//! RuleDefinition -> RuleBody (compiled) -> Engine -> Vec<Issue>
//!                       |
//!        Selector (OR of clauses) -> Clause (AND of predicates) -> Captures
//! ```
//!
//! Rules are compiled once at startup. Evaluation is a pure function of the
//! feature and its tags, so features can be checked in parallel with no locking.
//!
//! # Writing Rules
//!
//! Rule files are YAML or JSON:
//!
//! ```yaml
//! classes:
//!   - id: 30320
//!     item: 3032
//!     level: 1
//!     title: "Watch multiple tags"
//!
//! rules:
//!   - class: 30320
//!     subclass: 1000
//!     selector: "way[highway][fee][!amenity][!leisure]"
//!     text: 'Use tag "toll" instead of "fee"'
//!     fix_change_key: ["fee=>toll"]
//!     assert_match: ["way highway=primary fee=yes"]
//! ```

pub mod assertion;
pub mod capture;
pub mod class;
pub mod config;
pub mod engine;
pub mod error;
pub mod feature;
pub mod fix;
pub mod issue;
pub mod output;
pub mod predicate;
pub mod region;
pub mod rule;
pub mod rules;
pub mod selector;
pub mod subclass;
pub mod template;

// Re-export main types
pub use assertion::{AssertionFailure, RuleAssertion};
pub use capture::{Capture, CaptureField, Captures};
pub use class::{ClassId, ClassRegistry, ClassRegistryBuilder, RuleClass, Severity};
pub use config::Config;
pub use engine::{CheckResult, Engine, EngineBuilder};
pub use error::{CompileError, EvalError, SetupError};
pub use feature::{Feature, FeatureKind, FeatureRef, KindSet, Member, TagMap};
pub use fix::{FixDiff, FixTemplate};
pub use issue::Issue;
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use predicate::{Predicate, Scope};
pub use region::{CountryScope, RegionScope};
pub use rule::{RuleBody, RuleDefinition, RuleFile};
pub use selector::{Clause, Selector};
pub use subclass::{stable_hash64, Subclass};
pub use template::MessageTemplate;
