//! Built-in rule sets

pub mod tag_combination;

use crate::class::RuleClass;
use crate::rule::RuleDefinition;

/// Classes of every built-in rule set
pub fn builtin_classes() -> Vec<RuleClass> {
    tag_combination::classes()
}

/// Rules of every built-in rule set, in evaluation order
pub fn builtin_rules() -> Vec<RuleDefinition> {
    tag_combination::rules()
}
