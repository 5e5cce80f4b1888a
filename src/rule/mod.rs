//! Categorization rules: a rule files transactions whose description contains its pattern under
//! a category.

mod categorize;
mod core;
mod endpoints;

pub use categorize::{apply_rules_to_uncategorized, categorize_new_transactions};
pub use core::{
    Rule, RuleData, RuleId, create_rule, create_rule_table, delete_rule, get_rule, list_rules,
    update_rule,
};
pub use endpoints::{
    apply_rules_endpoint, create_rule_endpoint, delete_rule_endpoint, get_rule_endpoint,
    list_rules_endpoint, update_rule_endpoint,
};
