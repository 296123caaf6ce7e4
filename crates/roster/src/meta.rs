//! Free-form key/value metadata.
//!
//! The metadata shape is not part of the staff member record. Which keys are
//! checked, and how, comes from an injected [`MetaRules`].
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::model::StaffMemberId;
use crate::validation::{RuleParseError, Rules, ValidationErrors};

/// Metadata entries of one owner.
pub type MetaBag = BTreeMap<String, String>;

/// Requested metadata changes. `None` removes the key.
pub type MetaChanges = BTreeMap<String, Option<String>>;

/// Longest accepted metadata key.
pub const MAX_KEY_LEN: usize = 255;

/// Metadata entries of all owners.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaTable {
    entries: BTreeMap<StaffMemberId, MetaBag>,
}

impl MetaTable {
    /// Merge `changes` into the entries of `owner`.
    ///
    /// Keys with a value are set or overwritten, keys mapped to `None` are
    /// removed, keys not mentioned are left alone.
    pub fn save_meta(&mut self, owner: StaffMemberId, changes: &MetaChanges) {
        let bag = self.entries.entry(owner).or_default();
        for (key, value) in changes {
            match value {
                Some(value) => {
                    bag.insert(key.clone(), value.clone());
                }
                None => {
                    bag.remove(key);
                }
            }
        }
        if bag.is_empty() {
            self.entries.remove(&owner);
        }
    }

    /// Entries of `owner`, empty if it has none.
    pub fn get(&self, owner: StaffMemberId) -> MetaBag {
        self.entries.get(&owner).cloned().unwrap_or_default()
    }

    /// Drop every entry of `owner`.
    pub fn release(&mut self, owner: StaffMemberId) -> Option<MetaBag> {
        self.entries.remove(&owner)
    }
}

/// Validation rules for metadata keys.
pub trait MetaRules: Send + Sync + 'static {
    /// Rules per metadata key. Keys without rules accept any value.
    fn rules(&self) -> &BTreeMap<String, Rules>;
}

/// A fixed set of metadata rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetaRuleSet {
    rules: BTreeMap<String, Rules>,
}

impl MetaRuleSet {
    /// A rule set that accepts any metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search engine fields edited alongside every page-like record.
    pub fn seo() -> Self {
        Self::new()
            .with_rule("title", Rules::new().max(255))
            .with_rule("description", Rules::new().max(500))
            .with_rule("keywords", Rules::new().max(255))
    }

    /// Set the rules for `key`.
    #[must_use]
    pub fn with_rule(mut self, key: impl Into<String>, rules: Rules) -> Self {
        self.rules.insert(key.into(), rules);
        self
    }

    /// Parse a `key=rules` definition such as `title=required|max:120` and add it.
    pub fn push_definition(&mut self, definition: &str) -> Result<(), RuleParseError> {
        let (key, rules) = definition
            .split_once('=')
            .ok_or_else(|| RuleParseError::Unknown(definition.to_owned()))?;
        self.rules.insert(key.trim().to_owned(), Rules::from_str(rules)?);
        Ok(())
    }
}

impl MetaRules for MetaRuleSet {
    fn rules(&self) -> &BTreeMap<String, Rules> {
        &self.rules
    }
}

/// Check metadata changes, recording failures under `meta.<key>`.
pub fn validate_meta(rules: &dyn MetaRules, changes: &MetaChanges, errors: &mut ValidationErrors) {
    for (key, rules) in rules.rules() {
        let value = changes.get(key).and_then(Option::as_deref);
        rules.validate(&format!("meta.{key}"), value, errors);
    }
    for key in changes.keys() {
        let len = key.chars().count();
        if key.trim().is_empty() || len > MAX_KEY_LEN {
            errors.add(
                "meta",
                format!("Metadata keys must be between 1 and {MAX_KEY_LEN} characters."),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn changes(pairs: &[(&str, Option<&str>)]) -> MetaChanges {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.map(ToOwned::to_owned)))
            .collect()
    }

    #[test]
    fn test_save_meta_merges() {
        let owner = StaffMemberId::new(1);
        let mut table = MetaTable::default();
        table.save_meta(owner, &changes(&[("title", Some("Jane")), ("role", Some("Chair"))]));
        table.save_meta(owner, &changes(&[("title", Some("Dr Jane")), ("role", None)]));

        let bag = table.get(owner);
        assert_eq!(bag.get("title").map(String::as_str), Some("Dr Jane"));
        assert!(!bag.contains_key("role"));

        table.save_meta(owner, &changes(&[("title", None)]));
        assert!(table.release(owner).is_none());
    }

    #[test]
    fn test_seo_rules() {
        let rules = MetaRuleSet::seo();
        let long = "x".repeat(256);
        let mut errors = ValidationErrors::new();
        validate_meta(
            &rules,
            &changes(&[("title", Some(long.as_str())), ("colour", Some("teal"))]),
            &mut errors,
        );
        assert!(errors.contains("meta.title"));
        assert!(!errors.contains("meta.colour"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_blank_key_rejected() {
        let mut errors = ValidationErrors::new();
        validate_meta(&MetaRuleSet::new(), &changes(&[(" ", Some("x"))]), &mut errors);
        assert!(errors.contains("meta"));
    }

    #[test]
    fn test_push_definition() {
        let mut rules = MetaRuleSet::new();
        rules.push_definition("subtitle=required|max:20").unwrap();
        assert!(rules.rules()["subtitle"].is_required());
        assert!(rules.push_definition("no-equals-sign").is_err());
        assert!(rules.push_definition("x=bogus").is_err());

        let mut errors = ValidationErrors::new();
        validate_meta(&rules, &MetaChanges::new(), &mut errors);
        assert_eq!(
            errors.get("meta.subtitle").unwrap(),
            ["The meta subtitle field is required."]
        );
    }
}
