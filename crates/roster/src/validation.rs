//! Request validation.
//!
//! Inputs are checked against [`Rules`], small rule lists written in the familiar
//! `required|max:255` notation. Every failing field is collected into one
//! [`ValidationErrors`] value so a caller sees all problems at once.
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::publish;

/// Failed fields and their messages, keyed by request field name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding a single message.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    /// Returns `true` if no field failed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of failed fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if `field` failed.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Messages recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Iterate over failed fields in name order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Vec<String>> {
        self.fields.iter()
    }

    /// Move every message of `other` into `self`.
    pub fn merge(&mut self, other: Self) {
        for (field, messages) in other.fields {
            self.fields.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        write!(f, "{} field(s) failed: {}", names.len(), names.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = (&'a String, &'a Vec<String>);
    type IntoIter = btree_map::Iter<'a, String, Vec<String>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One constraint on an optional string input.
///
/// Apart from [`Rule::Required`], rules only look at present values.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rule {
    /// The value must be present and not blank.
    Required,
    /// At most this many characters.
    Max(usize),
    /// A date or date-time accepted by [`publish::parse_timestamp`].
    Date,
    /// One of the listed values, compared exactly.
    In(Vec<String>),
}

impl Rule {
    /// Check `value`, returning the failure message if the rule does not hold.
    pub fn check(&self, field: &str, value: Option<&str>) -> Option<String> {
        let label = label(field);
        match (self, value) {
            (Self::Required, None) => Some(format!("The {label} field is required.")),
            (Self::Required, Some(value)) if value.trim().is_empty() => {
                Some(format!("The {label} field is required."))
            }
            (Self::Max(max), Some(value)) if value.chars().count() > *max => Some(format!(
                "The {label} may not be greater than {max} characters."
            )),
            (Self::Date, Some(value)) if publish::parse_timestamp(value).is_none() => {
                Some(format!("The {label} is not a valid date."))
            }
            (Self::In(allowed), Some(value)) if !allowed.iter().any(|a| a == value) => {
                Some(format!("The selected {label} is invalid."))
            }
            _ => None,
        }
    }
}

impl Display for Rule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("required"),
            Self::Max(max) => write!(f, "max:{max}"),
            Self::Date => f.write_str("date"),
            Self::In(allowed) => write!(f, "in:{}", allowed.join(",")),
        }
    }
}

/// Error returned when a rule expression cannot be parsed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RuleParseError {
    /// The rule name is not known.
    #[error("unknown rule `{0}`")]
    Unknown(String),
    /// The rule takes an argument that is missing or malformed.
    #[error("invalid argument `{arg}` for rule `{rule}`")]
    InvalidArgument {
        /// Rule name.
        rule: String,
        /// Raw argument text.
        arg: String,
    },
}

/// An ordered list of [`Rule`]s for one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rules(Vec<Rule>);

impl Rules {
    /// Create an empty rule list, which accepts anything.
    pub fn new() -> Self {
        Self::default()
    }
    /// Add [`Rule::Required`].
    #[must_use]
    pub fn required(self) -> Self {
        self.rule(Rule::Required)
    }
    /// Add [`Rule::Max`].
    #[must_use]
    pub fn max(self, max: usize) -> Self {
        self.rule(Rule::Max(max))
    }
    /// Add [`Rule::Date`].
    #[must_use]
    pub fn date(self) -> Self {
        self.rule(Rule::Date)
    }
    /// Add [`Rule::In`].
    #[must_use]
    pub fn one_of<I, S>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule(Rule::In(allowed.into_iter().map(Into::into).collect()))
    }
    /// Append a rule.
    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.0.push(rule);
        self
    }

    /// Returns `true` if the list contains [`Rule::Required`].
    pub fn is_required(&self) -> bool {
        self.0.contains(&Rule::Required)
    }

    /// The rules in evaluation order.
    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }

    /// Check `value` and record every failure under `field`.
    pub fn validate(&self, field: &str, value: Option<&str>, errors: &mut ValidationErrors) {
        for rule in &self.0 {
            if let Some(message) = rule.check(field, value) {
                errors.add(field, message);
            }
        }
    }
}

impl FromStr for Rules {
    type Err = RuleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rules = Self::new();
        for part in s.split('|').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, arg) = match part.split_once(':') {
                Some((name, arg)) => (name.trim(), Some(arg.trim())),
                None => (part, None),
            };
            let rule = match (name, arg) {
                ("required", None) => Rule::Required,
                // Present for compatibility with rule strings written elsewhere; optional is the default.
                ("nullable" | "string", None) => continue,
                ("date", None) => Rule::Date,
                ("max", Some(arg)) => {
                    Rule::Max(arg.parse().map_err(|_| RuleParseError::InvalidArgument {
                        rule: name.to_owned(),
                        arg: arg.to_owned(),
                    })?)
                }
                ("in", Some(arg)) if !arg.is_empty() => {
                    Rule::In(arg.split(',').map(|v| v.trim().to_owned()).collect())
                }
                ("max" | "in", None) | ("in", Some(_)) => {
                    return Err(RuleParseError::InvalidArgument {
                        rule: name.to_owned(),
                        arg: arg.unwrap_or_default().to_owned(),
                    });
                }
                _ => return Err(RuleParseError::Unknown(part.to_owned())),
            };
            rules.0.push(rule);
        }
        Ok(rules)
    }
}

impl Display for Rules {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("|"))
    }
}

/// Human label for a field name: `publishedAt` and `meta.og_title` become
/// `published at` and `meta og title`.
fn label(field: &str) -> String {
    let mut out = String::with_capacity(field.len() + 4);
    for c in field.chars() {
        match c {
            '_' | '.' | '-' => out.push(' '),
            c if c.is_uppercase() => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.extend(c.to_lowercase());
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_rejects_missing_and_blank() {
        let rules = Rules::new().required();
        let mut errors = ValidationErrors::new();
        rules.validate("name", None, &mut errors);
        rules.validate("slug", Some("   "), &mut errors);
        rules.validate("description", Some("x"), &mut errors);
        assert_eq!(errors.get("name").unwrap(), ["The name field is required."]);
        assert!(errors.contains("slug"));
        assert!(!errors.contains("description"));
    }

    #[test]
    fn test_optional_rules_skip_missing_values() {
        let rules = Rules::new().max(3).date();
        let mut errors = ValidationErrors::new();
        rules.validate("publishedAt", None, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_max_counts_characters() {
        let rules = Rules::new().max(4);
        let mut errors = ValidationErrors::new();
        rules.validate("name", Some("ÅÄÖÜ"), &mut errors);
        assert!(errors.is_empty());
        rules.validate("name", Some("abcde"), &mut errors);
        assert_eq!(
            errors.get("name").unwrap(),
            ["The name may not be greater than 4 characters."]
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(label("publishedAt"), "published at");
        assert_eq!(label("meta.og_title"), "meta og title");
        assert_eq!(label("imageId"), "image id");
    }

    #[test]
    fn test_parse_rules() {
        let rules: Rules = "nullable|string|max:255".parse().unwrap();
        assert_eq!(rules.as_slice(), [Rule::Max(255)]);
        let rules: Rules = "required|in:up,down".parse().unwrap();
        assert!(rules.is_required());
        assert_eq!(rules.to_string(), "required|in:up,down");

        assert_eq!(
            "max:lots".parse::<Rules>(),
            Err(RuleParseError::InvalidArgument {
                rule: "max".into(),
                arg: "lots".into()
            })
        );
        assert_eq!(
            "unique:staff".parse::<Rules>(),
            Err(RuleParseError::Unknown("unique:staff".into()))
        );
    }

    #[test]
    fn test_in_rule() {
        let rules = Rules::new().required().one_of(["up", "down"]);
        let mut errors = ValidationErrors::new();
        rules.validate("direction", Some("sideways"), &mut errors);
        assert_eq!(
            errors.get("direction").unwrap(),
            ["The selected direction is invalid."]
        );
    }

    #[test]
    fn test_merge_and_serialize() {
        let mut errors = ValidationErrors::single("name", "bad");
        errors.merge(ValidationErrors::single("name", "worse"));
        errors.merge(ValidationErrors::single("slug", "taken"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "2 field(s) failed: name, slug");
        assert!(errors.clone().into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }
}
