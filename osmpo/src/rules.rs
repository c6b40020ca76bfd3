//! Rules deciding which tags of a record are translatable.
//!
//! A rule set is an ordered list loaded once from YAML:
//!
//! ```yaml
//! - type: way
//!   match:
//!     has_tag: highway
//!   tags: [name]
//! - type: any
//!   match:
//!     or:
//!       - has_tag: shop
//!       - tag_equals: { key: amenity, value: cafe }
//!   tags: name
//! ```
//!
//! Conditions are a closed set of [`Predicate`] variants evaluated over the
//! record alone, so loading a rule file never runs external code.

use std::{fs, path::Path};

use serde::{Deserialize, Deserializer};

use crate::{
    error::Error,
    types::{Record, RecordKind},
};

/// Which record kinds a rule looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppliesTo {
    #[default]
    Any,
    Node,
    Way,
    Relation,
}

impl AppliesTo {
    pub fn accepts(self, kind: RecordKind) -> bool {
        match self {
            AppliesTo::Any => true,
            AppliesTo::Node => kind == RecordKind::Node,
            AppliesTo::Way => kind == RecordKind::Way,
            AppliesTo::Relation => kind == RecordKind::Relation,
        }
    }
}

/// A boolean condition over one record's kind and tags.
///
/// Evaluation is total: a tag the record does not carry is simply absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    HasTag(String),
    TagEquals { key: String, value: String },
    TypeIs(RecordKind),
    /// True when every operand is true (and for no operands).
    And(Vec<Predicate>),
    /// True when any operand is true (false for no operands).
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn has_tag(key: impl Into<String>) -> Self {
        Predicate::HasTag(key.into())
    }

    pub fn tag_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::TagEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::HasTag(key) => record.has_tag(key),
            Predicate::TagEquals { key, value } => record.tag(key) == Some(value.as_str()),
            Predicate::TypeIs(kind) => record.kind == *kind,
            Predicate::And(operands) => operands.iter().all(|p| p.evaluate(record)),
            Predicate::Or(operands) => operands.iter().any(|p| p.evaluate(record)),
            Predicate::Not(operand) => !operand.evaluate(record),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Predicate::HasTag(key) | Predicate::TagEquals { key, .. } if key.is_empty() => {
                Err("predicate refers to an empty tag key".to_string())
            }
            Predicate::HasTag(_) | Predicate::TagEquals { .. } | Predicate::TypeIs(_) => Ok(()),
            Predicate::And(operands) | Predicate::Or(operands) => {
                operands.iter().try_for_each(Predicate::validate)
            }
            Predicate::Not(operand) => operand.validate(),
        }
    }
}

/// One configured rule: when a record of the right kind satisfies the
/// predicate, `tags` become translatable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    #[serde(rename = "type", default)]
    pub applies_to: AppliesTo,

    /// `None` matches every record of the accepted kind.
    #[serde(
        rename = "match",
        default,
        with = "serde_yaml::with::singleton_map_recursive"
    )]
    pub predicate: Option<Predicate>,

    #[serde(deserialize_with = "one_or_many")]
    pub tags: Vec<String>,
}

impl Rule {
    pub fn new<I, S>(applies_to: AppliesTo, predicate: Option<Predicate>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule {
            applies_to,
            predicate,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.applies_to.accepts(record.kind)
            && self
                .predicate
                .as_ref()
                .is_none_or(|predicate| predicate.evaluate(record))
    }

    fn validate(&self) -> Result<(), String> {
        if self.tags.is_empty() {
            return Err("no tags listed".to_string());
        }
        if self.tags.iter().any(String::is_empty) {
            return Err("empty tag name".to_string());
        }
        match &self.predicate {
            Some(predicate) => predicate.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(tag) => vec![tag],
        OneOrMany::Many(tags) => tags,
    })
}

/// An ordered, validated, read-only list of rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Validates `rules`, failing on the first unusable one.
    pub fn new(rules: Vec<Rule>) -> Result<Self, Error> {
        for (index, rule) in rules.iter().enumerate() {
            rule.validate()
                .map_err(|message| Error::invalid_rule(format!("rule #{}: {}", index + 1, message)))?;
        }
        Ok(RuleSet { rules })
    }

    pub fn from_yaml(source: &str) -> Result<Self, Error> {
        let rules: Vec<Rule> = serde_yaml::from_str(source)?;
        Self::new(rules)
    }

    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let source = fs::read_to_string(path)?;
        Self::from_yaml(&source)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the translatable tag keys for `record`, in rule order.
    ///
    /// A key named by several matching rules is listed once, at its first
    /// position. Keys are returned whether or not the record carries them.
    pub fn match_record(&self, record: &Record) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for rule in self.rules.iter().filter(|rule| rule.matches(record)) {
            for tag in &rule.tags {
                if !keys.contains(tag) {
                    keys.push(tag.clone());
                }
            }
        }
        keys
    }
}
