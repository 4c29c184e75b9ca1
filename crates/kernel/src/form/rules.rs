//! Field rule table.
//!
//! The rule table is declared once in a TOML schema and compiled at startup.
//! The same table is exported as JSON for the browser-side validator, so the
//! client and server never carry separately maintained copies of a pattern.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

/// Embedded schema for the registration form.
const REGISTRATION_SCHEMA: &str = include_str!("../../rules/registration.toml");

/// Errors raised while loading a rule schema.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to parse rule schema: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("field `{field}` has an invalid pattern: {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    #[error("field `{0}` pattern must be anchored with ^ and $")]
    UnanchoredPattern(String),

    #[error("field `{0}` declares neither a pattern nor options")]
    NoMatcher(String),

    #[error("field `{0}` declares both a pattern and options")]
    AmbiguousMatcher(String),

    #[error("field `{0}` has an empty option list")]
    EmptyOptions(String),
}

/// How a field is rendered in the form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Text,
    Email,
    Select,
}

/// Predicate a non-empty value must satisfy.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Anchored regular expression.
    Pattern(Regex),
    /// Exact membership in an enumerated set.
    OneOf(Vec<String>),
}

impl Matcher {
    /// Test a value against this matcher.
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Matcher::Pattern(re) => re.is_match(value),
            Matcher::OneOf(options) => options.iter().any(|o| o == value),
        }
    }
}

/// A single field's validation rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub label: String,
    pub required: bool,
    pub matcher: Matcher,
    pub message: String,
    pub input: InputKind,
    pub placeholder: Option<String>,
    pub autocomplete: Option<String>,
    pub max_length: Option<u32>,
}

impl FieldRule {
    /// Message reported when a required field is left empty.
    pub fn required_message(&self) -> String {
        format!("{} is required", self.label)
    }

    /// Allowed values for enumerated fields.
    pub fn options(&self) -> &[String] {
        match &self.matcher {
            Matcher::OneOf(options) => options,
            Matcher::Pattern(_) => &[],
        }
    }
}

/// Schema as written in TOML.
#[derive(Debug, Deserialize)]
struct RuleSchema {
    #[serde(rename = "field", default)]
    fields: Vec<RuleDefinition>,
}

#[derive(Debug, Deserialize)]
struct RuleDefinition {
    name: String,
    label: String,
    #[serde(default = "default_required")]
    required: bool,
    pattern: Option<String>,
    options: Option<Vec<String>>,
    message: String,
    #[serde(default)]
    input: InputKind,
    placeholder: Option<String>,
    autocomplete: Option<String>,
    max_length: Option<u32>,
}

fn default_required() -> bool {
    true
}

impl RuleDefinition {
    fn compile(self) -> Result<FieldRule, RuleError> {
        let matcher = match (self.pattern, self.options) {
            (Some(_), Some(_)) => return Err(RuleError::AmbiguousMatcher(self.name)),
            (None, None) => return Err(RuleError::NoMatcher(self.name)),
            (Some(pattern), None) => {
                if !pattern.starts_with('^') || !pattern.ends_with('$') {
                    return Err(RuleError::UnanchoredPattern(self.name));
                }
                let re = Regex::new(&pattern).map_err(|source| RuleError::InvalidPattern {
                    field: self.name.clone(),
                    source,
                })?;
                Matcher::Pattern(re)
            }
            (None, Some(options)) => {
                if options.is_empty() {
                    return Err(RuleError::EmptyOptions(self.name));
                }
                Matcher::OneOf(options)
            }
        };

        Ok(FieldRule {
            name: self.name,
            label: self.label,
            required: self.required,
            matcher,
            message: self.message,
            input: self.input,
            placeholder: self.placeholder,
            autocomplete: self.autocomplete,
            max_length: self.max_length,
        })
    }
}

/// Ordered, immutable set of field rules.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<FieldRule>,
}

impl RuleTable {
    /// Load the built-in registration form rules.
    pub fn registration() -> Result<Self, RuleError> {
        Self::from_toml(REGISTRATION_SCHEMA)
    }

    /// Parse and compile a rule schema.
    pub fn from_toml(source: &str) -> Result<Self, RuleError> {
        let schema: RuleSchema = toml::from_str(source)?;

        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(schema.fields.len());
        for definition in schema.fields {
            if !seen.insert(definition.name.clone()) {
                return Err(RuleError::DuplicateField(definition.name));
            }
            rules.push(definition.compile()?);
        }

        Ok(Self { rules })
    }

    /// Look up a rule by field name.
    pub fn get(&self, name: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    /// Iterate rules in table order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Export the table for the browser-side validator.
    ///
    /// Patterns are exported as their source text; the client builds a
    /// `RegExp` from each one.
    pub fn client_schema(&self) -> Value {
        let fields: Vec<Value> = self
            .rules
            .iter()
            .map(|rule| {
                let mut field = json!({
                    "name": rule.name,
                    "label": rule.label,
                    "required": rule.required,
                    "message": rule.message,
                    "requiredMessage": rule.required_message(),
                });
                match &rule.matcher {
                    Matcher::Pattern(re) => field["pattern"] = Value::String(re.as_str().to_string()),
                    Matcher::OneOf(options) => field["options"] = json!(options),
                }
                field
            })
            .collect();

        json!({ "fields": fields })
    }
}
