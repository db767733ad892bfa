//! Safety policy document: categories with keyword triggers, a classifier
//! threshold and an action, plus the classifier toggle.
//!
//! Loaded through figment from YAML (`.yaml`/`.yml`) or TOML (`.toml`):
//!
//! ```yaml
//! classifier:
//!   enabled: true
//!   model_name: unitary/unbiased-toxic-roberta
//!   invoke: always          # or on_keyword_hit
//! categories:
//!   harassment:
//!     keywords: [idiot, [stupid, dumb]]
//!     threshold: 0.8
//!     action: filter
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use figment::providers::{Format, Toml, Yaml};
use figment::Figment;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ragguard_core::{Error, Result};

pub const DEFAULT_CLASSIFIER_MODEL: &str = "unitary/unbiased-toxic-roberta";

/// Outcome of a policy check. Ordered by severity: `Allow < Filter < Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Filter,
    Block,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Filter => "filter",
            Self::Block => "block",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "allow" => Ok(Self::Allow),
            "filter" => Ok(Self::Filter),
            "block" => Ok(Self::Block),
            other => Err(Error::InvalidConfig(format!("unknown action '{other}' (expected allow, filter or block)"))),
        }
    }
}

/// When the classifier runs, given that it is enabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeMode {
    /// Score every checked text.
    #[default]
    Always,
    /// Score only texts that already matched a keyword.
    OnKeywordHit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierSettings {
    pub enabled: bool,
    pub model_name: String,
    pub invoke: InvokeMode,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self { enabled: false, model_name: DEFAULT_CLASSIFIER_MODEL.to_string(), invoke: InvokeMode::Always }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordEntry {
    One(String),
    Many(Vec<KeywordEntry>),
}

impl KeywordEntry {
    fn flatten_into(self, out: &mut Vec<String>) {
        match self {
            Self::One(k) => out.push(k),
            Self::Many(list) => list.into_iter().for_each(|e| e.flatten_into(out)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    #[serde(default)]
    keywords: Vec<KeywordEntry>,
    threshold: Option<f64>,
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    #[serde(default)]
    classifier: ClassifierSettings,
    #[serde(default)]
    categories: BTreeMap<String, RawCategory>,
}

/// A keyword with its precompiled whole-word, case-insensitive matcher.
#[derive(Debug, Clone)]
pub struct Keyword {
    text: String,
    pattern: Regex,
}

impl Keyword {
    pub fn new(text: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(text)))
            .map_err(|e| Error::InvalidConfig(format!("keyword '{text}': {e}")))?;
        Ok(Self { text: text.to_string(), pattern })
    }

    pub fn as_str(&self) -> &str { &self.text }

    pub fn is_match(&self, haystack: &str) -> bool {
        self.pattern.is_match(haystack)
    }

    pub fn pattern(&self) -> &Regex { &self.pattern }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub keywords: Vec<Keyword>,
    pub threshold: f32,
    pub action: Action,
}

impl Category {
    pub fn new(name: &str, keywords: &[&str], threshold: f32, action: Action) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidConfig(format!("category '{name}': threshold {threshold} is outside [0, 1]")));
        }
        let keywords = keywords.iter().filter(|k| !k.is_empty()).map(|k| Keyword::new(k)).collect::<Result<_>>()?;
        Ok(Self { name: name.to_string(), keywords, threshold, action })
    }
}

/// Parsed, validated policy. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub classifier: ClassifierSettings,
    /// Sorted by name.
    pub categories: Vec<Category>,
}

impl Policy {
    /// Load a policy file, choosing the format from its extension.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::InvalidConfig(format!("policy file {} not found", path.display())));
        }
        let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
        let figment = match ext.as_deref() {
            Some("yaml" | "yml") => Figment::from(Yaml::file(path)),
            Some("toml") => Figment::from(Toml::file(path)),
            _ => {
                return Err(Error::InvalidConfig(format!(
                    "policy file {} must end in .yaml, .yml or .toml",
                    path.display()
                )))
            }
        };
        let policy = Self::from_figment(&figment)?;
        info!(path = %path.display(), categories = policy.categories.len(), classifier = policy.classifier.enabled, "loaded policy");
        Ok(policy)
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Self::from_figment(&Figment::from(Yaml::string(source)))
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Self::from_figment(&Figment::from(Toml::string(source)))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawPolicy = figment.extract().map_err(|e| Error::InvalidConfig(format!("policy: {e}")))?;
        let mut categories = Vec::with_capacity(raw.categories.len());
        for (name, cat) in raw.categories {
            let threshold = cat
                .threshold
                .ok_or_else(|| Error::InvalidConfig(format!("category '{name}' is missing threshold")))?;
            let action: Action = cat
                .action
                .ok_or_else(|| Error::InvalidConfig(format!("category '{name}' is missing action")))?
                .parse()?;
            let mut words = Vec::new();
            cat.keywords.into_iter().for_each(|k| k.flatten_into(&mut words));
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            #[allow(clippy::cast_possible_truncation)]
            let category = Category::new(&name, &words, threshold as f32, action)?;
            debug!(category = %name, keywords = category.keywords.len(), threshold, action = %action, "policy category");
            categories.push(category);
        }
        Ok(Self { classifier: raw.classifier, categories })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_keywords_are_flattened_and_empty_ones_dropped() {
        let p = Policy::from_yaml_str(
            "categories:\n  insults:\n    keywords: [idiot, [stupid, [dumb]], '']\n    threshold: 0.5\n    action: filter\n",
        )
        .unwrap();
        let words: Vec<&str> = p.categories[0].keywords.iter().map(Keyword::as_str).collect();
        assert_eq!(words, vec!["idiot", "stupid", "dumb"]);
    }

    #[test]
    fn categories_are_sorted_by_name() {
        let p = Policy::from_yaml_str(
            "categories:\n  zeta: {threshold: 0.5, action: allow}\n  alpha: {threshold: 0.5, action: block}\n",
        )
        .unwrap();
        let names: Vec<&str> = p.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn keyword_matches_whole_words_case_insensitively() {
        let k = Keyword::new("idiot").unwrap();
        assert!(k.is_match("You IDIOT!"));
        assert!(!k.is_match("idiotic behaviour"));
        let special = Keyword::new("a.b").unwrap();
        assert!(special.is_match("see a.b here"));
        assert!(!special.is_match("see axb here"));
    }

    #[test]
    fn action_parsing() {
        assert_eq!("Block".parse::<Action>().unwrap(), Action::Block);
        assert!("quarantine".parse::<Action>().is_err());
        assert!(Action::Block > Action::Filter && Action::Filter > Action::Allow);
    }

    #[test]
    fn classifier_defaults() {
        let p = Policy::from_yaml_str("classifier:\n  enabled: true\n").unwrap();
        assert!(p.classifier.enabled);
        assert_eq!(p.classifier.model_name, DEFAULT_CLASSIFIER_MODEL);
        assert_eq!(p.classifier.invoke, InvokeMode::Always);
        assert!(p.categories.is_empty());
    }
}
