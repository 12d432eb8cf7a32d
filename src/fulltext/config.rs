//! Full-text index options and their validation.
//!
//! Requests arrive as loose JSON (`{label, language?, stopwords?}` plus field
//! descriptors that are either a bare name or `{field, weight?, nostem?,
//! phonetic?}`). They are parsed into closed structs here; every wrongly typed
//! attribute maps to its own error.

use crate::error::{IndexError, Result};
use serde_json::Value;
use tantivy::tokenizer::Language;

/// Languages with a stemmer. Names are matched case-insensitively.
const SUPPORTED_LANGUAGES: &[(&str, Language)] = &[
    ("arabic", Language::Arabic),
    ("danish", Language::Danish),
    ("dutch", Language::Dutch),
    ("english", Language::English),
    ("finnish", Language::Finnish),
    ("french", Language::French),
    ("german", Language::German),
    ("greek", Language::Greek),
    ("hungarian", Language::Hungarian),
    ("italian", Language::Italian),
    ("norwegian", Language::Norwegian),
    ("portuguese", Language::Portuguese),
    ("romanian", Language::Romanian),
    ("russian", Language::Russian),
    ("spanish", Language::Spanish),
    ("swedish", Language::Swedish),
    ("tamil", Language::Tamil),
    ("turkish", Language::Turkish),
];

/// Phonetic matchers accepted by the `phonetic` attribute. All of them are
/// aliases for the Soundex folding in `phonetic.rs`.
const SUPPORTED_PHONETIC: &[&str] = &["dm:en", "dm:fr", "dm:pt", "dm:es"];

/// Resolve a language name against the supported table
pub fn language_for(name: &str) -> Option<Language> {
    let lower = name.to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, lang)| *lang)
}

pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    SUPPORTED_LANGUAGES.iter().map(|(n, _)| *n)
}

fn normalize_stopwords(words: Vec<String>) -> Vec<String> {
    let mut words: Vec<String> = words.into_iter().map(|w| w.to_lowercase()).collect();
    words.sort_unstable();
    words.dedup();
    words
}

// ============ INDEX-LEVEL OPTIONS ============

/// Owner argument of a full-text create request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullTextOptions {
    pub label: String,
    /// Explicit language, `None` = graph default
    pub language: Option<String>,
    /// Explicit stopwords, `None` = language defaults
    pub stopwords: Option<Vec<String>>,
}

impl FullTextOptions {
    pub fn new(label: &str) -> Self {
        Self { label: label.to_string(), ..Default::default() }
    }

    pub fn language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn stopwords<S: AsRef<str>>(mut self, words: &[S]) -> Self {
        self.stopwords = Some(words.iter().map(|w| w.as_ref().to_string()).collect());
        self
    }

    /// Parse the owner argument: a label string or an options object.
    pub fn from_json(owner: &Value) -> Result<Self> {
        let obj = match owner {
            Value::String(label) => return Ok(Self::new(label)),
            Value::Object(obj) => obj,
            _ => return Err(IndexError::LabelMissing),
        };

        let label = match obj.get("label") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(IndexError::LabelMissing),
        };

        let stopwords = match obj.get("stopwords") {
            None => None,
            Some(Value::Array(items)) => {
                let mut words = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => words.push(s.clone()),
                        _ => return Err(IndexError::InvalidStopwords),
                    }
                }
                Some(words)
            }
            Some(_) => return Err(IndexError::InvalidStopwords),
        };

        let language = match obj.get("language") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(IndexError::InvalidLanguageType),
        };

        let opts = Self { label, language, stopwords };
        opts.validate()?;
        Ok(opts)
    }

    /// Checks that do not depend on the JSON shape
    pub fn validate(&self) -> Result<()> {
        if self.label.is_empty() {
            return Err(IndexError::LabelMissing);
        }
        if let Some(lang) = &self.language {
            if language_for(lang).is_none() {
                return Err(IndexError::UnsupportedLanguage(lang.clone()));
            }
        }
        Ok(())
    }

    /// Produce the immutable label configuration for a new index
    pub fn resolve(&self, default_language: &str) -> FullTextConfig {
        let explicit = self.language.is_some();
        let language = self
            .language
            .clone()
            .unwrap_or_else(|| default_language.to_string())
            .to_lowercase();
        FullTextConfig {
            language,
            explicit_language: explicit,
            stopwords: self.stopwords.clone().map(normalize_stopwords),
        }
    }
}

/// Fixed configuration of a label's full-text index.
#[derive(Debug, Clone, PartialEq)]
pub struct FullTextConfig {
    /// Effective language (lowercase)
    pub language: String,
    explicit_language: bool,
    /// Normalized custom stopwords, `None` = language defaults
    pub stopwords: Option<Vec<String>>,
}

impl Default for FullTextConfig {
    fn default() -> Self {
        FullTextOptions::default().resolve("english")
    }
}

impl FullTextConfig {
    /// Tantivy language; falls back to English for names outside the table
    pub fn tantivy_language(&self) -> Language {
        language_for(&self.language).unwrap_or(Language::English)
    }

    /// A request conflicts when it names a language or stopword set other than the stored one.
    /// Requests that name neither never conflict.
    pub fn conflicts_with(&self, request: &FullTextOptions) -> bool {
        if let Some(lang) = &request.language {
            if !self.explicit_language || !self.language.eq_ignore_ascii_case(lang) {
                return true;
            }
        }
        if let Some(words) = &request.stopwords {
            if self.stopwords.as_ref() != Some(&normalize_stopwords(words.clone())) {
                return true;
            }
        }
        false
    }
}

// ============ FIELD-LEVEL OPTIONS ============

/// One field descriptor of a full-text create request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSpec {
    pub field: String,
    pub weight: Option<f64>,
    pub nostem: Option<bool>,
    pub phonetic: Option<String>,
}

impl FieldSpec {
    pub fn named(field: &str) -> Self {
        Self { field: field.to_string(), ..Default::default() }
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn nostem(mut self, nostem: bool) -> Self {
        self.nostem = Some(nostem);
        self
    }

    pub fn phonetic(mut self, phonetic: &str) -> Self {
        self.phonetic = Some(phonetic.to_string());
        self
    }

    /// Parse a bare field name or a `{field, weight?, nostem?, phonetic?}` object.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::String(name) => return Ok(Self::named(name)),
            Value::Object(obj) => obj,
            _ => return Err(IndexError::InvalidFieldType),
        };

        let field = match obj.get("field") {
            None | Some(Value::Null) => return Err(IndexError::FieldMissing),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(IndexError::InvalidFieldType),
        };

        let weight = match obj.get("weight") {
            None => None,
            Some(Value::Number(n)) => n.as_f64(),
            Some(_) => return Err(IndexError::InvalidWeightType),
        };

        let nostem = match obj.get("nostem") {
            None => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => return Err(IndexError::InvalidNostemType),
        };

        let phonetic = match obj.get("phonetic") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => return Err(IndexError::InvalidPhoneticType),
        };

        let spec = Self { field, weight, nostem, phonetic };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        if self.field.is_empty() {
            return Err(IndexError::FieldMissing);
        }
        if let Some(w) = self.weight {
            if !(w.is_finite() && w > 0.0) {
                return Err(IndexError::InvalidWeight(w));
            }
        }
        if let Some(p) = &self.phonetic {
            let lower = p.to_lowercase();
            if lower != "no" && !SUPPORTED_PHONETIC.contains(&lower.as_str()) {
                return Err(IndexError::UnsupportedPhonetic(p.clone()));
            }
        }
        Ok(())
    }

    pub fn resolve(&self) -> FieldConfig {
        let phonetic = self
            .phonetic
            .as_ref()
            .map(|p| p.to_lowercase())
            .filter(|p| p != "no");
        FieldConfig {
            name: self.field.clone(),
            weight: self.weight.unwrap_or(1.0),
            nostem: self.nostem.unwrap_or(false),
            phonetic,
        }
    }

    /// Explicit attributes that disagree with an existing field's config
    pub fn conflicts_with(&self, existing: &FieldConfig) -> bool {
        let resolved = self.resolve();
        self.weight.is_some_and(|w| w != existing.weight)
            || self.nostem.is_some_and(|n| n != existing.nostem)
            || (self.phonetic.is_some() && resolved.phonetic != existing.phonetic)
    }
}

/// Resolved per-field configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldConfig {
    pub name: String,
    pub weight: f64,
    pub nostem: bool,
    /// Phonetic matcher code such as `dm:en`
    pub phonetic: Option<String>,
}

impl FieldConfig {
    pub fn plain(name: &str) -> Self {
        FieldSpec::named(name).resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_owner_as_string_or_object() {
        let opts = FullTextOptions::from_json(&json!("L")).unwrap();
        assert_eq!(opts.label, "L");
        assert!(opts.language.is_none());

        let opts = FullTextOptions::from_json(&json!({"label": "L2", "stopwords": ["The"]})).unwrap();
        assert_eq!(opts.stopwords, Some(vec!["The".to_string()]));
    }

    #[test]
    fn test_owner_validation_errors() {
        let err = FullTextOptions::from_json(&json!({"stopwords": ["The"]})).unwrap_err();
        assert!(matches!(err, IndexError::LabelMissing));

        let err = FullTextOptions::from_json(&json!({"label": "L3", "stopwords": "The"})).unwrap_err();
        assert!(matches!(err, IndexError::InvalidStopwords));

        let err = FullTextOptions::from_json(&json!({"label": "L3", "stopwords": ["a", 1]})).unwrap_err();
        assert!(matches!(err, IndexError::InvalidStopwords));

        let err = FullTextOptions::from_json(&json!({"label": "L3", "language": ["english"]})).unwrap_err();
        assert!(matches!(err, IndexError::InvalidLanguageType));

        let err = FullTextOptions::from_json(&json!({"label": "L1", "language": "x"})).unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedLanguage(_)));

        let err = FullTextOptions::from_json(&json!(null)).unwrap_err();
        assert!(matches!(err, IndexError::LabelMissing));
    }

    #[test]
    fn test_field_validation_errors() {
        assert!(matches!(FieldSpec::from_json(&json!({})).unwrap_err(), IndexError::FieldMissing));
        assert!(matches!(
            FieldSpec::from_json(&json!({"field": "v1", "weight": "1"})).unwrap_err(),
            IndexError::InvalidWeightType
        ));
        assert!(matches!(
            FieldSpec::from_json(&json!({"field": "v1", "nostem": "true"})).unwrap_err(),
            IndexError::InvalidNostemType
        ));
        assert!(matches!(
            FieldSpec::from_json(&json!({"field": "v1", "phonetic": true})).unwrap_err(),
            IndexError::InvalidPhoneticType
        ));
        assert!(matches!(
            FieldSpec::from_json(&json!({"field": "v1", "weight": -2})).unwrap_err(),
            IndexError::InvalidWeight(_)
        ));
        assert!(matches!(
            FieldSpec::from_json(&json!({"field": "v1", "phonetic": "soundex"})).unwrap_err(),
            IndexError::UnsupportedPhonetic(_)
        ));
        assert!(matches!(FieldSpec::from_json(&json!(3)).unwrap_err(), IndexError::InvalidFieldType));
    }

    #[test]
    fn test_field_resolve_defaults() {
        let field = FieldSpec::from_json(&json!({"field": "title", "weight": 2.5, "phonetic": "dm:en"}))
            .unwrap()
            .resolve();
        assert_eq!(field.weight, 2.5);
        assert!(!field.nostem);
        assert_eq!(field.phonetic.as_deref(), Some("dm:en"));

        let plain = FieldSpec::from_json(&json!({"field": "body", "phonetic": "no"})).unwrap().resolve();
        assert!(plain.phonetic.is_none());
        assert_eq!(plain.weight, 1.0);
    }

    #[test]
    fn test_conflicts() {
        let stored = FullTextOptions::new("L1").resolve("english");
        assert!(!stored.conflicts_with(&FullTextOptions::new("L1")));
        assert!(stored.conflicts_with(&FullTextOptions::new("L1").stopwords(&["The"])));
        // an implicit default is not the same as an explicit choice
        assert!(stored.conflicts_with(&FullTextOptions::new("L1").language("english")));

        let stored = FullTextOptions::new("L2").language("English").stopwords(&["The", "a"]).resolve("english");
        assert!(!stored.conflicts_with(&FullTextOptions::new("L2").language("english")));
        assert!(!stored.conflicts_with(&FullTextOptions::new("L2").stopwords(&["A", "the"])));
        assert!(stored.conflicts_with(&FullTextOptions::new("L2").language("french")));
    }

    #[test]
    fn test_field_conflicts() {
        let existing = FieldConfig::plain("v1");
        assert!(!FieldSpec::named("v1").conflicts_with(&existing));
        assert!(!FieldSpec::named("v1").weight(1.0).conflicts_with(&existing));
        assert!(FieldSpec::named("v1").weight(2.0).conflicts_with(&existing));
        assert!(FieldSpec::named("v1").nostem(true).conflicts_with(&existing));
        assert!(!FieldSpec::named("v1").phonetic("no").conflicts_with(&existing));
        assert!(FieldSpec::named("v1").phonetic("dm:en").conflicts_with(&existing));
    }

    #[test]
    fn test_language_table() {
        assert!(language_for("English").is_some());
        assert!(language_for("klingon").is_none());
        assert!(supported_languages().any(|l| l == "german"));
    }
}
