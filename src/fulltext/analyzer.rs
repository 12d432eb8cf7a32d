//! Text analysis for full-text fields.
//!
//! The token pipeline is tantivy's: simple tokenizer, long-token removal,
//! lowercasing, stopword removal, then the language stemmer unless the field
//! is `nostem`. Fields with a phonetic matcher also emit a sound key per token.

use super::config::{FieldConfig, FullTextConfig};
use super::phonetic::phonetic_token;
use tantivy::tokenizer::{
    LowerCaser, RemoveLongFilter, SimpleTokenizer, Stemmer, StopWordFilter, TextAnalyzer, TokenStream,
};

/// Tokens longer than this are dropped before indexing
const MAX_TOKEN_LEN: usize = 40;

/// One analyzed word: its stemmed token plus an optional sound key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub token: String,
    pub phonetic: Option<String>,
}

/// Analyzer bound to one field of a label's full-text index
pub struct FieldAnalyzer {
    inner: TextAnalyzer,
    phonetic: bool,
}

impl FieldAnalyzer {
    pub fn new(config: &FullTextConfig, field: &FieldConfig) -> Self {
        let language = config.tantivy_language();
        let mut builder = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .dynamic();

        let stopwords = match &config.stopwords {
            Some(words) => Some(StopWordFilter::remove(words.clone())),
            None => StopWordFilter::new(language),
        };
        if let Some(filter) = stopwords {
            builder = builder.filter_dynamic(filter);
        }
        if !field.nostem {
            builder = builder.filter_dynamic(Stemmer::new(language));
        }

        Self {
            inner: builder.build(),
            phonetic: field.phonetic.is_some(),
        }
    }

    /// Analyze a text into its terms, in order, duplicates kept.
    pub fn terms(&mut self, text: &str) -> Vec<Term> {
        let phonetic = self.phonetic;
        let mut out = Vec::new();
        let mut stream = self.inner.token_stream(text);
        while stream.advance() {
            let token = stream.token().text.clone();
            if token.is_empty() {
                continue;
            }
            let sound = if phonetic { phonetic_token(&token) } else { None };
            out.push(Term { token, phonetic: sound });
        }
        out
    }

    /// Flat token list including sound keys, as stored in postings.
    pub fn tokens(&mut self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        for term in self.terms(text) {
            out.push(term.token);
            if let Some(sound) = term.phonetic {
                out.push(sound);
            }
        }
        out
    }
}
