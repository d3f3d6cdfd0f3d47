use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::Deserialize;
use sprs::CsVec;
use tracing::debug;

use super::ModelError;

/// scikit-learn's default word tokenizer: runs of two or more word characters.
pub const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// On-disk shape of the exported vectorizer. Field names and defaults
/// mirror scikit-learn's `TfidfVectorizer`.
#[derive(Deserialize)]
struct TfidfArtifact {
    vocabulary: HashMap<String, usize>,
    #[serde(default)]
    idf: Vec<f64>,
    #[serde(default = "default_true")]
    lowercase: bool,
    #[serde(default = "default_token_pattern")]
    token_pattern: String,
    #[serde(default = "default_ngram_range")]
    ngram_range: (usize, usize),
    #[serde(default)]
    stop_words: Option<Vec<String>>,
    #[serde(default)]
    sublinear_tf: bool,
    #[serde(default = "default_true")]
    use_idf: bool,
    #[serde(default = "default_norm")]
    norm: Option<Norm>,
}

fn default_true() -> bool {
    true
}

fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}

/// Word-level TF-IDF transform over a fixed, pre-fitted vocabulary.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "TfidfArtifact")]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Option<Vec<f64>>,
    lowercase: bool,
    token_pattern: Regex,
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
    sublinear_tf: bool,
    norm: Option<Norm>,
}

impl TryFrom<TfidfArtifact> for TfidfVectorizer {
    type Error = ModelError;

    fn try_from(artifact: TfidfArtifact) -> Result<Self, Self::Error> {
        let num_features = artifact.vocabulary.len();
        if num_features == 0 {
            return Err(ModelError::Invalid("vectorizer vocabulary is empty".into()));
        }

        // Columns must be exactly 0..num_features
        let mut seen = vec![false; num_features];
        for (term, &idx) in &artifact.vocabulary {
            if idx >= num_features || seen[idx] {
                return Err(ModelError::Invalid(format!(
                    "vocabulary term {term:?} has out-of-range or duplicate index {idx}"
                )));
            }
            seen[idx] = true;
        }

        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(ModelError::Invalid(format!(
                "invalid ngram_range ({min_n}, {max_n})"
            )));
        }

        let idf = if artifact.use_idf {
            if artifact.idf.len() != num_features {
                return Err(ModelError::Invalid(format!(
                    "idf has {} entries but vocabulary has {num_features}",
                    artifact.idf.len()
                )));
            }
            Some(artifact.idf)
        } else {
            None
        };

        let token_pattern = Regex::new(&artifact.token_pattern).map_err(|e| {
            ModelError::Invalid(format!("token_pattern does not compile: {e}"))
        })?;
        if token_pattern.captures_len() > 2 {
            return Err(ModelError::Invalid(
                "token_pattern may contain at most one capturing group".into(),
            ));
        }

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf,
            lowercase: artifact.lowercase,
            token_pattern,
            ngram_range: artifact.ngram_range,
            stop_words: artifact.stop_words.unwrap_or_default().into_iter().collect(),
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
        })
    }
}

impl TfidfVectorizer {
    pub fn num_features(&self) -> usize {
        self.vocabulary.len()
    }

    fn tokenize<'a>(&self, doc: &'a str) -> Vec<&'a str> {
        // With one capturing group the group is the token, as in scikit-learn
        let tokens: Vec<&str> = if self.token_pattern.captures_len() == 2 {
            self.token_pattern
                .captures_iter(doc)
                .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
                .collect()
        } else {
            self.token_pattern
                .find_iter(doc)
                .map(|m| m.as_str())
                .collect()
        };

        if self.stop_words.is_empty() {
            tokens
        } else {
            tokens
                .into_iter()
                .filter(|token| !self.stop_words.contains(*token))
                .collect()
        }
    }

    /// Raw in-vocabulary n-gram counts keyed by column.
    fn count_terms(&self, tokens: &[&str]) -> HashMap<usize, f64> {
        let (min_n, max_n) = self.ngram_range;
        let mut counts = HashMap::new();

        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&col) = self.vocabulary.get(&gram) {
                    *counts.entry(col).or_insert(0.0) += 1.0;
                }
            }
        }
        counts
    }

    /// TF-IDF features of one document as a sparse vector over the vocabulary.
    pub fn transform(&self, text: &str) -> CsVec<f64> {
        let doc = if self.lowercase {
            Cow::Owned(text.to_lowercase())
        } else {
            Cow::Borrowed(text)
        };

        let tokens = self.tokenize(&doc);
        let mut entries: Vec<(usize, f64)> = self.count_terms(&tokens).into_iter().collect();
        entries.sort_by_key(|(col, _)| *col);

        for (col, value) in entries.iter_mut() {
            if self.sublinear_tf {
                *value = 1.0 + value.ln();
            }
            if let Some(idf) = &self.idf {
                *value *= idf[*col];
            }
        }

        let norm = match self.norm {
            Some(Norm::L2) => entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => entries.iter().map(|(_, v)| v.abs()).sum::<f64>(),
            None => 1.0,
        };
        if norm > 0.0 {
            for (_, value) in entries.iter_mut() {
                *value /= norm;
            }
        }

        debug!(
            tokens = tokens.len(),
            non_zero_entries = entries.len(),
            "Vectorized text"
        );

        let (indices, data): (Vec<usize>, Vec<f64>) = entries.into_iter().unzip();
        CsVec::new(self.num_features(), indices, data)
    }
}
