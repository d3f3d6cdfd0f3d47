//! Model-serving adapter.
//!
//! Loads the exported TF-IDF vectorizer and linear classifier once at startup
//! and turns a piece of text into a [`Verdict`]. The detector is immutable
//! after construction and is shared read-only between request handlers.
//!
//! Which classifier class means "AI" is decided once, when the detector is
//! built, from `model.ai_class` in the configuration or the default encoding
//! documented on [`ClassLabel::is_default_ai`].

mod label;
mod linear;
mod vectorizer;

pub use label::{resolve_ai_index, ClassLabel, Label};
pub use linear::{ClassScores, LinearModel, ModelKind};
pub use vectorizer::{Norm, TfidfVectorizer, DEFAULT_TOKEN_PATTERN};

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::ModelConfig;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model artifacts not found in any of: {}", display_paths(.searched))]
    NotFound { searched: Vec<PathBuf> },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error(
        "no classifier class maps to AI (classes: {classes}; configured ai_class: {})",
        .configured.as_deref().unwrap_or("none")
    )]
    UnresolvedAiClass {
        classes: String,
        configured: Option<String>,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of classifying one text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Verdict {
    pub label: Label,
    /// Probability that the text is AI-generated, whatever the predicted label.
    /// `None` when the classifier has no probability output.
    pub ai_probability: Option<f64>,
}

#[derive(Debug)]
pub struct Detector {
    vectorizer: TfidfVectorizer,
    model: LinearModel,
    ai_index: usize,
}

impl Detector {
    pub fn new(
        vectorizer: TfidfVectorizer,
        model: LinearModel,
        ai_class: Option<&ClassLabel>,
    ) -> Result<Self, ModelError> {
        if vectorizer.num_features() != model.num_features() {
            return Err(ModelError::Invalid(format!(
                "vectorizer produces {} features but classifier expects {}",
                vectorizer.num_features(),
                model.num_features()
            )));
        }

        let ai_index = resolve_ai_index(model.classes(), ai_class)?;

        Ok(Self {
            vectorizer,
            model,
            ai_index,
        })
    }

    /// Locate and load both artifacts following `config.search_paths`.
    pub fn load(config: &ModelConfig) -> Result<Self, ModelError> {
        let (vectorizer_path, classifier_path) = locate_artifacts(
            &config.search_paths,
            &config.vectorizer_file,
            &config.classifier_file,
        )?;

        let vectorizer: TfidfVectorizer = read_artifact(&vectorizer_path)?;
        let model: LinearModel = read_artifact(&classifier_path)?;
        let detector = Self::new(vectorizer, model, config.ai_class.as_ref())?;

        info!(
            vectorizer = %vectorizer_path.display(),
            classifier = %classifier_path.display(),
            features = detector.vectorizer.num_features(),
            ai_class = %detector.ai_class(),
            probabilities = detector.has_probability(),
            "Model artifacts loaded"
        );

        Ok(detector)
    }

    pub fn ai_class(&self) -> &ClassLabel {
        &self.model.classes()[self.ai_index]
    }

    pub fn has_probability(&self) -> bool {
        self.model.has_probability()
    }

    /// Classify `text`. Callers reject empty or whitespace-only input first.
    pub fn predict(&self, text: &str) -> Verdict {
        let features = self.vectorizer.transform(text);
        let scores = self.model.scores(&features);

        let label = if scores.predicted == self.ai_index {
            Label::Ai
        } else {
            Label::Human
        };
        let ai_probability = scores
            .probabilities
            .map(|probs| probs[self.ai_index].clamp(0.0, 1.0));

        debug!(
            raw_class = %self.model.classes()[scores.predicted],
            label = %label,
            ai_probability = ?ai_probability,
            "Prediction"
        );

        Verdict {
            label,
            ai_probability,
        }
    }
}

/// First directory in `search_paths` holding both files.
pub fn locate_artifacts(
    search_paths: &[PathBuf],
    vectorizer_file: &str,
    classifier_file: &str,
) -> Result<(PathBuf, PathBuf), ModelError> {
    for dir in search_paths {
        let vectorizer = dir.join(vectorizer_file);
        let classifier = dir.join(classifier_file);
        if vectorizer.is_file() && classifier.is_file() {
            return Ok((vectorizer, classifier));
        }
        debug!(dir = %dir.display(), "Model artifacts not in directory");
    }

    Err(ModelError::NotFound {
        searched: search_paths.to_vec(),
    })
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    /// Four-word detector: "delve"/"tapestry" lean AI, "honestly"/"lol" lean
    /// human. Classes are `["ai", "human"]`.
    pub fn vectorizer_json() -> serde_json::Value {
        json!({
            "vocabulary": {"delve": 0, "tapestry": 1, "honestly": 2, "lol": 3},
            "idf": [1.0, 1.0, 1.0, 1.0]
        })
    }

    pub fn classifier_json() -> serde_json::Value {
        json!({
            "kind": "logistic_regression",
            "classes": ["ai", "human"],
            "coef": [[-2.0, -2.0, 2.0, 2.0]],
            "intercept": [0.0]
        })
    }

    pub fn detector() -> Detector {
        Detector::new(
            serde_json::from_value(vectorizer_json()).unwrap(),
            serde_json::from_value(classifier_json()).unwrap(),
            None,
        )
        .unwrap()
    }

    /// Human is `classes[0]` and "honestly" scores a confident Human verdict
    /// with an AI probability of about 0.18.
    pub fn human_first_detector() -> Detector {
        let model = json!({
            "kind": "logistic_regression",
            "classes": ["human", "ai"],
            "coef": [[0.0, 0.0, -1.516, 0.0]],
            "intercept": [0.0]
        });
        Detector::new(
            serde_json::from_value(vectorizer_json()).unwrap(),
            serde_json::from_value(model).unwrap(),
            None,
        )
        .unwrap()
    }
}
