use serde::Deserialize;
use sprs::CsVec;

use super::{ClassLabel, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Exposes class probabilities
    LogisticRegression,
    /// Decision function only
    LinearSvc,
}

#[derive(Deserialize)]
struct LinearArtifact {
    kind: ModelKind,
    classes: Vec<ClassLabel>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

/// Per-class output of a linear model for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassScores {
    /// Index into the model's classes
    pub predicted: usize,
    /// One probability per class, when the model provides them
    pub probabilities: Option<Vec<f64>>,
}

/// A fitted linear classifier: `coef · x + intercept` per decision row.
///
/// Binary models carry a single row whose positive side is `classes[1]`,
/// multi-class models one row per class.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "LinearArtifact")]
pub struct LinearModel {
    kind: ModelKind,
    classes: Vec<ClassLabel>,
    coef: Vec<Vec<f64>>,
    intercept: Vec<f64>,
}

impl TryFrom<LinearArtifact> for LinearModel {
    type Error = ModelError;

    fn try_from(artifact: LinearArtifact) -> Result<Self, Self::Error> {
        let num_classes = artifact.classes.len();
        if num_classes < 2 {
            return Err(ModelError::Invalid(format!(
                "classifier needs at least two classes, got {num_classes}"
            )));
        }

        let expected_rows = if num_classes == 2 { 1 } else { num_classes };
        if artifact.coef.len() != expected_rows || artifact.intercept.len() != expected_rows {
            return Err(ModelError::Invalid(format!(
                "expected {expected_rows} coefficient row(s) and intercept(s) for {num_classes} classes, got {} and {}",
                artifact.coef.len(),
                artifact.intercept.len()
            )));
        }

        let width = artifact.coef[0].len();
        if width == 0 || artifact.coef.iter().any(|row| row.len() != width) {
            return Err(ModelError::Invalid(
                "coefficient rows must be non-empty and of equal length".into(),
            ));
        }

        let all_finite = artifact
            .coef
            .iter()
            .flatten()
            .chain(artifact.intercept.iter())
            .all(|value| value.is_finite());
        if !all_finite {
            return Err(ModelError::Invalid(
                "classifier weights contain NaN or infinite values".into(),
            ));
        }

        Ok(Self {
            kind: artifact.kind,
            classes: artifact.classes,
            coef: artifact.coef,
            intercept: artifact.intercept,
        })
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// First index of the maximum value.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate().skip(1) {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}

impl LinearModel {
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    pub fn num_features(&self) -> usize {
        self.coef[0].len()
    }

    pub fn has_probability(&self) -> bool {
        self.kind == ModelKind::LogisticRegression
    }

    /// Raw decision values, one per coefficient row.
    pub fn decision_function(&self, features: &CsVec<f64>) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, intercept)| features.dot_dense(row.as_slice()) + intercept)
            .collect()
    }

    pub fn scores(&self, features: &CsVec<f64>) -> ClassScores {
        let decision = self.decision_function(features);

        if self.classes.len() == 2 {
            let z = decision[0];
            let predicted = usize::from(z > 0.0);
            let probabilities = self.has_probability().then(|| {
                let p = sigmoid(z);
                vec![1.0 - p, p]
            });
            ClassScores {
                predicted,
                probabilities,
            }
        } else {
            ClassScores {
                predicted: argmax(&decision),
                probabilities: self.has_probability().then(|| softmax(&decision)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::classifier::TfidfVectorizer;

    fn model(value: serde_json::Value) -> LinearModel {
        serde_json::from_value(value).expect("valid model")
    }

    fn features(text: &str) -> CsVec<f64> {
        let vectorizer: TfidfVectorizer = serde_json::from_value(json!({
            "vocabulary": {"delve": 0, "honestly": 1},
            "use_idf": false
        }))
        .unwrap();
        vectorizer.transform(text)
    }

    #[test]
    fn test_binary_logistic_probabilities() {
        let m = model(json!({
            "kind": "logistic_regression",
            "classes": ["ai", "human"],
            "coef": [[-3.0, 3.0]],
            "intercept": [0.0]
        }));

        let scores = m.scores(&features("honestly"));
        assert_eq!(scores.predicted, 1);
        let probs = scores.probabilities.unwrap();
        assert!((probs[0] + probs[1] - 1.0).abs() < 1e-12);
        assert!((probs[1] - sigmoid(3.0)).abs() < 1e-12);

        let scores = m.scores(&features("delve"));
        assert_eq!(scores.predicted, 0);
    }

    #[test]
    fn test_binary_tie_picks_first_class() {
        let m = model(json!({
            "kind": "logistic_regression",
            "classes": [0, 1],
            "coef": [[1.0, 1.0]],
            "intercept": [0.0]
        }));

        let scores = m.scores(&features("nothing matches"));
        assert_eq!(scores.predicted, 0);
        assert_eq!(scores.probabilities, Some(vec![0.5, 0.5]));
    }

    #[test]
    fn test_linear_svc_has_no_probabilities() {
        let m = model(json!({
            "kind": "linear_svc",
            "classes": ["human", "ai"],
            "coef": [[2.0, -2.0]],
            "intercept": [0.1]
        }));

        assert!(!m.has_probability());
        let scores = m.scores(&features("delve"));
        assert_eq!(scores.predicted, 1);
        assert!(scores.probabilities.is_none());
    }

    #[test]
    fn test_multiclass_softmax() {
        let m = model(json!({
            "kind": "logistic_regression",
            "classes": ["human", "ai", "mixed"],
            "coef": [[0.0, 2.0], [2.0, 0.0], [0.5, 0.5]],
            "intercept": [0.0, 0.0, 0.0]
        }));

        let scores = m.scores(&features("delve"));
        assert_eq!(scores.predicted, 1);
        let probs = scores.probabilities.unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert_eq!(argmax(&probs), 1);
    }

    #[test]
    fn test_sigmoid_is_stable_at_extremes() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
        assert!((sigmoid(0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rejects_shape_mismatch() {
        let result: Result<LinearModel, _> = serde_json::from_value(json!({
            "kind": "logistic_regression",
            "classes": ["ai", "human"],
            "coef": [[1.0], [2.0]],
            "intercept": [0.0]
        }));
        assert!(result.is_err());

        let result: Result<LinearModel, _> = serde_json::from_value(json!({
            "kind": "logistic_regression",
            "classes": ["ai"],
            "coef": [[1.0]],
            "intercept": [0.0]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let result: Result<LinearModel, _> = serde_json::from_value(json!({
            "kind": "random_forest",
            "classes": ["ai", "human"],
            "coef": [[1.0]],
            "intercept": [0.0]
        }));
        assert!(result.is_err());
    }
}
