use core::fmt;

use serde::{Deserialize, Serialize};

use super::ModelError;

/// A raw class as stored in the classifier artifact. scikit-learn exports
/// either string or integer class labels depending on the training data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl ClassLabel {
    /// Same class, comparing strings case-insensitively.
    #[must_use]
    pub fn matches(&self, other: &ClassLabel) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a.to_lowercase() == b.to_lowercase(),
            _ => false,
        }
    }

    /// Default encoding: `"ai…"` strings and the integer `1` are AI.
    #[must_use]
    pub fn is_default_ai(&self) -> bool {
        match self {
            Self::Int(value) => *value == 1,
            Self::Text(value) => value.to_lowercase().starts_with("ai"),
        }
    }
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value:?}"),
        }
    }
}

/// Normalized verdict of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Human,
    #[serde(rename = "AI")]
    Ai,
}

impl Label {
    /// Canonical name, as persisted in prediction history
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Label {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AI" => Ok(Self::Ai),
            "Human" => Ok(Self::Human),
            other => Err(format!("unknown label: {other}")),
        }
    }
}

/// Find the index of the AI class among the classifier's classes.
///
/// A configured class must be present in `classes`. Without configuration
/// the first class satisfying [`ClassLabel::is_default_ai`] is used.
pub fn resolve_ai_index(
    classes: &[ClassLabel],
    configured: Option<&ClassLabel>,
) -> Result<usize, ModelError> {
    let found = match configured {
        Some(wanted) => classes.iter().position(|class| class.matches(wanted)),
        None => classes.iter().position(ClassLabel::is_default_ai),
    };

    found.ok_or_else(|| ModelError::UnresolvedAiClass {
        classes: classes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        configured: configured.map(ToString::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ClassLabel {
        ClassLabel::Text(s.to_string())
    }

    #[test]
    fn test_default_string_classes() {
        let classes = vec![text("Human"), text("AI")];
        assert_eq!(resolve_ai_index(&classes, None).unwrap(), 1);

        let classes = vec![text("ai_generated"), text("human_written")];
        assert_eq!(resolve_ai_index(&classes, None).unwrap(), 0);
    }

    #[test]
    fn test_default_integer_classes() {
        let classes = vec![ClassLabel::Int(0), ClassLabel::Int(1)];
        assert_eq!(resolve_ai_index(&classes, None).unwrap(), 1);
    }

    #[test]
    fn test_configured_class_wins_over_default() {
        let classes = vec![ClassLabel::Int(0), ClassLabel::Int(1)];
        let configured = ClassLabel::Int(0);
        assert_eq!(resolve_ai_index(&classes, Some(&configured)).unwrap(), 0);

        let classes = vec![text("machine"), text("person")];
        assert_eq!(
            resolve_ai_index(&classes, Some(&text("MACHINE"))).unwrap(),
            0
        );
    }

    #[test]
    fn test_unresolvable_class() {
        let classes = vec![text("human"), text("bot")];
        let err = resolve_ai_index(&classes, None).unwrap_err();
        assert!(err.to_string().contains("\"bot\""));

        let classes = vec![ClassLabel::Int(0), ClassLabel::Int(1)];
        assert!(resolve_ai_index(&classes, Some(&text("ai"))).is_err());
    }

    #[test]
    fn test_label_round_trip_through_str() {
        assert_eq!("AI".parse::<Label>().unwrap(), Label::Ai);
        assert_eq!(Label::Human.as_str().parse::<Label>().unwrap(), Label::Human);
        assert!("robot".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_serializes_to_canonical_name() {
        assert_eq!(serde_json::to_string(&Label::Ai).unwrap(), "\"AI\"");
        assert_eq!(serde_json::to_string(&Label::Human).unwrap(), "\"Human\"");
    }
}
