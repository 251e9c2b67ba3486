//! Facial-expression scores and prominent-mood selection

use std::fmt;

use moodtunes_common::Mood;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Expression label to confidence, in the order the model reported them
///
/// Order matters: ties go to the first entry, so this keeps insertion order
/// instead of sorting keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionScores {
    entries: Vec<(String, f64)>,
}

impl ExpressionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a score; a repeated label keeps its first position
    pub fn push(&mut self, label: impl Into<String>, confidence: f64) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = confidence,
            None => self.entries.push((label, confidence)),
        }
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, c)| *c)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, c)| (l.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for ExpressionScores {
    fn from_iter<I: IntoIterator<Item = (L, f64)>>(iter: I) -> Self {
        let mut scores = Self::new();
        for (label, confidence) in iter {
            scores.push(label, confidence);
        }
        scores
    }
}

impl Serialize for ExpressionScores {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, confidence) in &self.entries {
            map.serialize_entry(label, confidence)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExpressionScores {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoresVisitor;

        impl<'de> Visitor<'de> for ScoresVisitor {
            type Value = ExpressionScores;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping expression labels to confidences")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut scores = ExpressionScores::new();
                while let Some((label, confidence)) = access.next_entry::<String, f64>()? {
                    scores.push(label, confidence);
                }
                Ok(scores)
            }
        }

        deserializer.deserialize_map(ScoresVisitor)
    }
}

/// Pick the mood to recommend from
///
/// Strict maximum over every entry except the suppressed `surprised`,
/// starting from a floor of zero. The first of equal scores wins. NaN never
/// wins, and labels outside the shared vocabulary are skipped. `None` when
/// nothing beats zero.
pub fn resolve_prominent_mood(scores: &ExpressionScores) -> Option<Mood> {
    let mut prominent = None;
    let mut max_confidence = 0.0;

    for (label, confidence) in scores.iter() {
        let Ok(mood) = label.parse::<Mood>() else {
            tracing::debug!(label = %label, "Skipping unknown expression label");
            continue;
        };
        if !mood.is_queryable() {
            continue;
        }
        if confidence > max_confidence {
            max_confidence = confidence;
            prominent = Some(mood);
        }
    }

    prominent
}
