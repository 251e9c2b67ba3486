//! Canonical mood vocabulary
//!
//! The facial-expression model on the client and the audio classifier on the
//! server both emit labels from this set. Songs are stored with the label
//! text, and queries match it exactly, so both sides must agree on spelling.
//!
//! The audio classifier currently emits a subset (`happy`, `sad`, `angry`,
//! `neutral`); the expression model emits all seven.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Mood label shared by both analyzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Mood {
    /// Every label, in the expression model's output order
    pub const ALL: [Mood; 7] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Fearful,
        Mood::Disgusted,
        Mood::Surprised,
    ];

    /// Expression category the client never recommends from
    pub const SUPPRESSED: Mood = Mood::Surprised;

    /// Stored/queried label text
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Fearful => "fearful",
            Mood::Disgusted => "disgusted",
            Mood::Surprised => "surprised",
        }
    }

    /// Whether the client may issue a song query for this mood
    pub fn is_queryable(&self) -> bool {
        *self != Self::SUPPRESSED
    }

    /// Labels the client may query, in vocabulary order
    pub fn queryable() -> impl Iterator<Item = Mood> {
        Self::ALL.into_iter().filter(Mood::is_queryable)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    /// Parse a label, ignoring surrounding whitespace and case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let canonical = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mood| mood.as_str() == canonical)
            .ok_or_else(|| Error::UnknownMood(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_labels() {
        for mood in Mood::ALL {
            assert_eq!(mood.as_str().parse::<Mood>().unwrap(), mood);
        }
    }

    #[test]
    fn test_parse_is_case_and_whitespace_insensitive() {
        assert_eq!(" Happy\n".parse::<Mood>().unwrap(), Mood::Happy);
        assert_eq!("SAD".parse::<Mood>().unwrap(), Mood::Sad);
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let err = "joyful".parse::<Mood>().unwrap_err();
        assert!(matches!(err, Error::UnknownMood(ref s) if s == "joyful"));
        assert!("".parse::<Mood>().is_err());
    }

    #[test]
    fn test_surprised_is_not_queryable() {
        assert!(!Mood::Surprised.is_queryable());
        let queryable: Vec<Mood> = Mood::queryable().collect();
        assert_eq!(queryable.len(), 6);
        assert!(!queryable.contains(&Mood::Surprised));
    }

    #[test]
    fn test_serde_uses_lowercase_labels() {
        assert_eq!(serde_json::to_string(&Mood::Angry).unwrap(), "\"angry\"");
        let mood: Mood = serde_json::from_str("\"fearful\"").unwrap();
        assert_eq!(mood, Mood::Fearful);
    }
}
