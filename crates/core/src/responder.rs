use thiserror::Error;

/// Reply returned when the normalized input matches no known phrase.
pub const FALLBACK_REPLY: &str = "Sorry I dont Know about this";

const DEFAULT_PATTERNS: &[&str] = &[
    "hello",
    "help",
    "what is your name",
    "how old are you",
    "what can you do",
    "can you tell me a joke",
    "what is the meaning of life",
    "how do i reset my password",
];

const DEFAULT_REPLIES: &[&str] = &[
    "Hello! How can I assist you?",
    "Sure, let me look that up for you.",
    "My name is Chatbot.",
    "I dont have an age, as I am a computer program.",
    "I can help answer your questions, provide information, or assist with tasks.",
    "Sure, why did the tomato turn red? Because it saw the salad dressing!",
    "That's a philosophical question with many different answers depending on who you ask. \
     Some people believe that the meaning of life is to seek happiness, while others believe \
     that it's to fulfill a higher purpose or to make a positive impact on the world.",
    "To reset your password, please go to the login page and click on the \"forgot password\" \
     link. From there, you can enter your email address and receive instructions for resetting \
     your password.",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PhraseTableError {
    #[error("patterns and replies must pair up ({patterns} patterns, {replies} replies)")]
    LengthMismatch { patterns: usize, replies: usize },
    #[error("pattern `{0}` is not in normalized form")]
    UnnormalizedPattern(String),
}

/// Ordered parallel pattern/reply pairs. `patterns[i]` answers with
/// `replies[i]`. Patterns are stored pre-normalized; lookup is exact match
/// after [`normalize`], never fuzzy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhraseTable {
    patterns: &'static [&'static str],
    replies: &'static [&'static str],
}

impl Default for PhraseTable {
    fn default() -> Self {
        Self { patterns: DEFAULT_PATTERNS, replies: DEFAULT_REPLIES }
    }
}

impl PhraseTable {
    pub fn new(
        patterns: &'static [&'static str],
        replies: &'static [&'static str],
    ) -> Result<Self, PhraseTableError> {
        if patterns.len() != replies.len() {
            return Err(PhraseTableError::LengthMismatch {
                patterns: patterns.len(),
                replies: replies.len(),
            });
        }
        if let Some(pattern) = patterns.iter().find(|pattern| normalize(pattern) != **pattern) {
            return Err(PhraseTableError::UnnormalizedPattern((*pattern).to_owned()));
        }
        Ok(Self { patterns, replies })
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Exact-match lookup of the normalized input. Returns the paired reply,
    /// or [`FALLBACK_REPLY`] when nothing matches (including empty or
    /// whitespace-only input, which normalizes to the empty string).
    pub fn classify(&self, raw_text: &str) -> &'static str {
        let normalized = normalize(raw_text);
        self.patterns
            .iter()
            .position(|pattern| *pattern == normalized)
            .map_or(FALLBACK_REPLY, |index| self.replies[index])
    }
}

/// Lowercase, trim, and drop punctuation (anything neither alphanumeric nor
/// whitespace). Idempotent: `normalize(normalize(s)) == normalize(s)`.
///
/// Lowercasing happens before filtering: Unicode lowercasing can expand a
/// character into letter + combining mark (e.g. U+0130 into `i` + U+0307),
/// and the mark must still be in reach of the filter.
pub fn normalize(raw_text: &str) -> String {
    raw_text
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace())
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Classify against the default phrase table.
pub fn classify(raw_text: &str) -> &'static str {
    PhraseTable::default().classify(raw_text)
}

#[cfg(test)]
mod tests {
    use super::{classify, normalize, PhraseTable, PhraseTableError, FALLBACK_REPLY};

    #[test]
    fn classify_matches_known_phrase_regardless_of_case_and_punctuation() {
        assert_eq!(classify("HELLO!"), "Hello! How can I assist you?");
        assert_eq!(classify("  what is your name?  "), "My name is Chatbot.");
        assert_eq!(
            classify("Can you tell me a joke?"),
            "Sure, why did the tomato turn red? Because it saw the salad dressing!"
        );
    }

    #[test]
    fn classify_falls_back_on_unknown_input() {
        assert_eq!(classify("xyz"), FALLBACK_REPLY);
        assert_eq!(classify("tell me about rust"), FALLBACK_REPLY);
    }

    #[test]
    fn classify_falls_back_on_empty_and_whitespace_input() {
        assert_eq!(classify(""), FALLBACK_REPLY);
        assert_eq!(classify("   \t\n"), FALLBACK_REPLY);
        assert_eq!(classify("?!."), FALLBACK_REPLY);
    }

    #[test]
    fn classify_is_deterministic() {
        for input in ["hello", "xyz", "", "How old are you?"] {
            assert_eq!(classify(input), classify(input));
        }
    }

    #[test]
    fn every_default_pattern_maps_to_its_paired_reply() {
        let table = PhraseTable::default();
        for (pattern, reply) in super::DEFAULT_PATTERNS.iter().zip(super::DEFAULT_REPLIES) {
            assert_eq!(table.classify(pattern), *reply);
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        for input in ["  HELLO!  ", "what is your name?", "room-preferences", "café ☕"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn normalize_is_idempotent_for_expanding_unicode_lowercase() {
        // U+0130 lowercases to `i` followed by combining dot above (U+0307);
        // the combining mark must not survive a single pass.
        for input in ["\u{130}", "\u{130}stanbul Hotel!", "STRASSE \u{130}\u{130}?"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "normalize should be idempotent for {input:?}");
        }
        assert_eq!(normalize("\u{130}"), "i");
    }

    #[test]
    fn normalize_strips_punctuation_and_lowercases() {
        assert_eq!(normalize("Room Preferences!!"), "room preferences");
        assert_eq!(normalize("  How do I reset my password?  "), "how do i reset my password");
    }

    #[test]
    fn table_construction_rejects_length_mismatch() {
        let result = PhraseTable::new(&["hi"], &[]);
        assert_eq!(result, Err(PhraseTableError::LengthMismatch { patterns: 1, replies: 0 }));
    }

    #[test]
    fn table_construction_rejects_unnormalized_patterns() {
        let result = PhraseTable::new(&["Hello?"], &["hi there"]);
        assert_eq!(result, Err(PhraseTableError::UnnormalizedPattern("Hello?".to_owned())));
    }

    #[test]
    fn default_table_upholds_pairing_invariant() {
        let table =
            PhraseTable::new(super::DEFAULT_PATTERNS, super::DEFAULT_REPLIES).expect("valid table");
        assert_eq!(table.len(), 8);
        assert!(!table.is_empty());
    }
}
