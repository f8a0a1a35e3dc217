// Built-in vocabulary used when no term file is configured.
//
// Covers the hate/violence/spam category words plus common profanity and
// slurs. Entries are already lowercase and trimmed.

pub const DEFAULT_TERMS: &[&str] = &[
    // Harm categories
    "hate",
    "violence",
    "abuse",
    "harassment",
    "discrimination",
    "racism",
    "sexism",
    "homophobia",
    "bullying",
    "threats",
    "illegal",
    "drugs",
    "weapons",
    "terrorism",
    "extremism",
    "spam",
    "scam",
    "fake_news",
    "misinformation",
    "knife",
    "murder",
    "kill",
    "suicide",
    "death",
    // Profanity and slurs
    "ass",
    "asshole",
    "bastard",
    "bitch",
    "bloody",
    "cock",
    "crap",
    "cunt",
    "damn",
    "dick",
    "fuck",
    "fucker",
    "fucking",
    "hell",
    "motherfucker",
    "nigga",
    "nigger",
    "piss",
    "pussy",
    "shit",
    "slut",
    "whore",
    "bollocks",
    "bugger",
];

/// Probe list used by discovery when the caller supplies no candidates.
pub const DEFAULT_DISCOVERY_CANDIDATES: &[&str] = &[
    "test", "hello", "fuck", "shit", "damn", "kill", "hate", "violence", "abuse", "racism",
    "sexism", "spam", "scam",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_terms_are_normalized() {
        for term in DEFAULT_TERMS {
            assert_eq!(*term, term.trim().to_lowercase(), "term {term:?} is not normalized");
        }
    }

    #[test]
    fn test_default_terms_are_unique() {
        let unique: HashSet<_> = DEFAULT_TERMS.iter().collect();
        assert_eq!(unique.len(), DEFAULT_TERMS.len());
    }
}
