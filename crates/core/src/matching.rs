use serde::{Deserialize, Serialize};

/// How trigger phrases are tested against message text.
///
/// The default mirrors the chat framework the bot was first written against:
/// a case-insensitive substring test, so `"Which way?"` still matches `"hi"`.
/// `whole_word` narrows matches to complete alphanumeric tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchPolicy {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

impl MatchPolicy {
    pub fn new(case_sensitive: bool, whole_word: bool) -> Self {
        Self { case_sensitive, whole_word }
    }

    pub fn matches(&self, text: &str, pattern: &str) -> bool {
        if pattern.is_empty() {
            return false;
        }

        let (text, pattern) = if self.case_sensitive {
            (text.to_owned(), pattern.to_owned())
        } else {
            (text.to_lowercase(), pattern.to_lowercase())
        };

        if self.whole_word {
            tokens(&text).any(|token| token == pattern)
        } else {
            text.contains(&pattern)
        }
    }

    pub fn matches_any(&self, text: &str, patterns: &[&str]) -> bool {
        patterns.iter().any(|pattern| self.matches(text, pattern))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|ch: char| !ch.is_alphanumeric() && ch != '\'').filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::MatchPolicy;

    #[test]
    fn default_policy_is_case_insensitive_substring() {
        let policy = MatchPolicy::default();

        assert!(policy.matches("HELLO there", "hello"));
        assert!(policy.matches("I'm hungry!", "hungry"));
        assert!(policy.matches("which one", "hi"));
        assert!(!policy.matches("good morning", "hello"));
    }

    #[test]
    fn case_sensitive_policy_rejects_other_casing() {
        let policy = MatchPolicy::new(true, false);

        assert!(policy.matches("hello", "hello"));
        assert!(!policy.matches("Hello", "hello"));
    }

    #[test]
    fn whole_word_policy_ignores_embedded_matches() {
        let policy = MatchPolicy::new(false, true);

        assert!(policy.matches("hi, bot", "hi"));
        assert!(!policy.matches("which one", "hi"));
        assert!(policy.matches("Yes please", "yes"));
        assert!(!policy.matches("yesterday", "yes"));
    }

    #[test]
    fn empty_pattern_never_matches() {
        assert!(!MatchPolicy::default().matches("anything", ""));
    }

    #[test]
    fn matches_any_checks_every_pattern() {
        let policy = MatchPolicy::default();
        assert!(policy.matches_any("what's for dinner", &["lunch", "dinner"]));
        assert!(!policy.matches_any("nothing", &["lunch", "dinner"]));
    }
}
