//! Keyword relevance gate for incoming questions.
//!
//! Runs before any model call. Decision order:
//!
//! 1. any exclusion keyword (substring of the lower-cased question) -> not relevant
//! 2. any inclusion keyword -> relevant
//! 3. otherwise by whitespace token count: more than 3 tokens -> relevant
//!
//! A question with exactly 3 tokens and no keyword match is rejected.

/// Topics that are never answered, checked before [`INCLUDE_KEYWORDS`]
pub const EXCLUDE_KEYWORDS: &[&str] = &[
    "погода",
    "спорт",
    "политика",
    "новости",
    "рецепт",
    "фильм",
    "музыка",
    "игра",
    "автомобиль",
    "путешествие",
    "здоровье",
    "футбол",
    "борщ",
    "приготовить",
    "купить",
    "телефон",
];

/// Program, admission and career vocabulary
pub const INCLUDE_KEYWORDS: &[&str] = &[
    "итмо",
    "магистр",
    "поступление",
    "обучение",
    "программа",
    "программы",
    "искусственный интеллект",
    "машинное обучение",
    "ai",
    "ml",
    "продукт",
    "карьера",
    "экзамен",
    "документы",
    "бюджет",
    "контракт",
    "стипендия",
    "общежитие",
    "университет",
    "вуз",
    "отличаются",
    "разница",
    "сравнить",
    "подходит",
    "требования",
    "стоимость",
    "стоит",
    "перспективы",
    "доступны",
];

/// Questions with at most this many tokens and no keyword hit are rejected
const MAX_REJECTED_TOKENS: usize = 3;

/// Two-list substring classifier
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    exclude: Vec<String>,
    include: Vec<String>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(EXCLUDE_KEYWORDS, INCLUDE_KEYWORDS)
    }
}

impl KeywordClassifier {
    /// Build a classifier from custom keyword lists (lower-cased on the way in)
    pub fn new<S: AsRef<str>>(exclude: &[S], include: &[S]) -> Self {
        let lower = |words: &[S]| {
            words
                .iter()
                .map(|w| w.as_ref().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };
        Self {
            exclude: lower(exclude),
            include: lower(include),
        }
    }

    /// Whether the question is about the programs
    pub fn is_relevant(&self, question: &str) -> bool {
        let question = question.to_lowercase();

        if self.exclude.iter().any(|k| question.contains(k.as_str())) {
            return false;
        }

        if self.include.iter().any(|k| question.contains(k.as_str())) {
            return true;
        }

        question.split_whitespace().count() > MAX_REJECTED_TOKENS
    }
}

/// Classify with the built-in keyword lists
pub fn is_relevant(question: &str) -> bool {
    KeywordClassifier::default().is_relevant(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        assert!(!is_relevant("Какая сегодня погода?"));
        assert!(!is_relevant("Какая погода в ИТМО во время поступления?"));
        assert!(!is_relevant("Стоит ли купить телефон до начала обучения?"));
    }

    #[test]
    fn test_inclusion_keywords() {
        assert!(is_relevant("Чем отличаются программы?"));
        assert!(is_relevant("Сколько стоит обучение?"));
        assert!(is_relevant("ИТМО"));
        assert!(is_relevant("Какие карьерные перспективы после AI Product?"));
    }

    #[test]
    fn test_length_fallback() {
        assert!(!is_relevant("привет"));
        assert!(!is_relevant("как дела"));
        // three tokens without a keyword are still rejected
        assert!(!is_relevant("расскажи что нибудь"));
        assert!(is_relevant(
            "Расскажите подробнее о возможностях данного направления"
        ));
    }

    #[test]
    fn test_empty_question() {
        assert!(!is_relevant(""));
        assert!(!is_relevant("   "));
    }

    #[test]
    fn test_custom_lists_are_case_folded() {
        let classifier = KeywordClassifier::new(&["Crypto"], &["Rust"]);
        assert!(classifier.is_relevant("rust"));
        assert!(!classifier.is_relevant("RUST and crypto"));
    }
}
