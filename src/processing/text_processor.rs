//! Text processing and normalization

use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

pub struct TextProcessor {
    stop_words: HashSet<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ProcessedText {
    pub original: String,
    pub cleaned: String,
    pub tokens: Vec<String>,
    pub sentences: Vec<String>,
    pub word_count: usize,
}

struct Patterns {
    email: Regex,
    phone: Regex,
    url: Regex,
    whitespace: Regex,
    repeated_punct: Regex,
    ssn: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        email: Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("Invalid email regex"),
        phone: Regex::new(r"(?:\+\d{1,3}[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").expect("Invalid phone regex"),
        url: Regex::new(r"https?://[^\s]+").expect("Invalid URL regex"),
        whitespace: Regex::new(r"\s+").expect("Invalid whitespace regex"),
        repeated_punct: Regex::new(r"[.!?]{2,}").expect("Invalid punctuation regex"),
        ssn: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("Invalid SSN regex"),
    })
}

impl Default for TextProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProcessor {
    pub fn new() -> Self {
        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Process text with cleaning, tokenization, and normalization
    pub fn process(&self, text: &str) -> ProcessedText {
        let cleaned = self.clean_text(text);
        let tokens = self.tokenize(&cleaned);
        let sentences = self.split_sentences(&cleaned);
        let word_count = cleaned.unicode_words().count();

        ProcessedText {
            original: text.to_string(),
            cleaned,
            tokens,
            sentences,
            word_count,
        }
    }

    /// Clean and normalize text
    pub fn clean_text(&self, text: &str) -> String {
        let p = patterns();
        let mut cleaned = p.url.replace_all(text, "").to_string();
        cleaned = p.email.replace_all(&cleaned, "[EMAIL]").to_string();
        cleaned = p.phone.replace_all(&cleaned, "[PHONE]").to_string();
        cleaned = p.whitespace.replace_all(&cleaned, " ").trim().to_string();
        cleaned = p.repeated_punct.replace_all(&cleaned, ".").to_string();
        self.normalize_unicode(&cleaned)
    }

    /// Tokenize text into lowercase words, dropping stop words and pure numbers
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.unicode_words()
            .map(|word| word.to_lowercase())
            .filter(|word| word.chars().count() > 1)
            .filter(|word| !self.stop_words.contains(word.as_str()))
            .filter(|word| word.chars().any(|c| c.is_alphabetic()))
            .collect()
    }

    /// Split text into sentences
    pub fn split_sentences(&self, text: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Extract keywords from text (frequency-based, ties broken alphabetically)
    pub fn extract_keywords(&self, text: &str, max_keywords: usize) -> Vec<String> {
        let processed = self.process(text);
        let mut word_freq: HashMap<String, usize> = HashMap::new();

        for token in processed.tokens {
            if token.len() > 2 {
                *word_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut keywords: Vec<(String, usize)> = word_freq.into_iter().collect();
        keywords.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        keywords
            .into_iter()
            .take(max_keywords)
            .map(|(word, _)| word)
            .collect()
    }

    /// Raw term counts of the cleaned, tokenized text
    pub fn term_frequencies(&self, text: &str) -> BTreeMap<String, f32> {
        let mut counts = BTreeMap::new();
        for token in self.tokenize(&self.clean_text(text)) {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }
        counts
    }

    /// Remove personal identifiable information
    pub fn remove_pii(&self, text: &str) -> String {
        let p = patterns();
        let mut cleaned = p.email.replace_all(text, "[EMAIL REMOVED]").to_string();
        cleaned = p.ssn.replace_all(&cleaned, "[SSN REMOVED]").to_string();
        cleaned = p.phone.replace_all(&cleaned, "[PHONE REMOVED]").to_string();
        cleaned
    }

    fn normalize_unicode(&self, text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                '\u{2013}' | '\u{2014}' => '-',
                '\u{2026}' => '.',
                '\u{2022}' | '\u{25CF}' | '\u{25AA}' => '-',
                _ => c,
            })
            .collect()
    }
}

/// First email address in the text
pub fn find_email(text: &str) -> Option<String> {
    patterns().email.find(text).map(|m| m.as_str().to_string())
}

/// First phone number in the text
pub fn find_phone(text: &str) -> Option<String> {
    patterns().phone.find(text).map(|m| m.as_str().trim().to_string())
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "etc",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "him", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "just", "like", "may",
    "me", "more", "most", "must", "my", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "out", "over", "own", "same", "she", "should", "so",
    "some", "such", "than", "that", "the", "their", "theirs", "them", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "us", "very", "was",
    "we", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with",
    "would", "you", "your", "yours", "email", "phone",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_processing() {
        let processor = TextProcessor::new();
        let text = "Hello, world! This is a test document with email@example.com and phone (555) 123-4567.";

        let result = processor.process(text);

        assert!(!result.cleaned.is_empty());
        assert!(!result.tokens.is_empty());
        assert!(result.word_count > 0);
        assert!(!result.sentences.is_empty());
    }

    #[test]
    fn test_tokenization() {
        let processor = TextProcessor::new();
        let tokens = processor.tokenize("Rust programming language is awesome! 2024");

        assert!(tokens.contains(&"rust".to_string()));
        assert!(tokens.contains(&"programming".to_string()));
        assert!(tokens.contains(&"awesome".to_string()));
        assert!(!tokens.contains(&"is".to_string()));
        assert!(!tokens.contains(&"2024".to_string()));
    }

    #[test]
    fn test_text_cleaning() {
        let processor = TextProcessor::new();
        let cleaned = processor.clean_text("Contact me at john.doe@email.com or call (555) 123-4567!!!");

        assert!(cleaned.contains("[EMAIL]"));
        assert!(cleaned.contains("[PHONE]"));
        assert!(!cleaned.contains("!!!"));
    }

    #[test]
    fn test_keyword_extraction() {
        let processor = TextProcessor::new();
        let text = "Rust Rust programming language. Rust is memory safe. Programming with Rust is fun.";

        let keywords = processor.extract_keywords(text, 2);
        assert_eq!(keywords, vec!["rust".to_string(), "programming".to_string()]);
    }

    #[test]
    fn test_term_frequencies() {
        let processor = TextProcessor::new();
        let tf = processor.term_frequencies("React react and CSS");
        assert_eq!(tf.get("react"), Some(&2.0));
        assert_eq!(tf.get("css"), Some(&1.0));
        assert!(!tf.contains_key("and"));
    }

    #[test]
    fn test_contact_lookup() {
        let text = "Jane Roe\njane.roe@example.com | +1 555-123-4567";
        assert_eq!(find_email(text).as_deref(), Some("jane.roe@example.com"));
        assert!(find_phone(text).unwrap().contains("555-123-4567"));
        assert_eq!(find_email("no contact"), None);
    }

    #[test]
    fn test_pii_removal() {
        let processor = TextProcessor::new();
        let text = "Contact John at john.doe@company.com or (555) 123-4567. SSN: 123-45-6789";

        let cleaned = processor.remove_pii(text);

        assert!(!cleaned.contains("john.doe@company.com"));
        assert!(!cleaned.contains("123-4567"));
        assert!(!cleaned.contains("123-45-6789"));
    }
}
