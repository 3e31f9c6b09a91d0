//! Reply language detection.

use std::sync::LazyLock;

use regex::Regex;
use vitaguide_core::Language;

/// Picks the language the assistant should answer in.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, message: &str) -> Language;
}

static ENGLISH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(the|and|is|are|what|which|how|why|when|can|should|with|for|my|i|me|you|do|does|take|give|show|help|need|want|some|any|best)\b",
    )
    .expect("Invalid regex")
});

static FRENCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(le|la|les|des|du|de|et|est|sont|quel|quelle|quels|quelles|comment|pourquoi|quand|je|j|me|mon|ma|mes|vous|tu|pour|avec|prendre|donne|donnez|montre|besoin|veux|voudrais|bonjour|merci|un|une)\b|[àâçéèêëîïôûùœ]",
    )
    .expect("Invalid regex")
});

/// Stopword vote between English and French.
///
/// Ties (including messages with no recognisable words) go to the configured
/// default.
#[derive(Debug, Clone, Copy)]
pub struct KeywordLanguageDetector {
    default: Language,
}

impl KeywordLanguageDetector {
    #[must_use]
    pub const fn new(default: Language) -> Self {
        Self { default }
    }
}

impl Default for KeywordLanguageDetector {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl LanguageDetector for KeywordLanguageDetector {
    fn detect(&self, message: &str) -> Language {
        let lower = message.to_lowercase();
        let english = ENGLISH_RE.find_iter(&lower).count();
        let french = FRENCH_RE.find_iter(&lower).count();

        match english.cmp(&french) {
            std::cmp::Ordering::Greater => Language::En,
            std::cmp::Ordering::Less => Language::Fr,
            std::cmp::Ordering::Equal => self.default,
        }
    }
}
