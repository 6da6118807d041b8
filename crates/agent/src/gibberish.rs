//! Low-information input detection.
//!
//! Runs before any retrieval work. A message is rejected when too many of its
//! whitespace tokens are neither exempt nor recognisable words.

use parley_config::{ConfigError, GibberishConfig};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const QWERTY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Lexical-frequency source: is this a word of the language?
pub trait Lexicon: Send + Sync {
    fn is_known(&self, word: &str) -> bool;
}

/// A newline-separated word list held in memory, matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct WordListLexicon {
    words: HashSet<String>,
}

impl WordListLexicon {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::MissingResource {
            path: path.to_path_buf(),
            reason: format!("word list: {e}"),
        })?;

        let lexicon = Self::from_words(content.lines().map(str::trim).filter(|w| !w.is_empty()));
        if lexicon.words.is_empty() {
            return Err(ConfigError::MissingResource {
                path: path.to_path_buf(),
                reason: "word list is empty".into(),
            });
        }

        debug!(path = %path.display(), words = lexicon.words.len(), "Loaded lexicon");
        Ok(lexicon)
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            words: words.into_iter().map(|w| w.as_ref().to_lowercase()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Lexicon for WordListLexicon {
    fn is_known(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

/// Why a token was counted as noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    KeyboardSmash,
    DigitRun,
    MixedClasses,
    SymbolsOnly,
    Unknown,
}

pub struct GibberishFilter {
    lexicon: Arc<dyn Lexicon>,
    exempt: HashSet<String>,
    ratio: f32,
}

impl GibberishFilter {
    pub fn new(lexicon: Arc<dyn Lexicon>, config: &GibberishConfig) -> Self {
        let exempt = config
            .whitelist
            .iter()
            .chain(config.fillers.iter())
            .map(|w| w.to_lowercase())
            .collect();

        Self {
            lexicon,
            exempt,
            ratio: config.ratio,
        }
    }

    pub fn is_gibberish(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return true;
        }
        if trimmed.chars().count() >= 10 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            debug!(text = trimmed, "Single long letter run");
            return true;
        }

        let tokens: Vec<&str> = trimmed.split_whitespace().collect();
        let noisy: Vec<(&str, NoiseKind)> = tokens
            .iter()
            .filter_map(|token| self.classify(token).map(|kind| (*token, kind)))
            .collect();

        let ratio = noisy.len() as f32 / tokens.len() as f32;
        let rejected = ratio > self.ratio;
        if !noisy.is_empty() {
            debug!(
                tokens = tokens.len(),
                noisy = ?noisy,
                ratio,
                rejected,
                "Gibberish check"
            );
        }
        rejected
    }

    /// `None` when the token is acceptable.
    pub fn classify(&self, raw: &str) -> Option<NoiseKind> {
        let token = raw.trim_matches(|c: char| c.is_ascii_punctuation());

        if token.is_empty() {
            return (raw.chars().count() > 2).then_some(NoiseKind::SymbolsOnly);
        }

        let lower = token.to_lowercase();
        if self.exempt.contains(&lower) || self.exempt.contains(&raw.to_lowercase()) {
            return None;
        }
        if self.lexicon.is_known(&lower) {
            return None;
        }
        if lower.chars().count() <= 6 && lower.chars().all(char::is_alphabetic) {
            return None;
        }

        Some(structural_noise(&lower))
    }
}

fn structural_noise(token: &str) -> NoiseKind {
    if is_keyboard_smash(token) {
        NoiseKind::KeyboardSmash
    } else if token.len() >= 5 && token.chars().all(|c| c.is_ascii_digit()) {
        NoiseKind::DigitRun
    } else if has_mixed_classes(token) {
        NoiseKind::MixedClasses
    } else if token.chars().count() > 2 && token.chars().all(|c| c.is_ascii_punctuation()) {
        NoiseKind::SymbolsOnly
    } else {
        NoiseKind::Unknown
    }
}

fn is_keyboard_smash(token: &str) -> bool {
    let reversed: String = token.chars().rev().collect();
    if QWERTY_ROWS
        .iter()
        .any(|row| row.contains(token) || row.contains(reversed.as_str()))
    {
        return true;
    }

    let chars: Vec<char> = token.chars().collect();
    for n in 2..=4 {
        if chars.len() >= 2 * n && chars.len() % n == 0 {
            let chunk = &chars[..n];
            if chars.chunks(n).all(|c| c == chunk) {
                return true;
            }
        }
    }

    let row_letters: Vec<char> = chars
        .iter()
        .copied()
        .filter(|c| QWERTY_ROWS.iter().any(|row| row.contains(*c)))
        .collect();
    if row_letters.len() >= 6 {
        let changes = row_letters.windows(2).filter(|w| w[0] != w[1]).count();
        return changes as f32 / row_letters.len() as f32 > 0.6;
    }

    false
}

fn has_mixed_classes(token: &str) -> bool {
    let letter = token.chars().any(char::is_alphabetic);
    let digit = token.chars().any(|c| c.is_ascii_digit());
    let symbol = token.chars().any(|c| c.is_ascii_punctuation());
    [letter, digit, symbol].iter().filter(|present| **present).count() >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> GibberishFilter {
        let lexicon = WordListLexicon::from_words([
            "hello", "there", "team", "working", "project", "tell", "about", "please",
            "employees", "germany", "department",
        ]);
        GibberishFilter::new(Arc::new(lexicon), &GibberishConfig::default())
    }

    #[test]
    fn empty_and_whitespace_are_gibberish() {
        let f = filter();
        assert!(f.is_gibberish(""));
        assert!(f.is_gibberish("   \t\n"));
    }

    #[test]
    fn long_letter_run_is_always_gibberish() {
        let f = filter();
        assert!(f.is_gibberish("abcdefghij"));
        assert!(f.is_gibberish("Supercalifragilistic"));
        // Even a known word is rejected when it is the whole input
        let known = GibberishFilter::new(
            Arc::new(WordListLexicon::from_words(["departments"])),
            &GibberishConfig::default(),
        );
        assert!(known.is_gibberish("departments"));
    }

    #[test]
    fn whitelisted_and_filler_tokens_are_never_gibberish() {
        let f = filter();
        for text in ["ok", "hmm", "thx tay", "Who what when why", "um, ok.", "e.v.", "lah lor meh"] {
            assert!(!f.is_gibberish(text), "{text}");
        }
    }

    #[test]
    fn ordinary_sentence_passes() {
        assert!(!filter().is_gibberish("Hello there, tell me about the project team."));
    }

    #[test]
    fn keyboard_smash_is_rejected() {
        assert!(filter().is_gibberish("asdfghjk qwertyuiop zxcvbnmm"));
    }

    #[test]
    fn short_unknown_words_are_rescued() {
        // "blorp" is unknown but alphabetic and short
        assert!(!filter().is_gibberish("hello blorp there"));
    }

    #[test]
    fn ratio_threshold_is_strict() {
        // 1 of 4 tokens noisy = 0.25, under 0.3
        assert!(!filter().is_gibberish("hello there team x9x9x9x9"));
        // 2 of 4 = 0.5
        assert!(filter().is_gibberish("hello there x9x9x9x9 12345678"));
    }

    #[test]
    fn structural_kinds() {
        assert_eq!(structural_noise("asdfasdf"), NoiseKind::KeyboardSmash);
        assert_eq!(structural_noise("qweqwe"), NoiseKind::KeyboardSmash);
        assert_eq!(structural_noise("1234567"), NoiseKind::DigitRun);
        assert_eq!(structural_noise("abc123"), NoiseKind::MixedClasses);
        assert_eq!(structural_noise("o'neil"), NoiseKind::MixedClasses);
        assert_eq!(structural_noise("привет"), NoiseKind::Unknown);
    }

    #[test]
    fn punctuation_only_tokens() {
        let f = filter();
        assert_eq!(f.classify("?"), None);
        assert_eq!(f.classify("?!"), None);
        assert_eq!(f.classify("?!?"), Some(NoiseKind::SymbolsOnly));
    }

    #[test]
    fn known_words_pass_regardless_of_length() {
        assert_eq!(filter().classify("Employees?"), None);
        assert_eq!(filter().classify("department"), None);
    }

    #[test]
    fn lexicon_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words");
        std::fs::write(&path, "Apple\nbanana\n\n  cherry \n").unwrap();

        let lexicon = WordListLexicon::load(&path).unwrap();
        assert_eq!(lexicon.len(), 3);
        assert!(lexicon.is_known("APPLE"));
        assert!(lexicon.is_known("cherry"));
        assert!(!lexicon.is_known("durian"));
    }

    #[test]
    fn missing_lexicon_is_a_config_error() {
        let err = WordListLexicon::load(Path::new("/nonexistent/words")).unwrap_err();
        match err {
            ConfigError::MissingResource { path, .. } => assert_eq!(path, Path::new("/nonexistent/words")),
            other => panic!("expected MissingResource, got {other:?}"),
        }
    }
}
