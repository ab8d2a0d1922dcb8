//! Candidate extraction with Tailwind's Oxide extractor.
//!
//! Oxide's lexer understands the class-token grammar (arbitrary values,
//! stacked variants, `!` important, `/NN` modifiers), which keeps it from
//! reporting arbitrary prose words the way a regex would.
//!
//! An extractor must be initialized once before use. Calling
//! [`CandidateExtractor::get_candidates`] on an uninitialized extractor is an
//! error, so hosts can check [`CandidateExtractor::is_initialized`] first.

use rustc_hash::FxHashSet;
use std::sync::OnceLock;
use tailwindcss_oxide::extractor::{Extracted, Extractor};
use tracing::debug;

use crate::error::CandidateError;

const JS_KEYWORDS: &[&str] = &[
    "class", "function", "const", "let", "var", "if", "else", "for", "while", "return", "import",
    "export", "default", "async", "await", "try", "catch", "throw", "new", "this", "super",
    "extends", "implements", "interface", "type", "enum", "namespace", "module", "declare",
    "abstract", "static", "public", "private", "protected", "readonly", "get", "set", "of", "in",
    "instanceof", "typeof", "void", "null", "undefined", "true", "false", "break", "continue",
    "switch", "case", "do", "with", "debugger", "yield",
];

/// Extracts utility-class candidates from text.
#[derive(Debug, Default)]
pub struct CandidateExtractor {
    keywords: OnceLock<FxHashSet<String>>,
}

impl CandidateExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare the extractor. Idempotent.
    pub fn init(&self) {
        self.keywords.get_or_init(|| {
            debug!("initializing candidate extractor");
            JS_KEYWORDS.iter().map(|k| k.to_string()).collect()
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.keywords.get().is_some()
    }

    /// Extract deduplicated candidates from `fragments`, sorted.
    pub fn get_candidates<S: AsRef<str>>(&self, fragments: &[S]) -> Result<Vec<String>, CandidateError> {
        let keywords = self.keywords.get().ok_or(CandidateError::Uninitialized)?;

        let mut found = FxHashSet::default();
        for fragment in fragments {
            let text = fragment.as_ref();
            if text.is_empty() {
                continue;
            }
            let mut extractor = Extractor::new(text.as_bytes());
            for item in extractor.extract() {
                let Extracted::Candidate(bytes) = item else {
                    continue;
                };
                if let Ok(candidate) = std::str::from_utf8(bytes) {
                    if is_plausible_candidate(candidate, keywords) {
                        found.insert(candidate.to_string());
                    }
                }
            }
        }

        let mut candidates: Vec<String> = found.into_iter().collect();
        candidates.sort_unstable();
        Ok(candidates)
    }
}

/// Rejects tokens that are almost certainly not utilities: JS keywords and
/// bare PascalCase identifiers such as component names.
fn is_plausible_candidate(candidate: &str, keywords: &FxHashSet<String>) -> bool {
    if candidate.is_empty() || keywords.contains(&candidate.to_ascii_lowercase()) {
        return false;
    }

    let pascal_identifier = candidate.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && candidate.chars().all(|c| c.is_ascii_alphanumeric());
    !pascal_identifier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> CandidateExtractor {
        let extractor = CandidateExtractor::new();
        extractor.init();
        extractor
    }

    #[test]
    fn test_uninitialized_fails_fast() {
        let extractor = CandidateExtractor::new();
        assert!(!extractor.is_initialized());
        assert_eq!(
            extractor.get_candidates(&["p-4"]),
            Err(CandidateError::Uninitialized)
        );
    }

    #[test]
    fn test_init_is_idempotent() {
        let extractor = ready();
        extractor.init();
        assert!(extractor.is_initialized());
    }

    #[test]
    fn test_extracts_html_classes() {
        let candidates = ready()
            .get_candidates(&["<div class='text-red-500 p-4'></div>"])
            .unwrap();
        assert!(candidates.contains(&"text-red-500".to_string()));
        assert!(candidates.contains(&"p-4".to_string()));
        assert!(!candidates.contains(&"class".to_string()));
    }

    #[test]
    fn test_extracts_variants_and_arbitrary_values() {
        let candidates = ready()
            .get_candidates(&[r#"<a class="hover:bg-red-500 w-[12px] !font-bold bg-black/50">"#])
            .unwrap();
        for expected in ["hover:bg-red-500", "w-[12px]", "bg-black/50"] {
            assert!(candidates.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_dedup_across_fragments() {
        let candidates = ready().get_candidates(&["<p class=\"p-4\">", "<p class=\"p-4\">"]).unwrap();
        assert_eq!(candidates.iter().filter(|c| *c == "p-4").count(), 1);
    }

    #[test]
    fn test_reextraction_is_subset() {
        let extractor = ready();
        let texts = [
            r#"<section class="md:flex items-center gap-x-2 hover:underline">Hello World</section>"#,
            r#"{"className": "text-sm text-slate-500 dark:text-white"}"#,
        ];
        let first = extractor.get_candidates(&texts).unwrap();
        let second = extractor.get_candidates(&[first.join(" ")]).unwrap();
        for candidate in &second {
            assert!(first.contains(candidate), "{candidate} was invented by re-extraction");
        }
    }

    #[test]
    fn test_rejects_component_names() {
        let keywords = JS_KEYWORDS.iter().map(|k| k.to_string()).collect();
        assert!(!is_plausible_candidate("Button", &keywords));
        assert!(!is_plausible_candidate("return", &keywords));
        assert!(is_plausible_candidate("flex", &keywords));
    }
}
