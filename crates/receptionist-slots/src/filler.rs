//! Filler/vocabulary preprocessor (spec.md §2 "strips fillers, translates
//! trade slang via tenant+template dictionaries"). Runs before the
//! deterministic intercepts on every turn; may legitimately reduce the
//! text to nothing (handled downstream by the silence intercept).

use std::collections::HashMap;

use receptionist_core::config::{CallerVocabulary, FillerWords};

const BUILTIN_FILLERS: &[&str] = &["um", "uh", "uhh", "umm", "like", "you know", "i mean", "so"];

/// Strip leading/trailing filler words and apply the tenant's trade-slang
/// synonym map. Word-boundary substring replacement — short enough
/// dictionaries that a linear scan per turn is cheap.
pub fn preprocess(text: &str, filler_words: &FillerWords, vocabulary: &CallerVocabulary) -> String {
    let stripped = strip_fillers(text, filler_words);
    apply_synonyms(&stripped, &vocabulary.synonym_map)
}

fn strip_fillers(text: &str, filler_words: &FillerWords) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    let is_filler = |tok: &str| {
        let clean = tok.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        BUILTIN_FILLERS.contains(&clean.as_str())
            || filler_words.custom.iter().any(|f| f.eq_ignore_ascii_case(&clean))
    };

    while tokens.first().map(|t| is_filler(t)).unwrap_or(false) {
        tokens.remove(0);
    }
    while tokens.last().map(|t| is_filler(t)).unwrap_or(false) {
        tokens.pop();
    }
    tokens.join(" ")
}

fn apply_synonyms(text: &str, synonym_map: &HashMap<String, String>) -> String {
    if synonym_map.is_empty() {
        return text.to_string();
    }
    let words: Vec<String> = text
        .split_whitespace()
        .map(|tok| {
            let key = tok.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            synonym_map.get(&key).cloned().unwrap_or_else(|| tok.to_string())
        })
        .collect();
    words.join(" ")
}

/// Is this text effectively silence (spec.md §4.4 #1): empty, punctuation-
/// only, or at most one alphanumeric character?
pub fn is_effectively_silent(text: &str) -> bool {
    text.chars().filter(|c| c.is_alphanumeric()).count() <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_and_trailing_fillers() {
        let fw = FillerWords::default();
        let vocab = CallerVocabulary::default();
        let out = preprocess("um so my ac is broken you know", &fw, &vocab);
        assert_eq!(out, "my ac is broken");
    }

    #[test]
    fn applies_tenant_synonym_map() {
        let fw = FillerWords::default();
        let mut vocab = CallerVocabulary::default();
        vocab.synonym_map.insert("furnace".to_string(), "heater".to_string());
        let out = preprocess("my furnace is loud", &fw, &vocab);
        assert_eq!(out, "my heater is loud");
    }

    #[test]
    fn silence_detection_allows_single_character() {
        assert!(is_effectively_silent(""));
        assert!(is_effectively_silent("..."));
        assert!(is_effectively_silent("uh"[..1].to_string().as_str()));
        assert!(!is_effectively_silent("hi"));
    }
}
