//! Pure slot extractors (spec.md §4.1). No session mutation, no I/O —
//! every function is `text (+ context flags) -> Option<Extracted*>`.
//! Extraction is conservative: when in doubt, return `None`.

/// A successful name extraction (spec.md §4.1 "Output: `{name, matchedPattern}`").
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedName {
    pub name: String,
    pub matched_pattern: &'static str,
    pub confidence: f32,
}

const NAME_PATTERN_PREFIXES: &[(&str, &str)] = &[
    ("my name is ", "my_name_is"),
    ("last name is ", "last_name_is"),
    ("this is ", "this_is"),
    ("that's ", "thats"),
    ("that is ", "that_is"),
    ("it's ", "its"),
    ("it is ", "it_is"),
];

fn titlecase(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

fn looks_capitalizable(token: &str) -> bool {
    token.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-') && !token.is_empty()
}

/// Extract a caller name from free text (spec.md §4.1 Name extraction).
pub fn extract_name(
    text: &str,
    expecting_name: bool,
    stop_words: &[String],
    common_first_names: &[String],
    already_collected: &[&str],
) -> Option<ExtractedName> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_lowercase();

    // Prefer explicit patterns first — highest-confidence signal.
    for (prefix, pattern) in NAME_PATTERN_PREFIXES {
        if let Some(rest) = lower.strip_prefix(prefix) {
            let candidate = strip_trailing_punct(trimmed[trimmed.len() - rest.len()..].trim());
            if candidate.is_empty() {
                continue;
            }
            let titled: Vec<String> = candidate.split_whitespace().map(titlecase).collect();
            let joined = titled.join(" ");
            if already_collected.iter().any(|c| c.eq_ignore_ascii_case(&joined)) {
                continue;
            }
            return Some(ExtractedName {
                name: joined,
                matched_pattern: pattern,
                confidence: 0.95,
            });
        }
    }

    if !expecting_name {
        return None;
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() > 2 {
        return None;
    }
    for token in &tokens {
        let clean = strip_trailing_punct(token).to_lowercase();
        if stop_words.iter().any(|sw| sw.eq_ignore_ascii_case(&clean)) {
            return None;
        }
        if !looks_capitalizable(&strip_trailing_punct(token)) {
            return None;
        }
    }

    let titled: Vec<String> = tokens
        .iter()
        .map(|t| titlecase(&strip_trailing_punct(t)))
        .collect();
    let joined = titled.join(" ");
    if already_collected.iter().any(|c| c.eq_ignore_ascii_case(&joined)) {
        return None;
    }

    let confidence = if tokens.len() == 1 {
        if common_first_names
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&titled[0]))
        {
            0.7
        } else {
            0.55
        }
    } else {
        0.85
    };

    Some(ExtractedName {
        name: joined,
        matched_pattern: "expecting_name_bare_tokens",
        confidence,
    })
}

fn strip_trailing_punct(s: &str) -> &str {
    s.trim_end_matches(|c: char| c.is_ascii_punctuation())
}

/// A single bare token that could plausibly be a first or last name, along
/// with a guess at which (spec.md §4.1 "mark it as assumed-first;
/// otherwise assumed-last").
pub fn is_common_first_name(token: &str, common_first_names: &[String]) -> bool {
    common_first_names.iter().any(|n| n.eq_ignore_ascii_case(token))
}

// ---------------------------------------------------------------------------
// Phone
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPhone {
    pub digits: String,
    pub confidence: f32,
}

const STREET_TYPE_WORDS: &[&str] = &[
    "street", "st", "avenue", "ave", "boulevard", "blvd", "road", "rd", "drive", "dr", "lane",
    "ln", "court", "ct", "way", "circle", "cir", "place", "pl", "parkway", "pkwy", "terrace",
    "highway", "hwy", "trail",
];

/// Extract a US phone number (spec.md §4.1 Phone extraction): accepts
/// 7/10/11-digit patterns, tolerates punctuation, and rejects digits that
/// look like an address street number (a street-type word nearby).
pub fn extract_phone(text: &str) -> Option<ExtractedPhone> {
    let lower = text.to_lowercase();
    if STREET_TYPE_WORDS.iter().any(|w| lower.split_whitespace().any(|t| t.trim_matches(|c: char| !c.is_alphanumeric()) == *w)) {
        return None;
    }

    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.len() {
        11 if digits.starts_with('1') => Some(ExtractedPhone {
            digits: digits[1..].to_string(),
            confidence: 0.95,
        }),
        10 => Some(ExtractedPhone {
            digits,
            confidence: 0.95,
        }),
        7 => Some(ExtractedPhone {
            digits,
            confidence: 0.6,
        }),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedAddress {
    pub street: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub confidence: f32,
}

const TIME_PHRASE_MARKERS: &[&str] = &["weeks ago", "yesterday", "last week", "days ago", "months ago"];

const ADDRESS_PREFIXES: &[&str] = &["yeah my address is ", "my address is ", "it's ", "its "];

/// Extract a street address (spec.md §4.1 Address extraction).
pub fn extract_address(text: &str) -> Option<ExtractedAddress> {
    let lower = text.to_lowercase();
    if TIME_PHRASE_MARKERS.iter().any(|m| lower.contains(m)) {
        return None;
    }

    let mut stripped = text.trim();
    for prefix in ADDRESS_PREFIXES {
        if lower.starts_with(prefix) {
            stripped = stripped[prefix.len()..].trim();
            break;
        }
    }

    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    // Street number: 1-5 digits as the first token.
    let first = tokens[0];
    if !(1..=5).contains(&first.len()) || !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let has_street_type = tokens.iter().any(|t| {
        let clean = t.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        STREET_TYPE_WORDS.contains(&clean.as_str())
    });
    if !has_street_type {
        return None;
    }

    // ZIP: a standalone 5-digit token that is NOT the street number.
    let zip = tokens
        .iter()
        .skip(1)
        .find(|t| t.len() == 5 && t.chars().all(|c| c.is_ascii_digit()))
        .map(|t| t.to_string());

    let state = US_STATE_ABBREVS
        .iter()
        .find(|abbr| tokens.iter().any(|t| t.eq_ignore_ascii_case(abbr)))
        .map(|s| s.to_string());

    let confidence = if zip.is_some() || state.is_some() { 0.9 } else { 0.7 };

    Some(ExtractedAddress {
        street: stripped.to_string(),
        city: None,
        state,
        zip,
        confidence,
    })
}

const US_STATE_ABBREVS: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MD", "MA", "MI", "MN", "MS", "MO", "MT", "NE", "NV", "NH", "NJ",
    "NM", "NY", "NC", "ND", "OH", "OK", "OR", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT",
    "VA", "WA", "WV", "WI", "WY",
];

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTime {
    pub is_asap: bool,
    pub day_preference: Option<String>,
    pub window: Option<String>,
    pub specific: Option<String>,
    pub confidence: f32,
}

const GREETINGS: &[&str] = &["good morning", "good afternoon", "good evening"];
const ASAP_PATTERNS: &[&str] = &[
    "as soon as possible",
    "asap",
    "earliest",
    "right away",
    "today if possible",
];

/// Extract a scheduling-time preference (spec.md §4.1 Time extraction).
pub fn extract_time(text: &str) -> Option<ExtractedTime> {
    let lower = text.to_lowercase();
    if GREETINGS.iter().any(|g| lower.starts_with(g)) {
        return None;
    }
    if extract_phone(text).is_some() {
        return None;
    }
    if lower.contains("what is asap") || lower.contains("what does asap mean") {
        return None;
    }

    if ASAP_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Some(ExtractedTime {
            is_asap: true,
            day_preference: None,
            window: None,
            specific: None,
            confidence: 0.9,
        });
    }

    let day_preference = if lower.contains("tomorrow") {
        Some("tomorrow".to_string())
    } else if lower.contains("today") {
        Some("today".to_string())
    } else if lower.contains("this week") {
        Some("this_week".to_string())
    } else {
        None
    };

    let window = ["morning", "afternoon", "evening"]
        .iter()
        .find(|w| lower.contains(*w))
        .map(|w| w.to_string());

    // Specific clock time requires an AM/PM marker or an "at/around/by"
    // prefix, to disambiguate from a bare number that might be a street
    // address digit sequence.
    let specific = extract_clock_time(&lower);

    if day_preference.is_none() && window.is_none() && specific.is_none() {
        return None;
    }

    let confidence = if specific.is_some() { 0.85 } else { 0.65 };

    Some(ExtractedTime {
        is_asap: false,
        day_preference,
        window,
        specific,
        confidence,
    })
}

fn extract_clock_time(lower: &str) -> Option<String> {
    for prefix in ["at ", "around ", "by "] {
        if let Some(pos) = lower.find(prefix) {
            let rest = &lower[pos + prefix.len()..];
            let token: String = rest
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == ':' || c.is_alphabetic())
                .collect();
            if !token.is_empty() {
                return Some(token);
            }
        }
    }
    for marker in ["am", "pm"] {
        if let Some(pos) = lower.find(marker) {
            let start = lower[..pos].rfind(char::is_whitespace).map(|p| p + 1).unwrap_or(0);
            let token = &lower[start..(pos + marker.len()).min(lower.len())];
            if token.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                return Some(token.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_explicit_pattern_wins_over_stop_words() {
        let out = extract_name("my name is Mark", false, &[], &[], &[]).unwrap();
        assert_eq!(out.name, "Mark");
        assert_eq!(out.matched_pattern, "my_name_is");
    }

    #[test]
    fn name_rejects_stop_word_token() {
        let stop_words = vec!["hvac".to_string()];
        assert!(extract_name("hvac", true, &stop_words, &[], &[]).is_none());
    }

    #[test]
    fn name_rejects_duplicate_of_collected_part() {
        assert!(extract_name("Mark", true, &[], &[], &["Mark"]).is_none());
    }

    #[test]
    fn phone_rejects_address_context() {
        assert!(extract_phone("123 Main Street").is_none());
    }

    #[test]
    fn phone_accepts_ten_digits() {
        let out = extract_phone("239-555-0199").unwrap();
        assert_eq!(out.digits, "2395550199");
    }

    #[test]
    fn address_requires_street_type_word() {
        assert!(extract_address("239 5550199").is_none());
        let out = extract_address("123 Main Street").unwrap();
        assert_eq!(out.street, "123 Main Street");
    }

    #[test]
    fn address_rejects_time_phrase() {
        assert!(extract_address("2 weeks ago").is_none());
    }

    #[test]
    fn time_asap_detected() {
        let out = extract_time("as soon as possible please").unwrap();
        assert!(out.is_asap);
    }

    #[test]
    fn time_rejects_greeting() {
        assert!(extract_time("good morning").is_none());
    }

    #[test]
    fn time_rejects_asap_question() {
        assert!(extract_time("what is asap").is_none());
    }
}
