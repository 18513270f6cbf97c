//! Heuristic routing between the synchronous and streaming transports.
//!
//! A user turn that reads like a code-generation request goes over the
//! incremental stream (the backend answers those with the multi-file
//! sub-protocol); everything else takes the ordinary request/response path.
//! The phrase list grew organically; misclassification only costs the less
//! suitable transport, never a lost message.

/// Phrases that route to the streaming transport on their own.
const TRIGGER_PHRASES: &[&str] = &[
    "generate code",
    "generate the code",
    "write code",
    "write the code",
    "write a program",
    "code this up",
    "scaffold",
    "boilerplate",
];

/// Action verbs that pair with an artifact noun below.
const ACTION_VERBS: &[&str] = &[
    "build", "create", "generate", "write", "implement", "make", "code",
];

/// Project/artifact nouns that pair with an action verb above.
const ARTIFACT_NOUNS: &[&str] = &[
    "project", "app", "application", "component", "module", "script",
    "website", "webpage", "api", "crate", "file", "files", "program",
    "function", "class",
];

/// Decide whether a user turn is a code-generation request.
///
/// Pure and replaceable: direct trigger phrases match first, then the
/// combination of an action verb and an artifact noun anywhere in the turn.
pub fn is_code_generation_request(text: &str) -> bool {
    let lowered = text.to_lowercase();

    if TRIGGER_PHRASES.iter().any(|phrase| lowered.contains(phrase)) {
        return true;
    }

    let has_verb = ACTION_VERBS.iter().any(|verb| contains_word(&lowered, verb));
    let has_noun = ARTIFACT_NOUNS.iter().any(|noun| contains_word(&lowered, noun));
    has_verb && has_noun
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| !c.is_alphanumeric()))
        .any(|token| token == word)
}
