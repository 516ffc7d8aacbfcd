//! Intent classification and conversational signal extraction
//!
//! Cheap, deterministic heuristics that let the offline responder pick a
//! voice and flavour its reply without a model.

use crate::error::{Error, Result};
use crate::knowledge::KnowledgeContext;
use regex::Regex;

const STOP_WORDS: &[&str] = &[
    "the", "and", "but", "for", "with", "this", "that", "what", "when", "from", "into", "your",
    "about", "then",
];

const MAX_KEYWORDS: usize = 5;
const RECURSION_PREFIX_CHARS: usize = 18;

const NEGATIONS: &[&str] = &["not", "never", "without", "no "];
const AFFIRMATIONS: &[&str] = &["is", "has", "does", "will", "can"];

/// Fallback label when no conversational pattern is detected
pub const DEFAULT_PATTERN: &str = "emergent coherence";

const LATERAL_THEMES: [&str; 6] = [
    "emergent system design",
    "cognitive architecture of research habits",
    "pattern language evolution",
    "ontological engineering",
    "post-disciplinary methodology",
    "practice-anchored theory building",
];

/// Intent flags for one message; several may be set at once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    pub greeting: bool,
    pub gap: bool,
    pub method: bool,
    pub overwhelm: bool,
    pub question: bool,
}

/// Keyword and regex based classifier
pub struct IntentClassifier {
    question_opener: Regex,
    non_word: Regex,
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        let question_opener = Regex::new(r"(?i)^(how|what|why|when|where|who|should|can)\b")
            .map_err(|e| Error::Internal(format!("Invalid question pattern: {}", e)))?;
        let non_word = Regex::new(r"[^\w\s]")
            .map_err(|e| Error::Internal(format!("Invalid keyword pattern: {}", e)))?;
        Ok(Self {
            question_opener,
            non_word,
        })
    }

    pub fn classify(&self, message: &str) -> Intent {
        let lower = message.to_lowercase();
        let has_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        Intent {
            greeting: lower.starts_with("hi ")
                || lower.starts_with("hi,")
                || lower.starts_with("hello")
                || lower.contains("how are you"),
            gap: has_any(&["gap", "research gap", "missing"]),
            method: has_any(&["methodology", "method", "design", "sample", "data collection"]),
            overwhelm: has_any(&["overwhelmed", "stressed", "stuck", "confused", "lost"]),
            question: lower.contains('?') || self.question_opener.is_match(message),
        }
    }

    /// Up to five distinct content words longer than three characters
    pub fn extract_keywords(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let cleaned = self.non_word.replace_all(&lower, " ");

        let mut keywords: Vec<String> = Vec::new();
        for word in cleaned.split_whitespace() {
            if word.chars().count() <= 3 || STOP_WORDS.contains(&word) {
                continue;
            }
            if !keywords.iter().any(|k| k == word) {
                keywords.push(word.to_string());
            }
            if keywords.len() == MAX_KEYWORDS {
                break;
            }
        }
        keywords
    }
}

/// Detect conversational patterns between the current message and the
/// user's previous turns (oldest first). Never empty.
pub fn recognise_patterns(current: &str, previous: &[String]) -> Vec<&'static str> {
    let mut patterns = Vec::new();
    let last = previous.last().map(String::as_str).unwrap_or("");
    let current_lower = current.to_lowercase();

    if !last.is_empty() && !current.is_empty() {
        let prefix: String = current_lower.chars().take(RECURSION_PREFIX_CHARS).collect();
        if last.to_lowercase().contains(&prefix) {
            patterns.push("recursive inquiry");
        }
    }

    let current_len = current.chars().count() as f64;
    let last_len = last.chars().count() as f64;
    if last_len > 0.0 && current_len > last_len * 1.5 {
        patterns.push("conceptual expansion");
    }

    let negated = NEGATIONS.iter().any(|w| current_lower.contains(w));
    let affirmed = AFFIRMATIONS.iter().any(|w| current_lower.contains(w));
    if negated && affirmed {
        patterns.push("dialectical tension");
    }

    if patterns.is_empty() {
        patterns.push(DEFAULT_PATTERN);
    }
    patterns
}

/// Pick one of six lateral themes from message length and context size
pub fn lateral_theme(message: &str, context: &KnowledgeContext) -> &'static str {
    let base = message.chars().count() + context.artifacts.len() * 7 + context.insights.len() * 13;
    LATERAL_THEMES[base % LATERAL_THEMES.len()]
}

/// One line acknowledging existing artifacts and insights, if any
pub fn context_line(context: &KnowledgeContext) -> Option<String> {
    let artifacts = context.artifacts.len();
    let insights = context.insights.len();
    match (artifacts, insights) {
        (0, 0) => None,
        (a, 0) => Some(format!(
            "You already have {} artifacts in the system, so there is more groundwork here than it feels.",
            a
        )),
        (0, i) => Some(format!(
            "You already have {} stored insights, so we can build on those instead of starting from scratch.",
            i
        )),
        (a, i) => Some(format!(
            "You already have {} artifacts and {} insights in play, so your system is not starting from zero.",
            a, i
        )),
    }
}
