//! Chunked delivery of a finished reply
//!
//! A reply is generated once, then either returned whole or replayed as
//! `start`, `token`* and `done` events.

use crate::assistant::types::ChatResponse;
use crate::knowledge::KnowledgeContext;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default maximum characters per token event
pub const DEFAULT_CHUNK_SIZE: usize = 400;

/// Greedy word packing: chunks are at most `max_chars` long unless a single
/// word is longer, and words are never split. Empty input yields `[""]`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return vec![String::new()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    if chunks.is_empty() {
        chunks.push(text.to_string());
    }
    chunks
}

/// One event of the streaming protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Start,
    Token {
        delta: String,
    },
    #[serde(rename_all = "camelCase")]
    Done {
        full_text: String,
        provider: String,
        timestamp: DateTime<Utc>,
        recommendations: Vec<String>,
        context: KnowledgeContext,
    },
}

/// The full event sequence for a finished chat response
pub fn response_events(response: &ChatResponse, chunk_size: usize) -> Vec<StreamEvent> {
    let mut events = vec![StreamEvent::Start];
    events.extend(
        chunk_text(&response.response, chunk_size)
            .into_iter()
            .map(|delta| StreamEvent::Token { delta }),
    );
    events.push(StreamEvent::Done {
        full_text: response.response.clone(),
        provider: response.provider.clone(),
        timestamp: response.timestamp,
        recommendations: response.recommendations.clone(),
        context: response.context.clone(),
    });
    events
}
