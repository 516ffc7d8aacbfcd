//! Prompt construction for cloud providers

use crate::assistant::types::ChatTurn;
use crate::knowledge::{ArtifactSummary, KnowledgeContext};

const PERSONA: &str = "You are DCCF AI, a doctoral research assistant for a single researcher. \
You give practical, concrete, next-step guidance grounded in the user’s Compass and research context. \
You speak in a warm, calm tone and keep paragraphs reasonably short.";

const HISTORY_TURNS: usize = 4;
const PROMPT_ARTIFACTS: usize = 5;

/// Persona plus a numbered list of the context's artifacts
pub fn system_prompt(artifacts: &[ArtifactSummary]) -> String {
    if artifacts.is_empty() {
        return PERSONA.to_string();
    }

    let listed: Vec<String> = artifacts
        .iter()
        .take(PROMPT_ARTIFACTS)
        .enumerate()
        .map(|(i, a)| {
            let kind = a.artifact_type.as_deref().unwrap_or("artifact");
            match a.description.as_deref().filter(|d| !d.is_empty()) {
                Some(d) => format!("{}. [{}] {} — {}", i + 1, kind, a.title, d),
                None => format!("{}. [{}] {}", i + 1, kind, a.title),
            }
        })
        .collect();

    format!(
        "{}\n\nRelevant research artifacts:\n{}",
        PERSONA,
        listed.join("\n")
    )
}

/// Sectioned user prompt: history, query, context, insights,
/// recommendations and the instruction block for the reply length.
pub fn user_prompt(message: &str, context: &KnowledgeContext, history: &[ChatTurn], rapid: bool) -> String {
    let history_text = if history.is_empty() {
        "No prior conversation context.".to_string()
    } else {
        let start = history.len().saturating_sub(HISTORY_TURNS);
        history[start..]
            .iter()
            .map(|turn| {
                let flattened = turn.content.split_whitespace().collect::<Vec<_>>().join(" ");
                format!("{}: {}", turn.role.as_str().to_uppercase(), flattened)
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let context_text = if context.context_summary.is_empty() {
        "[no additional context available]".to_string()
    } else {
        context.context_summary.clone()
    };

    let insights_text = if context.insights.is_empty() {
        "None explicitly stored.".to_string()
    } else {
        context
            .insights
            .iter()
            .map(|i| format!("- {}", i))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let recommendations_text = if context.recommendations.is_empty() {
        "No specific recommendations stored yet.".to_string()
    } else {
        context
            .recommendations
            .iter()
            .map(|r| format!("- ({}) {} — {}", r.priority.as_str(), r.action, r.reasoning))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let instructions: &[&str] = if rapid {
        &[
            "INSTRUCTIONS TO ASSISTANT (RAPID MODE):",
            "1. Respond in a supportive, practical, human tone.",
            "2. Use the knowledge context where it clearly helps.",
            "3. Prefer a compact answer (1–3 short paragraphs).",
            "4. If needed, give at most 3 concrete next steps.",
        ]
    } else {
        &[
            "INSTRUCTIONS TO ASSISTANT:",
            "1. Respond in a supportive, practical, human tone.",
            "2. Use the knowledge context where it clearly helps.",
            "3. Prefer concrete next steps over generic advice.",
            "4. Keep answers focused and avoid unnecessary repetition.",
            "5. If the question is vague, ask 1–2 clarifying questions before giving a long plan.",
        ]
    };

    let mut sections = vec![
        "CONVERSATION HISTORY (most recent turns):".to_string(),
        history_text,
        String::new(),
        "USER QUERY:".to_string(),
        message.to_string(),
        String::new(),
        "KNOWLEDGE CONTEXT (from Compass + Research Hub + artifacts):".to_string(),
        context_text,
        String::new(),
        "SYSTEM INSIGHTS:".to_string(),
        insights_text,
        String::new(),
        "SYSTEM RECOMMENDATIONS:".to_string(),
        recommendations_text,
        String::new(),
    ];
    sections.extend(instructions.iter().map(|s| s.to_string()));
    sections.join("\n")
}
