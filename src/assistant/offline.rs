//! Offline scholar: deterministic templated replies
//!
//! Picks one of five voices from the message intent and renders a rapid
//! (single paragraph) or full (multi-line) reply. The same inputs always
//! produce the same text.

use crate::assistant::intent::{
    context_line, lateral_theme, recognise_patterns, Intent, IntentClassifier,
};
use crate::error::Result;
use crate::knowledge::{ArtifactSummary, KnowledgeContext};

/// Reply used when a message is empty after trimming
pub const EMPTY_MESSAGE_REPLY: &str =
    "I didn’t receive a clear question. Try saying what feels stuck right now in one short sentence.";

/// Voice of an offline reply, named in its signoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Welcome,
    Compass,
    Methods,
    Stabiliser,
    Navigator,
}

impl Voice {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Welcome => "Welcome",
            Self::Compass => "Compass",
            Self::Methods => "Methods",
            Self::Stabiliser => "Stabiliser",
            Self::Navigator => "Navigator",
        }
    }

    /// Branch priority: greeting (only without gap/method), gap, method,
    /// overwhelm, general.
    pub fn select(intent: &Intent) -> Self {
        if intent.greeting && !intent.gap && !intent.method {
            Self::Welcome
        } else if intent.gap {
            Self::Compass
        } else if intent.method {
            Self::Methods
        } else if intent.overwhelm {
            Self::Stabiliser
        } else {
            Self::Navigator
        }
    }

    fn signoff(&self) -> String {
        format!("\n\n— {} · offline scholar mode", self.label())
    }
}

/// Deterministic responder used offline and as the cloud fallback
pub struct OfflineResponder {
    classifier: IntentClassifier,
}

impl OfflineResponder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            classifier: IntentClassifier::new()?,
        })
    }

    /// Render a reply for `message`.
    ///
    /// `recent_user_turns` are the user's previous messages, oldest first;
    /// only the last three are considered.
    pub fn respond(
        &self,
        message: &str,
        recent_user_turns: &[String],
        context: &KnowledgeContext,
        rapid: bool,
    ) -> String {
        let message = message.trim();
        if message.is_empty() {
            return EMPTY_MESSAGE_REPLY.to_string();
        }

        let intent = self.classifier.classify(message);
        let voice = Voice::select(&intent);
        let ctx_line = context_line(context);

        let body = match voice {
            Voice::Welcome => welcome(ctx_line.as_deref(), rapid),
            Voice::Compass => gap(ctx_line.as_deref(), rapid),
            Voice::Methods => methods(rapid),
            Voice::Stabiliser => stabiliser(ctx_line.as_deref(), rapid),
            Voice::Navigator => {
                let start = recent_user_turns.len().saturating_sub(3);
                let patterns = recognise_patterns(message, &recent_user_turns[start..]);
                let keywords = self.classifier.extract_keywords(message);
                navigator(
                    patterns[0],
                    &keywords,
                    lateral_theme(message, context),
                    ctx_line.as_deref(),
                    rapid,
                )
            }
        };

        body + &voice.signoff()
    }
}

fn welcome(ctx_line: Option<&str>, rapid: bool) -> String {
    if rapid {
        return [
            "Hey, I’m here and tuned in to where your research is right now.",
            "In one quick line, what is pressing most: the gap, the methods, or the weight of everything?",
        ]
        .join(" ");
    }

    let mut lines = vec!["Hey, I’m right here with you on this journey."];
    lines.extend(ctx_line);
    lines.extend([
        "",
        "In one short sentence, what is bothering you most right now:",
        "• the **gap** (what feels unclear in the literature),",
        "• the **methods** (how to study it), or",
        "• the **overall load** (time, energy, life piling up)?",
    ]);
    lines.join("\n")
}

fn gap(ctx_line: Option<&str>, rapid: bool) -> String {
    if rapid {
        return [
            "Let’s make your gap sharp and plain.",
            "Send two rough lines:",
            "1) “The real situation that keeps bothering me is…”",
            "2) “Most studies assume that…, but in practice…”",
            "We’ll trim that into a clean, publishable gap.",
        ]
        .join(" ");
    }

    let mut lines = vec![
        "Let’s work directly on the gap: the small mismatch between what the literature assumes and what reality keeps doing.",
    ];
    lines.extend(ctx_line);
    lines.extend([
        "",
        "Reply with two honest lines (wording does not matter yet):",
        "1. **Problem (real world):** “The situation that keeps bothering me is…”",
        "2. **Gap (research):** “Most studies assume that…, but in practice…”",
        "",
        "Once you send those, we’ll tighten the language into a journal-ready gap statement.",
    ]);
    lines.join("\n")
}

fn methods(rapid: bool) -> String {
    if rapid {
        return [
            "Methods feel confusing when your question, worldview and tools are not aligned yet, which is very normal.",
            "Paste your main research question and tell me which opener fits: “How do…”, “To what extent does…”, or “What is the relationship between…”. We’ll snap the design into place from there.",
        ]
        .join(" ");
    }

    [
        "Method confusion usually means your question, worldview and tools are slightly out of sync, not that you are doing it wrong.",
        "",
        "A quick map:",
        "- Asking **“How do people experience…?”** puts you in qualitative territory.",
        "- Asking **“Does X change Y…?”** puts you in experimental or quasi-experimental territory.",
        "- Asking **“What is the relationship between A and B…?”** puts you in correlational or regression territory.",
        "",
        "Send me:",
        "1. Your current main research question (messy is fine).",
        "2. Which opener feels closest: “How do…”, “To what extent does…”, or “What is the relationship between…”.",
        "",
        "From those two pieces we’ll realign the design so it fits your project.",
    ]
    .join("\n")
}

fn stabiliser(ctx_line: Option<&str>, rapid: bool) -> String {
    if rapid {
        let mut pieces = vec!["Feeling overloaded is data, not a personal failure."];
        pieces.extend(ctx_line);
        pieces.push(
            "Finish two lines for me: “Right now, the hardest part is…” and “If I could fix ONE thing this week, it would be…”. We’ll turn that into one concrete next step.",
        );
        return pieces.join(" ");
    }

    let mut lines = vec![
        "Feeling overwhelmed is part of doing serious work; your system is holding too much at once.",
    ];
    lines.extend(ctx_line);
    lines.extend([
        "",
        "Let’s narrow the field:",
        "• Finish this in your own words: **“Right now, the hardest part of my research is…”**",
        "• Then add: **“If I could fix just ONE thing this week, it would be…”**",
        "",
        "Send those two lines and we’ll turn them into a single realistic move for this week.",
    ]);
    lines.join("\n")
}

fn navigator(
    pattern: &str,
    keywords: &[String],
    theme: &str,
    ctx_line: Option<&str>,
    rapid: bool,
) -> String {
    let keyword_line = (!keywords.is_empty()).then(|| {
        let quoted: Vec<String> = keywords.iter().map(|k| format!("\"{}\"", k)).collect();
        format!("The core signals I’m picking up are: {}.", quoted.join(", "))
    });

    if rapid {
        let mut pieces = vec![format!(
            "Your question shows **{}**: you are circling something real, not wandering.",
            pattern
        )];
        pieces.extend(ctx_line.map(str::to_string));
        pieces.extend(keyword_line);
        pieces.push(format!(
            "One sideways angle here is **{}**, the deeper structure your thinking is already touching.",
            theme
        ));
        pieces.push(
            "Complete this sentence: **“What I’m really trying to figure out is…”** and send it. We’ll set the Compass from there."
                .to_string(),
        );
        return pieces.join(" ");
    }

    let mut lines = vec![format!(
        "Your question shows **{}**: your thinking is orbiting a real structure, even if it still feels foggy.",
        pattern
    )];
    lines.extend(ctx_line.map(str::to_string));
    lines.extend(keyword_line);
    lines.push(format!(
        "A lateral reading of this is **{}**; there is a pattern underneath that the usual literature does not quite name.",
        theme
    ));
    lines.extend(
        [
            "",
            "Reply with one sentence that starts with:",
            "• **“What I’m really trying to figure out is…”**",
            "",
            "We’ll use that line to tighten your Compass instead of floating in abstract discussion.",
        ]
        .map(str::to_string),
    );
    lines.join("\n")
}

/// Static last-resort reply quoting the question with numbered next steps
pub fn fallback_reply(question: &str, artifacts: &[ArtifactSummary]) -> String {
    let snapshot = if artifacts.is_empty() {
        "• No research artifacts were supplied with this question.".to_string()
    } else {
        artifacts
            .iter()
            .take(3)
            .enumerate()
            .map(|(i, a)| {
                let kind = a.artifact_type.as_deref().unwrap_or("Artifact");
                match a.description.as_deref().filter(|d| !d.is_empty()) {
                    Some(d) => format!("{}. [{}] {} — {}", i + 1, kind, a.title, d),
                    None => format!("{}. [{}] {}", i + 1, kind, a.title),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    [
        "I’m answering with the local DCCF reasoning engine (no external model was available).".to_string(),
        String::new(),
        "You asked:".to_string(),
        format!("> {}", question),
        String::new(),
        "Snapshot of the research context I can see:".to_string(),
        snapshot,
        String::new(),
        "Suggested next steps:".to_string(),
        "1. Clarify the exact output you want (summary, structure, critique, next steps, methods).".to_string(),
        "2. If the question is about a specific artifact, mention its title so I can hook into it.".to_string(),
        "3. Configure an OpenAI, DeepSeek or Gemini API key to upgrade this answer to a model-powered one.".to_string(),
    ]
    .join("\n")
}
