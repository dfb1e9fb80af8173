//! AI-assisted analysis of one subject's comments.
//!
//! Two model calls per subject: a batch sentiment classification that must
//! come back as a JSON array, and a free-text bullet summary. A classification
//! reply that does not describe exactly one label per comment is replaced by
//! the all-Neutral fallback.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::analytics::{comments_for_subject, word_frequencies, WordWeight};
use crate::error::Result;
use crate::feedback::{FeedbackRecord, Subject};
use crate::gemini::{GenerationRequest, LanguageModel};

pub const NO_COMMENTS_SUMMARY: &str = "No comments to summarize.";
pub const WORD_CLOUD_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Positive, Sentiment::Negative, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positive",
            Sentiment::Negative => "Negative",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Sentiment::ALL
            .into_iter()
            .find(|sentiment| sentiment.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown sentiment: {}", wanted))
    }
}

/// Sentiment for the comment at 1-based position `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabeledComment {
    pub id: usize,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn from_labels(labels: &[LabeledComment]) -> Self {
        let mut counts = SentimentCounts::default();
        for label in labels {
            match label.sentiment {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Negative => counts.negative += 1,
                Sentiment::Neutral => counts.neutral += 1,
            }
        }
        counts
    }
}

// *************** Prompts ***************

fn single_line(comment: &str) -> String {
    comment.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn classification_prompt(comments: &[String]) -> String {
    let mut prompt = String::from(
        "Classify sentiment for each student feedback. \
         Return ONLY a JSON array of objects with keys: id (1-based) and sentiment. \
         Sentiment must be one of: Positive, Negative, Neutral. \
         DO NOT include any extra text.\n\nComments:\n",
    );
    for (i, comment) in comments.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, single_line(comment)));
    }
    prompt
}

pub fn classification_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "sentiment": {
                    "type": "STRING",
                    "enum": ["Positive", "Negative", "Neutral"]
                }
            },
            "required": ["id", "sentiment"]
        }
    })
}

pub fn summary_prompt(comments: &[String]) -> String {
    let listed: Vec<String> = comments.iter().map(|c| format!("- {}", single_line(c))).collect();
    format!(
        "Summarize the following student feedback into up to 5 concise bullet points. \
         Be neutral, short and include main themes only.\n\nComments:\n{}",
        listed.join("\n")
    )
}

// *************** Classification ***************

#[derive(Deserialize)]
struct RawLabel {
    id: usize,
    sentiment: String,
}

/// Parses a classification reply for `expected` comments. Returns `None`
/// unless the reply holds exactly one valid label for each id in `1..=expected`.
pub fn parse_labels(text: &str, expected: usize) -> Option<Vec<LabeledComment>> {
    let raw: Vec<RawLabel> = serde_json::from_str(text.trim()).ok()?;
    if raw.len() != expected {
        return None;
    }

    let mut labels = raw
        .into_iter()
        .map(|label| {
            Some(LabeledComment {
                id: label.id,
                sentiment: label.sentiment.parse().ok()?,
            })
        })
        .collect::<Option<Vec<_>>>()?;

    labels.sort_by_key(|label| label.id);
    labels
        .iter()
        .enumerate()
        .all(|(i, label)| label.id == i + 1)
        .then_some(labels)
}

pub fn neutral_fallback(count: usize) -> Vec<LabeledComment> {
    (1..=count)
        .map(|id| LabeledComment {
            id,
            sentiment: Sentiment::Neutral,
        })
        .collect()
}

/// Labels every comment. No request is made for an empty slice.
pub async fn classify_sentiments(
    model: &dyn LanguageModel,
    comments: &[String],
) -> Result<Vec<LabeledComment>> {
    if comments.is_empty() {
        return Ok(Vec::new());
    }

    let request = GenerationRequest::structured(classification_prompt(comments), classification_schema());
    let reply = model.generate(&request).await?;

    match parse_labels(&reply, comments.len()) {
        Some(labels) => Ok(labels),
        None => {
            warn!(
                comments = comments.len(),
                "Could not parse sentiment labels, falling back to Neutral"
            );
            Ok(neutral_fallback(comments.len()))
        }
    }
}

/// Bullet summary of `comments`, trimmed but otherwise as the model wrote it.
pub async fn summarize_comments(model: &dyn LanguageModel, comments: &[String]) -> Result<String> {
    if comments.is_empty() {
        return Ok(NO_COMMENTS_SUMMARY.to_string());
    }

    let reply = model.generate(&GenerationRequest::text(summary_prompt(comments))).await?;
    Ok(reply.trim().to_string())
}

// *************** Subject analysis ***************

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AiAnalysis {
    /// Nothing to send; the model was not called.
    NoComments,
    /// No API key configured.
    Unavailable,
    Complete {
        labels: Vec<LabeledComment>,
        counts: SentimentCounts,
        summary: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectAnalysis {
    pub subject: Subject,
    pub comments: Vec<String>,
    pub word_cloud: Vec<WordWeight>,
    pub ai: AiAnalysis,
}

pub async fn analyze_subject(
    model: Option<&dyn LanguageModel>,
    subject: Subject,
    records: &[FeedbackRecord],
) -> Result<SubjectAnalysis> {
    let comments = comments_for_subject(records, subject);
    let word_cloud = word_frequencies(&comments, WORD_CLOUD_SIZE);

    let ai = match model {
        _ if comments.is_empty() => AiAnalysis::NoComments,
        None => AiAnalysis::Unavailable,
        Some(model) => {
            info!(%subject, comments = comments.len(), "Requesting AI analysis");
            let (labels, summary) = tokio::try_join!(
                classify_sentiments(model, &comments),
                summarize_comments(model, &comments)
            )?;
            AiAnalysis::Complete {
                counts: SentimentCounts::from_labels(&labels),
                labels,
                summary,
            }
        }
    };

    Ok(SubjectAnalysis {
        subject,
        comments,
        word_cloud,
        ai,
    })
}
