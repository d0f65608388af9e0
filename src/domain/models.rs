/// Domain models for Meet Scribe transcript analysis
///
/// These models are provider-agnostic and describe what goes into and comes out of
/// one pipeline run.
use serde::{Deserialize, Serialize};

/// Category of a meeting, used to pick the prompt templates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeetingType {
    #[default]
    General,
    Project,
    Business,
    Product,
    Report,
}

impl MeetingType {
    pub const ALL: [MeetingType; 5] = [
        MeetingType::General,
        MeetingType::Project,
        MeetingType::Business,
        MeetingType::Product,
        MeetingType::Report,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingType::General => "general",
            MeetingType::Project => "project",
            MeetingType::Business => "business",
            MeetingType::Product => "product",
            MeetingType::Report => "report",
        }
    }

    /// Maps a free-form label onto the closed set. Anything unrecognized is `General`.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(label))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for MeetingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the caller hands to the pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptInput {
    pub transcript: String,
    pub meeting_type_hint: Option<String>,
    pub custom_instruction: Option<String>,
}

impl TranscriptInput {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Default::default()
        }
    }

    /// Sets the meeting type hint (builder pattern)
    pub fn with_meeting_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.meeting_type_hint = Some(hint.into());
        self
    }

    /// Sets the custom note instruction (builder pattern)
    pub fn with_custom_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.custom_instruction = Some(instruction.into());
        self
    }
}

/// A task pulled out of the transcript. Every field is filled after normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub description: String,
    pub assignee: String,
    pub deadline: String,
    pub priority: String,
    pub status: String,
    pub related_topics: Vec<String>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDecision {
    pub topics: Vec<String>,
    pub decision: String,
    pub impact: String,
    #[serde(default)]
    pub timeline: Option<String>,
    pub stakeholders: Vec<String>,
    #[serde(default)]
    pub next_steps: Option<Vec<ExtractedTask>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedQuestion {
    pub question: String,
    #[serde(default)]
    pub asker: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    pub answered: bool,
    pub topics: Vec<String>,
    pub follow_up_actions: Vec<ExtractedTask>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub importance: Option<String>,
}

/// Token and cost totals for one run
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub context_tokens: u64,
    pub total_tokens: u64,
    pub cost_estimate: f64,
}

/// The record produced by every run, successful or not
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutput {
    pub note: String,
    pub tasks: Vec<ExtractedTask>,
    pub decisions: Vec<ExtractedDecision>,
    pub questions: Vec<ExtractedQuestion>,
    pub usage: UsageRecord,
    pub is_informative: bool,
    pub meeting_type: String,
}

impl AnalysisOutput {
    /// Output with no extractions, used by the gate short-circuit and by every
    /// degraded path.
    pub fn empty(note: impl Into<String>, meeting_type: impl Into<String>, usage: UsageRecord) -> Self {
        Self {
            note: note.into(),
            tasks: Vec::new(),
            decisions: Vec::new(),
            questions: Vec::new(),
            usage,
            is_informative: false,
            meeting_type: meeting_type.into(),
        }
    }
}
