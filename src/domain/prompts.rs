//! Prompt templates for transcript analysis
//!
//! Provides the base template for each meeting type, the category prefixes used by
//! the extractors, and the fixed notes returned when a stage cannot produce one.

use crate::domain::models::MeetingType;

/// Note used when the transcript is too thin to analyse.
pub const INSUFFICIENT_INFORMATION_NOTE: &str =
    "The transcript does not contain enough information to produce a meeting note.";

/// Note used when the run fails or is cancelled.
pub const ANALYSIS_FAILED_NOTE: &str =
    "The meeting could not be analysed. Please try again later.";

/// Note used when the note call itself fails.
pub const NOTE_GENERATION_ERROR: &str =
    "Sorry, an error occurred while generating the meeting note.";

/// Note used when the model answers with nothing.
pub const EMPTY_NOTE: &str = "Could not generate a note for this meeting.";

/// Extraction category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Tasks,
    Decisions,
    Questions,
}

/// Default prompt templates for each meeting type
pub struct PromptTemplates;

impl PromptTemplates {
    /// Base template for meetings with no particular focus
    pub fn general() -> &'static str {
        r#"You are an expert meeting analyst. The transcript below comes from a general meeting.
Focus on the main topics discussed, what was agreed, who committed to what, and anything left unresolved."#
    }

    /// Base template for project meetings
    pub fn project() -> &'static str {
        r#"You are an expert project meeting analyst. The transcript below comes from a project meeting.
Focus on milestones, progress against the plan, blockers, owners, deadlines and changes of scope."#
    }

    /// Base template for business meetings
    pub fn business() -> &'static str {
        r#"You are an expert business meeting analyst. The transcript below comes from a business meeting.
Focus on commercial outcomes, budgets, partners and customers, risks, and commitments made by each party."#
    }

    /// Base template for product meetings
    pub fn product() -> &'static str {
        r#"You are an expert product meeting analyst. The transcript below comes from a product meeting.
Focus on features, user problems, priorities, release plans, feedback and trade-offs that were discussed."#
    }

    /// Base template for reporting meetings
    pub fn report() -> &'static str {
        r#"You are an expert analyst of reporting meetings. The transcript below comes from a status or report meeting.
Focus on the figures and results presented, trends, explanations given, and follow-ups requested."#
    }

    /// Total mapping from meeting type to its base template
    pub fn for_type(meeting_type: MeetingType) -> &'static str {
        match meeting_type {
            MeetingType::General => Self::general(),
            MeetingType::Project => Self::project(),
            MeetingType::Business => Self::business(),
            MeetingType::Product => Self::product(),
            MeetingType::Report => Self::report(),
        }
    }

    /// Get all base templates
    pub fn all() -> Vec<(MeetingType, &'static str)> {
        MeetingType::ALL
            .into_iter()
            .map(|kind| (kind, Self::for_type(kind)))
            .collect()
    }

    /// Instruction prefix that narrows an extraction call to one category
    pub fn category_prefix(category: Category) -> &'static str {
        match category {
            Category::Tasks => {
                r#"Extract only TASKS, not decisions or questions. A task is a concrete piece of work someone agreed or was asked to do.
For each task give: description, assignee, deadline, priority (low, medium, high), status, relatedTopics and notes."#
            }
            Category::Decisions => {
                r#"Extract only DECISIONS, not tasks or questions. A decision is a conclusion the participants agreed on.
For each decision give: decision, impact, timeline, stakeholders, topics and nextSteps (tasks that follow from it)."#
            }
            Category::Questions => {
                r#"Extract only OPEN QUESTIONS, not tasks or decisions. Include questions raised during the meeting, whether or not they were answered.
For each question give: question, asker, answer, answered, topics, followUpActions, context and importance."#
            }
        }
    }

    /// Classification prompt. `{sample}` is replaced with the leading slice of the transcript.
    pub fn classifier() -> &'static str {
        r#"Classify the meeting below into exactly one of these categories: general, project, business, product, report.
Answer with the category name only.

Transcript excerpt:
{sample}"#
    }

    /// Speaker rules appended to every note prompt
    pub fn speaker_guidance() -> &'static str {
        r#"Identify speakers from what they say and how others address them, not from channel names or speaker tags such as "Speaker 1" or "spk_0".
List as participants only the people who actually speak. People who are merely mentioned are not participants."#
    }

    /// Builds the full note prompt: custom instruction first, then the base template.
    pub fn note_prompt(
        meeting_type: MeetingType,
        custom_instruction: Option<&str>,
        transcript: &str,
    ) -> String {
        let mut prompt = String::new();

        if let Some(instruction) = custom_instruction.map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str(
                "HIGHEST PRIORITY INSTRUCTIONS. Apply these before any guidance that follows and let them win on conflict:\n",
            );
            prompt.push_str(instruction);
            prompt.push_str("\n\n");
        }

        prompt.push_str(Self::for_type(meeting_type));
        prompt.push_str("\n\nWrite a narrative meeting note in markdown: participants, summary, key points and outcomes.\n");
        prompt.push_str(Self::speaker_guidance());
        prompt.push_str("\n\nMeeting Transcript:\n");
        prompt.push_str(transcript);
        prompt
    }

    /// Builds the full extraction prompt for one category.
    pub fn extraction_prompt(meeting_type: MeetingType, category: Category, transcript: &str) -> String {
        format!(
            "{}\n\n{}\n\nReply with a JSON object of the form {{\"items\": [...]}}. Use an empty list when there is nothing to extract.\n\nMeeting Transcript:\n{}",
            Self::for_type(meeting_type),
            Self::category_prefix(category),
            transcript
        )
    }
}
