//! Run state and stage transitions
//!
//! The workflow is an explicit state machine: [`Stage::next`] is the whole
//! transition table, and [`AnalysisState`] is the accumulator each stage writes to.

use crate::domain::models::{
    AnalysisOutput, ExtractedDecision, ExtractedQuestion, ExtractedTask, MeetingType,
    TranscriptInput,
};
use crate::pipeline::ledger::UsageLedger;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    DetectType,
    GateInformative,
    ExtractTasks,
    ExtractDecisions,
    ExtractQuestions,
    ExtractConcurrently,
    ComposeNote,
    ComposeOutput,
    ComposeEmptyOutput,
    End,
}

impl Stage {
    /// Next stage given the informativeness verdict and the extraction mode.
    pub fn next(self, is_informative: bool, concurrent: bool) -> Stage {
        match self {
            Stage::Start => Stage::DetectType,
            Stage::DetectType => Stage::GateInformative,
            Stage::GateInformative if !is_informative => Stage::ComposeEmptyOutput,
            Stage::GateInformative if concurrent => Stage::ExtractConcurrently,
            Stage::GateInformative => Stage::ExtractTasks,
            Stage::ExtractTasks => Stage::ExtractDecisions,
            Stage::ExtractDecisions => Stage::ExtractQuestions,
            Stage::ExtractQuestions | Stage::ExtractConcurrently => Stage::ComposeNote,
            Stage::ComposeNote => Stage::ComposeOutput,
            Stage::ComposeOutput | Stage::ComposeEmptyOutput | Stage::End => Stage::End,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::DetectType => "detect_type",
            Stage::GateInformative => "gate_informative",
            Stage::ExtractTasks => "extract_tasks",
            Stage::ExtractDecisions => "extract_decisions",
            Stage::ExtractQuestions => "extract_questions",
            Stage::ExtractConcurrently => "extract_concurrently",
            Stage::ComposeNote => "compose_note",
            Stage::ComposeOutput => "compose_output",
            Stage::ComposeEmptyOutput => "compose_empty_output",
            Stage::End => "end",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accumulator for one run. Never shared between runs.
#[derive(Debug)]
pub struct AnalysisState {
    pub run_id: Uuid,
    pub input: TranscriptInput,
    pub stage: Stage,
    /// Label reported in the output: the caller's hint verbatim, or the detected type
    pub meeting_type: String,
    /// Closed type used to pick templates
    pub meeting_kind: MeetingType,
    pub is_informative: bool,
    pub note: Option<String>,
    pub tasks: Vec<ExtractedTask>,
    pub decisions: Vec<ExtractedDecision>,
    pub questions: Vec<ExtractedQuestion>,
    pub ledger: UsageLedger,
}

impl AnalysisState {
    pub fn new(input: TranscriptInput, ledger: UsageLedger) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            input,
            stage: Stage::Start,
            meeting_type: MeetingType::General.as_str().to_string(),
            meeting_kind: MeetingType::General,
            is_informative: false,
            note: None,
            tasks: Vec::new(),
            decisions: Vec::new(),
            questions: Vec::new(),
            ledger,
        }
    }

    pub fn transcript(&self) -> &str {
        &self.input.transcript
    }

    pub fn set_meeting_type(&mut self, label: impl Into<String>, kind: MeetingType) {
        self.meeting_type = label.into();
        self.meeting_kind = kind;
    }

    /// Output assembled from whatever the stages produced.
    pub fn to_output(&self, fallback_note: &str) -> AnalysisOutput {
        AnalysisOutput {
            note: self
                .note
                .clone()
                .unwrap_or_else(|| fallback_note.to_string()),
            tasks: self.tasks.clone(),
            decisions: self.decisions.clone(),
            questions: self.questions.clone(),
            usage: self.ledger.snapshot(),
            is_informative: self.is_informative,
            meeting_type: self.meeting_type.clone(),
        }
    }

    /// Degraded output: no extractions, fixed note, usage so far.
    pub fn to_degraded_output(&self, note: &str) -> AnalysisOutput {
        AnalysisOutput::empty(note, self.meeting_type.clone(), self.ledger.snapshot())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(is_informative: bool, concurrent: bool) -> Vec<Stage> {
        let mut stages = vec![Stage::Start];
        let mut stage = Stage::Start;
        while stage != Stage::End {
            stage = stage.next(is_informative, concurrent);
            stages.push(stage);
        }
        stages
    }

    #[test]
    fn test_uninformative_path() {
        assert_eq!(
            walk(false, true),
            vec![
                Stage::Start,
                Stage::DetectType,
                Stage::GateInformative,
                Stage::ComposeEmptyOutput,
                Stage::End
            ]
        );
    }

    #[test]
    fn test_sequential_path() {
        assert_eq!(
            walk(true, false),
            vec![
                Stage::Start,
                Stage::DetectType,
                Stage::GateInformative,
                Stage::ExtractTasks,
                Stage::ExtractDecisions,
                Stage::ExtractQuestions,
                Stage::ComposeNote,
                Stage::ComposeOutput,
                Stage::End
            ]
        );
    }

    #[test]
    fn test_concurrent_path() {
        assert_eq!(
            walk(true, true),
            vec![
                Stage::Start,
                Stage::DetectType,
                Stage::GateInformative,
                Stage::ExtractConcurrently,
                Stage::ComposeNote,
                Stage::ComposeOutput,
                Stage::End
            ]
        );
    }

    #[test]
    fn test_fresh_state_per_run() {
        let a = AnalysisState::new(TranscriptInput::new("a"), UsageLedger::default());
        let b = AnalysisState::new(TranscriptInput::new("a"), UsageLedger::default());
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.stage, Stage::Start);
        assert_eq!(a.meeting_type, "general");
    }

    #[test]
    fn test_degraded_output_keeps_meeting_type_and_usage() {
        let mut state = AnalysisState::new(TranscriptInput::new("a"), UsageLedger::default());
        state.set_meeting_type("project", MeetingType::Project);
        state.ledger.record("detect_type", 10, 1);
        state.is_informative = true;

        let output = state.to_degraded_output("failed");
        assert_eq!(output.meeting_type, "project");
        assert_eq!(output.usage.total_tokens, 11);
        assert!(!output.is_informative);
        assert!(output.tasks.is_empty());
    }
}
