//! Workflow orchestration
//!
//! Drives one run through the stage machine in [`crate::pipeline::state`] and
//! guarantees a well-formed [`AnalysisOutput`] whatever happens inside: stage
//! errors, panics and cancellation all end in a degraded output carrying the
//! usage recorded so far.

use crate::config::AnalysisConfig;
use crate::domain::models::{AnalysisOutput, MeetingType, TranscriptInput};
use crate::domain::prompts::{ANALYSIS_FAILED_NOTE, EMPTY_NOTE, INSUFFICIENT_INFORMATION_NOTE};
use crate::error::{AppError, Result};
use crate::pipeline::call::ModelCall;
use crate::pipeline::composer::NoteComposer;
use crate::pipeline::detector::TypeDetector;
use crate::pipeline::extractor::{DecisionExtractor, QuestionExtractor, TaskExtractor};
use crate::pipeline::gate::InformativeGate;
use crate::pipeline::ledger::{ModelRates, UsageLedger};
use crate::pipeline::state::{AnalysisState, Stage};
use crate::ports::llm::GenerativeClient;
use crate::ports::tokenizer::{HeuristicTokenCounter, TokenCounter};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-run options
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Cancelling this token stops the run at its next suspension point
    pub cancel: Option<CancellationToken>,
}

impl AnalysisOptions {
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

enum Outcome {
    Finished(Result<AnalysisOutput>),
    Panicked(Box<dyn Any + Send>),
    Cancelled,
}

pub struct Orchestrator {
    detector: TypeDetector,
    gate: InformativeGate,
    tasks: TaskExtractor,
    decisions: DecisionExtractor,
    questions: QuestionExtractor,
    composer: NoteComposer,
    rates: ModelRates,
    min_classifiable_chars: usize,
    concurrent_extraction: bool,
}

impl Orchestrator {
    /// Orchestrator that estimates tokens locally when the provider does not report them.
    pub fn new(client: Arc<dyn GenerativeClient>, config: &AnalysisConfig) -> Self {
        Self::with_token_counter(client, Arc::new(HeuristicTokenCounter), config)
    }

    pub fn with_token_counter(
        client: Arc<dyn GenerativeClient>,
        counter: Arc<dyn TokenCounter>,
        config: &AnalysisConfig,
    ) -> Self {
        let call = ModelCall::new(
            client,
            counter,
            config.llm.clone(),
            config.retry.clone(),
            config.call_timeout(),
        );

        Self {
            detector: TypeDetector::new(call.clone(), config.type_sample_chars),
            gate: InformativeGate::new(config.min_informative_chars),
            tasks: TaskExtractor::new(call.clone()),
            decisions: DecisionExtractor::new(call.clone()),
            questions: QuestionExtractor::new(call.clone()),
            composer: NoteComposer::new(call),
            rates: config.model_rates(),
            min_classifiable_chars: config.min_classifiable_chars,
            concurrent_extraction: config.concurrent_extraction,
        }
    }

    /// Runs the full analysis. Never fails and never panics to the caller.
    pub async fn execute(&self, input: TranscriptInput, options: AnalysisOptions) -> AnalysisOutput {
        let mut state = AnalysisState::new(input, UsageLedger::new(self.rates));
        log::info!(
            "[{}] Starting analysis of {} characters",
            state.run_id,
            state.transcript().chars().count()
        );

        let outcome = {
            let run = AssertUnwindSafe(self.drive(&mut state)).catch_unwind();
            match options.cancel.as_ref() {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => Outcome::Cancelled,
                    result = run => match result {
                        Ok(finished) => Outcome::Finished(finished),
                        Err(panic) => Outcome::Panicked(panic),
                    },
                },
                None => match run.await {
                    Ok(finished) => Outcome::Finished(finished),
                    Err(panic) => Outcome::Panicked(panic),
                },
            }
        };

        let output = match outcome {
            Outcome::Finished(Ok(output)) => output,
            Outcome::Finished(Err(err)) => {
                log::error!("[{}] Analysis failed at {}: {}", state.run_id, state.stage, err);
                state.to_degraded_output(ANALYSIS_FAILED_NOTE)
            }
            Outcome::Panicked(panic) => {
                log::error!(
                    "[{}] Analysis panicked at {}: {}",
                    state.run_id,
                    state.stage,
                    panic_message(panic.as_ref())
                );
                state.to_degraded_output(ANALYSIS_FAILED_NOTE)
            }
            Outcome::Cancelled => {
                log::warn!("[{}] Analysis cancelled at {}", state.run_id, state.stage);
                state.to_degraded_output(ANALYSIS_FAILED_NOTE)
            }
        };

        log::info!(
            "[{}] Analysis finished: type={}, informative={}, {} tasks, {} decisions, {} questions, {} tokens (${})",
            state.run_id,
            output.meeting_type,
            output.is_informative,
            output.tasks.len(),
            output.decisions.len(),
            output.questions.len(),
            output.usage.total_tokens,
            output.usage.cost_estimate
        );
        output
    }

    async fn drive(&self, state: &mut AnalysisState) -> Result<AnalysisOutput> {
        let mut output = None;

        loop {
            log::debug!("[{}] Stage {}", state.run_id, state.stage);

            match state.stage {
                Stage::Start => {}
                Stage::DetectType => self.detect_type(state).await,
                Stage::GateInformative => {
                    state.is_informative = self.gate.check(state.transcript());
                    if !state.is_informative {
                        log::info!("[{}] Transcript is not informative, skipping extraction", state.run_id);
                    }
                }
                Stage::ExtractTasks => {
                    let tasks = self
                        .tasks
                        .extract(state.transcript(), state.meeting_kind, &state.ledger)
                        .await;
                    state.tasks = tasks;
                }
                Stage::ExtractDecisions => {
                    let decisions = self
                        .decisions
                        .extract(state.transcript(), state.meeting_kind, &state.ledger)
                        .await;
                    state.decisions = decisions;
                }
                Stage::ExtractQuestions => {
                    let questions = self
                        .questions
                        .extract(state.transcript(), state.meeting_kind, &state.ledger)
                        .await;
                    state.questions = questions;
                }
                Stage::ExtractConcurrently => {
                    let transcript = state.transcript();
                    let (tasks, decisions, questions) = tokio::join!(
                        self.tasks.extract(transcript, state.meeting_kind, &state.ledger),
                        self.decisions.extract(transcript, state.meeting_kind, &state.ledger),
                        self.questions.extract(transcript, state.meeting_kind, &state.ledger),
                    );
                    state.tasks = tasks;
                    state.decisions = decisions;
                    state.questions = questions;
                }
                Stage::ComposeNote => {
                    let note = self
                        .composer
                        .compose(
                            state.transcript(),
                            state.meeting_kind,
                            state.input.custom_instruction.as_deref(),
                            &state.ledger,
                        )
                        .await;
                    state.note = Some(note);
                }
                Stage::ComposeOutput => output = Some(state.to_output(EMPTY_NOTE)),
                Stage::ComposeEmptyOutput => {
                    output = Some(state.to_degraded_output(INSUFFICIENT_INFORMATION_NOTE))
                }
                Stage::End => {
                    return output.ok_or_else(|| {
                        AppError::Other("run reached the end without an output".to_string())
                    });
                }
            }

            state.stage = state
                .stage
                .next(state.is_informative, self.concurrent_extraction);
        }
    }

    async fn detect_type(&self, state: &mut AnalysisState) {
        let hint = state
            .input
            .meeting_type_hint
            .as_deref()
            .filter(|hint| is_specific_hint(hint))
            .map(str::to_string);

        if let Some(hint) = hint {
            log::info!("[{}] Using caller's meeting type '{}'", state.run_id, hint);
            let kind = MeetingType::from_label(&hint);
            state.set_meeting_type(hint, kind);
            return;
        }

        if state.transcript().trim().chars().count() < self.min_classifiable_chars {
            log::info!("[{}] Transcript too short to classify, using general", state.run_id);
            state.set_meeting_type(MeetingType::General.as_str(), MeetingType::General);
            return;
        }

        let kind = self.detector.classify(state.transcript(), &state.ledger).await;
        log::info!("[{}] Detected meeting type '{}'", state.run_id, kind);
        state.set_meeting_type(kind.as_str(), kind);
    }
}

/// A hint counts only when it is non-blank and not the generic default.
fn is_specific_hint(hint: &str) -> bool {
    let hint = hint.trim();
    !hint.is_empty() && !hint.eq_ignore_ascii_case(MeetingType::General.as_str())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prompts::{Category, NOTE_GENERATION_ERROR};
    use crate::pipeline::retry::RetryPolicy;
    use crate::ports::llm::{Generation, MockGenerativeClient, StructuredGeneration};
    use crate::ports::mocks::ScriptedClient;
    use serde_json::json;
    use std::time::Duration;

    const MEETING: &str = "Alice: Good morning everyone, let's go through the quarterly numbers.\n\
        Bob: Revenue is up eight percent, but the budget review is still open.\n\
        Alice: I will finish the report by Friday. Alice will finish the report by Friday, then.\n\
        Bob: Great. We agreed to ship version two in May. Who reviews the budget?";

    fn test_config(concurrent: bool) -> AnalysisConfig {
        AnalysisConfig {
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay_ms: 1,
                multiplier: 2.0,
                max_delay_ms: 2,
            },
            concurrent_extraction: concurrent,
            ..AnalysisConfig::default()
        }
    }

    fn orchestrator(client: &Arc<ScriptedClient>) -> Orchestrator {
        Orchestrator::new(client.clone(), &test_config(true))
    }

    async fn run(client: &Arc<ScriptedClient>, input: TranscriptInput) -> AnalysisOutput {
        orchestrator(client).execute(input, AnalysisOptions::default()).await
    }

    #[tokio::test]
    async fn test_execute_always_returns_output() {
        let garbage = format!("{{{{\u{0}\u{FFFF}]]{}", "\u{202E}x".repeat(500));
        for transcript in ["", "   \n\t", "?", garbage.as_str(), MEETING] {
            let client = Arc::new(ScriptedClient::new());
            let output = run(&client, TranscriptInput::new(transcript)).await;
            assert!(!output.note.is_empty());
            assert!(!output.meeting_type.is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_transcript_short_circuits() {
        for transcript in ["", "     \n  "] {
            let client = Arc::new(ScriptedClient::new());
            let output = run(&client, TranscriptInput::new(transcript)).await;

            assert!(!output.is_informative);
            assert_eq!(output.note, INSUFFICIENT_INFORMATION_NOTE);
            assert!(output.tasks.is_empty());
            assert!(output.decisions.is_empty());
            assert!(output.questions.is_empty());
            assert_eq!(output.usage.total_tokens, 0);
            assert_eq!(output.meeting_type, "general");
            assert_eq!(client.classify_calls(), 0);
            assert_eq!(client.structured_calls(), 0);
            assert_eq!(client.note_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_full_run_extracts_everything() {
        let client = Arc::new(ScriptedClient::new());
        let output = run(&client, TranscriptInput::new(MEETING)).await;

        assert!(output.is_informative);
        assert_eq!(output.meeting_type, "business");
        assert_eq!(output.note, "# Weekly sync\nAlice will finish the report by Friday.");
        assert_eq!(output.decisions[0].topics, vec!["release_plan"]);
        assert_eq!(output.questions[0].topics, vec!["budget_review"]);
        assert_eq!(client.classify_calls(), 1);
        assert_eq!(client.structured_calls(), 3);
        assert_eq!(client.note_calls(), 1);
        assert!(output.usage.input_tokens > 0);
        assert!(output.usage.output_tokens > 0);
        assert!(output.usage.cost_estimate > 0.0);
    }

    #[tokio::test]
    async fn test_task_language_yields_defaulted_tasks() {
        let client = Arc::new(ScriptedClient::new());
        let output = run(&client, TranscriptInput::new(MEETING)).await;

        assert!(!output.tasks.is_empty());
        for task in &output.tasks {
            assert!(!task.assignee.is_empty());
            assert!(!task.priority.is_empty());
            assert!(!task.status.is_empty());
            assert!(!task.deadline.is_empty());
        }
        assert_eq!(output.tasks[0].related_topics, vec!["quarterly_report"]);
        assert_eq!(output.tasks[1].assignee, "unspecified");
        assert_eq!(output.tasks[1].priority, "medium");
        assert_eq!(output.tasks[1].deadline, "to be determined");
    }

    #[tokio::test]
    async fn test_hint_bypasses_detection() {
        let client = Arc::new(ScriptedClient::new());
        let input = TranscriptInput::new(MEETING).with_meeting_type_hint("project");
        let output = run(&client, input).await;

        assert_eq!(client.classify_calls(), 0);
        assert_eq!(output.meeting_type, "project");
        assert!(output.is_informative);
    }

    #[tokio::test]
    async fn test_hint_bypass_never_calls_classifier() {
        let mut client = MockGenerativeClient::new();
        client
            .expect_generate()
            .withf(|prompt, _| !prompt.contains("Classify the meeting"))
            .times(1)
            .returning(|_, _| Ok(Generation::new("note")));
        client
            .expect_generate_structured()
            .times(3)
            .returning(|_, _, _| Ok(StructuredGeneration::new(json!({"items": []}))));

        let orchestrator = Orchestrator::new(Arc::new(client), &test_config(true));
        let input = TranscriptInput::new(MEETING).with_meeting_type_hint("project");
        let output = orchestrator.execute(input, AnalysisOptions::default()).await;

        assert_eq!(output.meeting_type, "project");
        assert_eq!(output.note, "note");
        assert!(output.is_informative);
    }

    #[tokio::test]
    async fn test_unknown_hint_is_kept_verbatim() {
        let client = Arc::new(ScriptedClient::new());
        let output = run(&client, TranscriptInput::new(MEETING).with_meeting_type_hint("Standup")).await;

        assert_eq!(output.meeting_type, "Standup");
        assert_eq!(client.classify_calls(), 0);
    }

    #[tokio::test]
    async fn test_generic_or_blank_hint_still_detects() {
        for hint in ["general", " General ", "   "] {
            let client = Arc::new(ScriptedClient::new().with_meeting_type_reply("Report."));
            let output = run(&client, TranscriptInput::new(MEETING).with_meeting_type_hint(hint)).await;

            assert_eq!(client.classify_calls(), 1);
            assert_eq!(output.meeting_type, "report");
        }
    }

    #[tokio::test]
    async fn test_short_transcript_defaults_to_general_without_model() {
        let client = Arc::new(ScriptedClient::new());
        // Informative, but below the classification minimum
        let transcript = "Alice will finish the report by Friday, Bob reviews it.";
        let output = run(&client, TranscriptInput::new(transcript)).await;

        assert_eq!(client.classify_calls(), 0);
        assert_eq!(output.meeting_type, "general");
        assert!(output.is_informative);
        assert!(!output.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_classification_is_general() {
        let client = Arc::new(ScriptedClient::new().with_meeting_type_reply("a brainstorm"));
        let output = run(&client, TranscriptInput::new(MEETING)).await;
        assert_eq!(output.meeting_type, "general");
    }

    #[tokio::test]
    async fn test_one_failing_category_leaves_others_intact() {
        let baseline = run(&Arc::new(ScriptedClient::new()), TranscriptInput::new(MEETING)).await;

        let client = Arc::new(ScriptedClient::new().failing(Category::Tasks));
        let output = run(&client, TranscriptInput::new(MEETING)).await;

        assert!(output.tasks.is_empty());
        assert_eq!(output.decisions, baseline.decisions);
        assert_eq!(output.questions, baseline.questions);
        assert_eq!(output.note, baseline.note);
        assert!(output.is_informative);
    }

    #[tokio::test]
    async fn test_malformed_category_reply_is_isolated() {
        let client = Arc::new(
            ScriptedClient::new().with_reply(Category::Questions, json!({"unexpected": true})),
        );
        let output = run(&client, TranscriptInput::new(MEETING)).await;

        assert!(output.questions.is_empty());
        assert!(!output.tasks.is_empty());
        assert!(!output.decisions.is_empty());
    }

    #[tokio::test]
    async fn test_full_run_costs_at_least_short_circuit() {
        let short = run(&Arc::new(ScriptedClient::new()), TranscriptInput::new("  ")).await;
        let full = run(&Arc::new(ScriptedClient::new()), TranscriptInput::new(MEETING)).await;

        assert!(full.usage.total_tokens >= short.usage.total_tokens);
        assert!(full.usage.total_tokens > 0);
        assert!(full.usage.cost_estimate >= short.usage.cost_estimate);
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let concurrent = run(&Arc::new(ScriptedClient::new()), TranscriptInput::new(MEETING)).await;

        let client = Arc::new(ScriptedClient::new());
        let sequential = Orchestrator::new(client.clone(), &test_config(false))
            .execute(TranscriptInput::new(MEETING), AnalysisOptions::default())
            .await;

        assert_eq!(sequential.tasks, concurrent.tasks);
        assert_eq!(sequential.decisions, concurrent.decisions);
        assert_eq!(sequential.questions, concurrent.questions);
        assert_eq!(sequential.usage.total_tokens, concurrent.usage.total_tokens);
        assert_eq!(client.structured_calls(), 3);
    }

    #[tokio::test]
    async fn test_cancel_after_detection_returns_degraded_output() {
        let token = CancellationToken::new();
        let client = Arc::new(
            ScriptedClient::new()
                .cancelling_after_classification(token.clone())
                .with_structured_delay(Duration::from_secs(30)),
        );

        let output = orchestrator(&client)
            .execute(
                TranscriptInput::new(MEETING),
                AnalysisOptions::default().with_cancellation(token),
            )
            .await;

        assert_eq!(client.classify_calls(), 1);
        assert_eq!(client.note_calls(), 0);
        assert!(!output.is_informative);
        assert_eq!(output.note, ANALYSIS_FAILED_NOTE);
        assert!(output.tasks.is_empty());
        assert_eq!(output.meeting_type, "business");
        assert!(output.usage.input_tokens > 0);
    }

    #[tokio::test]
    async fn test_already_cancelled_run_costs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let client = Arc::new(ScriptedClient::new());

        let output = orchestrator(&client)
            .execute(
                TranscriptInput::new(MEETING),
                AnalysisOptions::default().with_cancellation(token),
            )
            .await;

        assert_eq!(output.note, ANALYSIS_FAILED_NOTE);
        assert_eq!(output.usage.total_tokens, 0);
        assert_eq!(client.classify_calls(), 0);
    }

    #[tokio::test]
    async fn test_panic_mid_run_is_contained() {
        let client = Arc::new(ScriptedClient::new().panicking_on_note());
        let output = run(&client, TranscriptInput::new(MEETING)).await;

        assert!(!output.is_informative);
        assert_eq!(output.note, ANALYSIS_FAILED_NOTE);
        assert!(output.tasks.is_empty());
        assert!(output.decisions.is_empty());
        assert!(output.questions.is_empty());
        // Detection and the three extractions were billed before the failure
        assert!(output.usage.total_tokens > 0);
        assert_eq!(client.structured_calls(), 3);
    }

    #[tokio::test]
    async fn test_note_failure_keeps_extractions() {
        let mut client = MockGenerativeClient::new();
        client
            .expect_generate()
            .returning(|prompt, _| {
                if prompt.contains("Classify the meeting") {
                    Ok(Generation::new("product"))
                } else {
                    Err(AppError::Llm("note model offline".to_string()))
                }
            });
        client.expect_generate_structured().returning(|_, _, _| {
            Ok(StructuredGeneration::new(json!({"items": [{"description": "Write the brief"}]})))
        });

        let orchestrator = Orchestrator::new(Arc::new(client), &test_config(true));
        let output = orchestrator
            .execute(TranscriptInput::new(MEETING), AnalysisOptions::default())
            .await;

        assert!(output.is_informative);
        assert_eq!(output.meeting_type, "product");
        assert_eq!(output.note, NOTE_GENERATION_ERROR);
        assert_eq!(output.tasks.len(), 1);
    }

    #[tokio::test]
    async fn test_runs_do_not_share_usage() {
        let client = Arc::new(ScriptedClient::new());
        let orchestrator = orchestrator(&client);

        let first = orchestrator
            .execute(TranscriptInput::new(MEETING), AnalysisOptions::default())
            .await;
        let second = orchestrator
            .execute(TranscriptInput::new(MEETING), AnalysisOptions::default())
            .await;

        assert_eq!(first.usage, second.usage);
    }
}
