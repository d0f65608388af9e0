//! Mock implementations for testing

use crate::domain::prompts::Category;
use crate::error::{AppError, Result};
use crate::ports::llm::{GenerativeClient, Generation, LlmConfig, StructuredGeneration};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Scripted generative client
///
/// Answers classification, note and extraction prompts with canned replies and
/// counts how often each kind of call was made. Failures, delays, panics and
/// cancellation can be injected per call kind.
pub struct ScriptedClient {
    meeting_type_reply: String,
    note_reply: String,
    tasks: Value,
    decisions: Value,
    questions: Value,
    failing: Vec<Category>,
    structured_delay: Option<Duration>,
    cancel_after_classification: Option<CancellationToken>,
    panic_on_note: bool,
    classify_calls: AtomicUsize,
    note_calls: AtomicUsize,
    structured_calls: AtomicUsize,
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self {
            meeting_type_reply: "business".to_string(),
            note_reply: "```markdown\n# Weekly sync\nAlice will finish the report by Friday.\n```"
                .to_string(),
            tasks: json!({"items": [
                {"description": "Finish the quarterly report", "assignee": "Alice", "deadline": "Friday", "relatedTopics": ["Quarterly Report"]},
                {"description": "Send the slides to the team", "assignee": null}
            ]}),
            decisions: json!({"items": [
                {"decision": "Ship version two in May", "topics": ["Release Plan"], "stakeholders": ["Alice", "Bob"]}
            ]}),
            questions: json!({"items": [
                {"question": "Who reviews the budget?", "topics": ["Budget Review"]}
            ]}),
            failing: Vec::new(),
            structured_delay: None,
            cancel_after_classification: None,
            panic_on_note: false,
            classify_calls: AtomicUsize::new(0),
            note_calls: AtomicUsize::new(0),
            structured_calls: AtomicUsize::new(0),
        }
    }
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meeting_type_reply(mut self, reply: &str) -> Self {
        self.meeting_type_reply = reply.to_string();
        self
    }

    pub fn with_reply(mut self, category: Category, reply: Value) -> Self {
        match category {
            Category::Tasks => self.tasks = reply,
            Category::Decisions => self.decisions = reply,
            Category::Questions => self.questions = reply,
        }
        self
    }

    pub fn failing(mut self, category: Category) -> Self {
        self.failing.push(category);
        self
    }

    pub fn with_structured_delay(mut self, delay: Duration) -> Self {
        self.structured_delay = Some(delay);
        self
    }

    pub fn cancelling_after_classification(mut self, token: CancellationToken) -> Self {
        self.cancel_after_classification = Some(token);
        self
    }

    pub fn panicking_on_note(mut self) -> Self {
        self.panic_on_note = true;
        self
    }

    pub fn classify_calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }

    pub fn note_calls(&self) -> usize {
        self.note_calls.load(Ordering::SeqCst)
    }

    pub fn structured_calls(&self) -> usize {
        self.structured_calls.load(Ordering::SeqCst)
    }

    fn category_of(prompt: &str) -> Option<Category> {
        if prompt.contains("Extract only TASKS") {
            Some(Category::Tasks)
        } else if prompt.contains("Extract only DECISIONS") {
            Some(Category::Decisions)
        } else if prompt.contains("Extract only OPEN QUESTIONS") {
            Some(Category::Questions)
        } else {
            None
        }
    }
}

#[async_trait]
impl GenerativeClient for ScriptedClient {
    async fn generate(&self, prompt: &str, _config: &LlmConfig) -> Result<Generation> {
        if prompt.contains("Classify the meeting") {
            self.classify_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = &self.cancel_after_classification {
                token.cancel();
            }
            return Ok(Generation::new(self.meeting_type_reply.clone()));
        }

        self.note_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_note {
            panic!("note backend exploded");
        }
        Ok(Generation::new(self.note_reply.clone()))
    }

    async fn generate_structured(
        &self,
        prompt: &str,
        _schema: &Value,
        _config: &LlmConfig,
    ) -> Result<StructuredGeneration> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.structured_delay {
            tokio::time::sleep(delay).await;
        }

        let category = Self::category_of(prompt)
            .ok_or_else(|| AppError::InvalidInput("unrecognized extraction prompt".to_string()))?;
        if self.failing.contains(&category) {
            return Err(AppError::Llm(format!("{:?} extraction unavailable", category)));
        }

        let reply = match category {
            Category::Tasks => &self.tasks,
            Category::Decisions => &self.decisions,
            Category::Questions => &self.questions,
        };
        Ok(StructuredGeneration::new(reply.clone()))
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn is_configured(&self) -> bool {
        true
    }
}
