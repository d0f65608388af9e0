//! Structured extraction of tasks, decisions and open questions
//!
//! One generic [`Extractor`] is instantiated three times. A kind supplies its
//! category, its item schema (for normalization and for the JSON schema sent to
//! the model) and its item type. Failures never leave this module: a category that
//! cannot be extracted comes back empty while the others carry on.

use crate::domain::models::{ExtractedDecision, ExtractedQuestion, ExtractedTask, MeetingType};
use crate::domain::normalize::{
    collect_items, normalize_items, ItemSchema, DECISION_SCHEMA, QUESTION_SCHEMA, TASK_SCHEMA,
};
use crate::domain::prompts::{Category, PromptTemplates};
use crate::error::Result;
use crate::pipeline::call::ModelCall;
use crate::pipeline::ledger::UsageLedger;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::marker::PhantomData;

/// Static description of one extraction category
pub trait ExtractionKind: Send + Sync + 'static {
    type Item: DeserializeOwned + Send;

    const CATEGORY: Category;
    /// Ledger stage label
    const STAGE: &'static str;
    /// Key the model may use instead of `items`
    const COLLECTION_KEY: &'static str;

    fn item_schema() -> &'static ItemSchema;

    /// JSON schema of a single item, as requested from the model
    fn json_schema() -> Value;
}

pub struct TaskKind;
pub struct DecisionKind;
pub struct QuestionKind;

fn task_json_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "description": {"type": "string"},
            "assignee": {"type": ["string", "null"]},
            "deadline": {"type": ["string", "null"]},
            "priority": {"type": ["string", "null"], "enum": ["low", "medium", "high", null]},
            "status": {"type": ["string", "null"]},
            "relatedTopics": {"type": "array", "items": {"type": "string"}},
            "notes": {"type": ["string", "null"]}
        },
        "required": ["description"]
    })
}

impl ExtractionKind for TaskKind {
    type Item = ExtractedTask;

    const CATEGORY: Category = Category::Tasks;
    const STAGE: &'static str = "extract_tasks";
    const COLLECTION_KEY: &'static str = "tasks";

    fn item_schema() -> &'static ItemSchema {
        &TASK_SCHEMA
    }

    fn json_schema() -> Value {
        task_json_schema()
    }
}

impl ExtractionKind for DecisionKind {
    type Item = ExtractedDecision;

    const CATEGORY: Category = Category::Decisions;
    const STAGE: &'static str = "extract_decisions";
    const COLLECTION_KEY: &'static str = "decisions";

    fn item_schema() -> &'static ItemSchema {
        &DECISION_SCHEMA
    }

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "topics": {"type": "array", "items": {"type": "string"}},
                "decision": {"type": "string"},
                "impact": {"type": ["string", "null"]},
                "timeline": {"type": ["string", "null"]},
                "stakeholders": {"type": "array", "items": {"type": "string"}},
                "nextSteps": {"type": ["array", "null"], "items": task_json_schema()}
            },
            "required": ["decision"]
        })
    }
}

impl ExtractionKind for QuestionKind {
    type Item = ExtractedQuestion;

    const CATEGORY: Category = Category::Questions;
    const STAGE: &'static str = "extract_questions";
    const COLLECTION_KEY: &'static str = "questions";

    fn item_schema() -> &'static ItemSchema {
        &QUESTION_SCHEMA
    }

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {"type": "string"},
                "asker": {"type": ["string", "null"]},
                "answer": {"type": ["string", "null"]},
                "answered": {"type": "boolean"},
                "topics": {"type": "array", "items": {"type": "string"}},
                "followUpActions": {"type": "array", "items": task_json_schema()},
                "context": {"type": ["string", "null"]},
                "importance": {"type": ["string", "null"]}
            },
            "required": ["question"]
        })
    }
}

pub type TaskExtractor = Extractor<TaskKind>;
pub type DecisionExtractor = Extractor<DecisionKind>;
pub type QuestionExtractor = Extractor<QuestionKind>;

pub struct Extractor<K: ExtractionKind> {
    call: ModelCall,
    _kind: PhantomData<K>,
}

impl<K: ExtractionKind> Extractor<K> {
    pub fn new(call: ModelCall) -> Self {
        Self {
            call,
            _kind: PhantomData,
        }
    }

    /// Response schema: `{"items": [<item>]}`
    pub fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {"type": "array", "items": K::json_schema()}
            },
            "required": ["items"]
        })
    }

    /// Extracts this category. Any failure yields an empty list.
    pub async fn extract(
        &self,
        transcript: &str,
        meeting_type: MeetingType,
        ledger: &UsageLedger,
    ) -> Vec<K::Item> {
        match self.try_extract(transcript, meeting_type, ledger).await {
            Ok(items) => {
                log::info!("{}: extracted {} items", K::STAGE, items.len());
                items
            }
            Err(err) => {
                log::warn!("{} failed, continuing without them: {}", K::STAGE, err);
                Vec::new()
            }
        }
    }

    async fn try_extract(
        &self,
        transcript: &str,
        meeting_type: MeetingType,
        ledger: &UsageLedger,
    ) -> Result<Vec<K::Item>> {
        let prompt = PromptTemplates::extraction_prompt(meeting_type, K::CATEGORY, transcript);
        let schema = Self::response_schema();

        let reply = self.call.structured(K::STAGE, &prompt, &schema, ledger).await?;
        parse_items::<K>(reply)
    }
}

/// Normalizes a raw reply and deserializes it into typed items.
pub fn parse_items<K: ExtractionKind>(reply: Value) -> Result<Vec<K::Item>> {
    let schema = K::item_schema();
    let raw = collect_items(reply, K::COLLECTION_KEY, schema.primary)?;
    let normalized = normalize_items(raw, schema);
    Ok(serde_json::from_value(Value::Array(normalized))?)
}
