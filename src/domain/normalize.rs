//! Normalization of model output
//!
//! The model is free to omit fields, send `null`, send numbers where text is expected
//! or wrap a single topic in a plain string. Everything here runs on raw JSON before
//! the typed records are deserialized, so a sloppy answer still becomes a valid item.
//!
//! Defaults come from one table shared by every item kind. A kind only declares
//! which table entries apply to it and which of its fields hold nested task lists.

use crate::error::{AppError, Result};
use serde_json::{Map, Value};
use slugify::slugify;

/// Default applied when a field is absent, null or blank
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Text(&'static str),
    Flag(bool),
    List,
}

impl FieldDefault {
    fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(text) => Value::String(text.to_string()),
            FieldDefault::Flag(flag) => Value::Bool(flag),
            FieldDefault::List => Value::Array(Vec::new()),
        }
    }
}

/// Field → default table used for tasks, decisions and questions alike.
pub const FIELD_DEFAULTS: &[(&str, FieldDefault)] = &[
    ("description", FieldDefault::Text("not specified")),
    ("assignee", FieldDefault::Text("unspecified")),
    ("deadline", FieldDefault::Text("to be determined")),
    ("priority", FieldDefault::Text("medium")),
    ("status", FieldDefault::Text("not started")),
    ("notes", FieldDefault::Text("no additional notes")),
    ("decision", FieldDefault::Text("not specified")),
    ("impact", FieldDefault::Text("not specified")),
    ("question", FieldDefault::Text("not specified")),
    ("answered", FieldDefault::Flag(false)),
    ("relatedTopics", FieldDefault::List),
    ("topics", FieldDefault::List),
    ("stakeholders", FieldDefault::List),
    ("followUpActions", FieldDefault::List),
];

/// Looks up a field in [`FIELD_DEFAULTS`].
pub fn default_for(field: &str) -> Option<FieldDefault> {
    FIELD_DEFAULTS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, default)| *default)
}

/// Shape of one item kind as far as normalization is concerned
#[derive(Debug)]
pub struct ItemSchema {
    /// Field that receives the text when the model sends a bare string as an item
    pub primary: &'static str,
    /// Fields filled from [`FIELD_DEFAULTS`]
    pub defaulted: &'static [&'static str],
    /// Optional free-text fields: kept when usable, otherwise null
    pub optional_text: &'static [&'static str],
    /// Fields holding topic lists, slugified
    pub topic_fields: &'static [&'static str],
    /// Fields holding nested task lists, normalized with [`TASK_SCHEMA`]
    pub nested_tasks: &'static [&'static str],
}

pub static TASK_SCHEMA: ItemSchema = ItemSchema {
    primary: "description",
    defaulted: &[
        "description",
        "assignee",
        "deadline",
        "priority",
        "status",
        "relatedTopics",
        "notes",
    ],
    optional_text: &[],
    topic_fields: &["relatedTopics"],
    nested_tasks: &[],
};

pub static DECISION_SCHEMA: ItemSchema = ItemSchema {
    primary: "decision",
    defaulted: &["topics", "decision", "impact", "stakeholders"],
    optional_text: &["timeline"],
    topic_fields: &["topics"],
    nested_tasks: &["nextSteps"],
};

pub static QUESTION_SCHEMA: ItemSchema = ItemSchema {
    primary: "question",
    defaulted: &["question", "answered", "topics", "followUpActions"],
    optional_text: &["asker", "answer", "context", "importance"],
    topic_fields: &["topics"],
    nested_tasks: &["followUpActions"],
};

/// Canonical topic slug: lowercase ASCII, diacritics folded, runs of anything
/// else collapsed to `_`, no leading or trailing `_`.
pub fn slug(text: &str) -> String {
    slugify!(text, separator = "_")
}

/// Pulls the list of raw items out of a structured reply.
///
/// Accepts `{"items": [...]}`, `{"<collection_key>": [...]}`, a bare array, or a
/// single object that carries the kind's primary field.
pub fn collect_items(value: Value, collection_key: &str, primary: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in ["items", collection_key] {
                match map.remove(key) {
                    Some(Value::Array(items)) => return Ok(items),
                    Some(Value::Null) | None => {}
                    Some(other) => return Ok(vec![other]),
                }
            }
            if map.contains_key(primary) {
                Ok(vec![Value::Object(map)])
            } else if map.is_empty() {
                Ok(Vec::new())
            } else {
                Err(AppError::MalformedResponse(format!(
                    "expected a list of {} but got keys: {}",
                    collection_key,
                    map.keys().cloned().collect::<Vec<_>>().join(", ")
                )))
            }
        }
        Value::Null => Ok(Vec::new()),
        other => Err(AppError::MalformedResponse(format!(
            "expected a list of {} but got {}",
            collection_key, other
        ))),
    }
}

/// Normalizes every item of a list, dropping entries that cannot be items at all.
pub fn normalize_items(items: Vec<Value>, schema: &ItemSchema) -> Vec<Value> {
    items
        .into_iter()
        .filter_map(|item| normalize_item(item, schema))
        .collect()
}

/// Normalizes a single item. Returns `None` for `null` and for nested arrays.
pub fn normalize_item(item: Value, schema: &ItemSchema) -> Option<Value> {
    let mut map = match item {
        Value::Object(map) => map,
        Value::Null | Value::Array(_) => return None,
        scalar => {
            let mut map = Map::new();
            map.insert(schema.primary.to_string(), scalar);
            map
        }
    };

    for field in schema.defaulted {
        let Some(default) = default_for(field) else {
            continue;
        };
        let current = map.remove(*field).unwrap_or(Value::Null);
        let nested = schema.nested_tasks.contains(field);
        map.insert(field.to_string(), apply_default(current, default, nested));
    }

    for field in schema.optional_text {
        if let Some(current) = map.remove(*field) {
            let value = coerce_text(&current).map(Value::String).unwrap_or(Value::Null);
            map.insert(field.to_string(), value);
        }
    }

    for field in schema.topic_fields {
        if let Some(current) = map.remove(*field) {
            map.insert(field.to_string(), Value::Array(slug_topics(&current)));
        }
    }

    for field in schema.nested_tasks {
        match map.remove(*field) {
            None | Some(Value::Null) => {
                if default_for(field).is_some() {
                    map.insert(field.to_string(), Value::Array(Vec::new()));
                }
            }
            Some(Value::Array(tasks)) => {
                map.insert(
                    field.to_string(),
                    Value::Array(normalize_items(tasks, &TASK_SCHEMA)),
                );
            }
            Some(single) => {
                map.insert(
                    field.to_string(),
                    Value::Array(normalize_items(vec![single], &TASK_SCHEMA)),
                );
            }
        }
    }

    Some(Value::Object(map))
}

fn apply_default(current: Value, default: FieldDefault, nested: bool) -> Value {
    match default {
        FieldDefault::Text(_) => coerce_text(&current)
            .map(Value::String)
            .unwrap_or_else(|| default.to_value()),
        FieldDefault::Flag(_) => coerce_flag(&current)
            .map(Value::Bool)
            .unwrap_or_else(|| default.to_value()),
        FieldDefault::List if nested => match current {
            Value::Null => default.to_value(),
            other => other,
        },
        FieldDefault::List => match current {
            Value::Array(values) => {
                Value::Array(values.iter().filter_map(coerce_text).map(Value::String).collect())
            }
            other => match coerce_text(&other) {
                Some(text) => Value::Array(vec![Value::String(text)]),
                None => default.to_value(),
            },
        },
    }
}

/// Usable text from a JSON value. Blank strings count as missing.
fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Array(values) => {
            let parts: Vec<String> = values.iter().filter_map(coerce_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Null | Value::Object(_) => None,
    }
}

fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "answered" => Some(true),
            "false" | "no" | "unanswered" => Some(false),
            _ => None,
        },
        Value::Number(number) => number.as_i64().map(|n| n != 0),
        _ => None,
    }
}

fn slug_topics(value: &Value) -> Vec<Value> {
    let raw: Vec<String> = match value {
        Value::Array(values) => values.iter().filter_map(coerce_text).collect(),
        other => coerce_text(other).into_iter().collect(),
    };

    let mut topics: Vec<String> = Vec::with_capacity(raw.len());
    for topic in raw.iter().map(|t| slug(t)) {
        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }
    topics.into_iter().map(Value::String).collect()
}
