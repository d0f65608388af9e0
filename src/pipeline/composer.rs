//! Narrative note generation

use crate::domain::models::MeetingType;
use crate::domain::prompts::{PromptTemplates, EMPTY_NOTE, NOTE_GENERATION_ERROR};
use crate::pipeline::call::ModelCall;
use crate::pipeline::ledger::UsageLedger;

pub const STAGE: &str = "compose_note";

pub struct NoteComposer {
    call: ModelCall,
}

impl NoteComposer {
    pub fn new(call: ModelCall) -> Self {
        Self { call }
    }

    /// Writes the meeting note. Never fails: errors become a fixed apology note.
    pub async fn compose(
        &self,
        transcript: &str,
        meeting_type: MeetingType,
        custom_instruction: Option<&str>,
        ledger: &UsageLedger,
    ) -> String {
        // The instruction is billed as context, not as prompt input.
        let instruction = custom_instruction.map(str::trim).filter(|s| !s.is_empty());
        let prompt = PromptTemplates::note_prompt(meeting_type, instruction, transcript);

        match self
            .call
            .text_with_context(STAGE, &prompt, instruction, ledger)
            .await
        {
            Ok(raw) => {
                let note = strip_code_fences(&raw);
                if note.is_empty() {
                    log::warn!("Model returned an empty note");
                    EMPTY_NOTE.to_string()
                } else {
                    note
                }
            }
            Err(err) => {
                log::warn!("Note generation failed: {}", err);
                NOTE_GENERATION_ERROR.to_string()
            }
        }
    }
}

/// Removes a surrounding ```` ``` ```` / ```` ```markdown ```` wrapper and trims.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let mut lines: Vec<&str> = trimmed.lines().collect();
    if let Some(first) = lines.first() {
        if first.trim_start().starts_with("```") {
            lines.remove(0);
        }
    }
    if let Some(last) = lines.last() {
        if last.trim_start().starts_with("```") {
            lines.pop();
        }
    }
    lines.join("\n").trim().to_string()
}
