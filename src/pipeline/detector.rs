//! Meeting type classification
//!
//! Sends only a bounded leading slice of the transcript, so the cost of this call
//! does not grow with meeting length.

use crate::domain::models::MeetingType;
use crate::domain::prompts::PromptTemplates;
use crate::pipeline::call::ModelCall;
use crate::pipeline::ledger::UsageLedger;

pub const STAGE: &str = "detect_type";

/// Characters of transcript sent for classification
pub const DEFAULT_SAMPLE_CHARS: usize = 2_000;

pub struct TypeDetector {
    call: ModelCall,
    sample_chars: usize,
}

impl TypeDetector {
    pub fn new(call: ModelCall, sample_chars: usize) -> Self {
        Self { call, sample_chars }
    }

    /// Classifies the meeting. Errors and unexpected answers both yield `General`.
    pub async fn classify(&self, transcript: &str, ledger: &UsageLedger) -> MeetingType {
        let sample = leading_slice(transcript, self.sample_chars);
        let prompt = PromptTemplates::classifier().replace("{sample}", sample);

        match self.call.text(STAGE, &prompt, ledger).await {
            Ok(reply) => {
                let detected = parse_meeting_type(&reply);
                if detected.is_none() {
                    log::warn!("Unrecognized meeting type '{}', using general", reply.trim());
                }
                detected.unwrap_or_default()
            }
            Err(err) => {
                log::warn!("Meeting type detection failed, using general: {}", err);
                MeetingType::General
            }
        }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn leading_slice(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Reads the category from the first word of a reply such as `"Project"`,
/// `project.` or `Category: report`. A type mentioned later in the sentence
/// ("not a project meeting") does not count.
fn parse_meeting_type(reply: &str) -> Option<MeetingType> {
    let lowered = reply.trim().to_lowercase();
    let answer = match lowered.split_once(':') {
        Some((_, value)) => value,
        None => lowered.as_str(),
    };
    let first_word = answer
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|word| !word.is_empty())?;

    MeetingType::ALL
        .into_iter()
        .find(|kind| kind.as_str() == first_word)
}
