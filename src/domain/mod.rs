/// Domain layer - core analysis models
///
/// These models are provider-agnostic and represent what a pipeline run consumes and produces.
pub mod models;
pub mod normalize;
pub mod prompts;

pub use models::{
    AnalysisOutput, ExtractedDecision, ExtractedQuestion, ExtractedTask, MeetingType,
    TranscriptInput, UsageRecord,
};
pub use normalize::slug;
pub use prompts::{Category, PromptTemplates};
