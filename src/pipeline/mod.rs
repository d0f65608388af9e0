//! Analysis pipeline
//!
//! Stage components, the shared model-call plumbing they go through, and the
//! orchestrator that drives a run from transcript to [`crate::domain::AnalysisOutput`].

pub mod call;
pub mod composer;
pub mod detector;
pub mod extractor;
pub mod gate;
pub mod ledger;
pub mod orchestrator;
pub mod retry;
pub mod state;

pub use call::ModelCall;
pub use composer::NoteComposer;
pub use detector::TypeDetector;
pub use extractor::{DecisionExtractor, Extractor, QuestionExtractor, TaskExtractor};
pub use gate::InformativeGate;
pub use ledger::{ModelRates, UsageLedger};
pub use orchestrator::{AnalysisOptions, Orchestrator};
pub use retry::RetryPolicy;
pub use state::{AnalysisState, Stage};
