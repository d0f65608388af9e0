//! Meet Scribe transcript analysis
//!
//! Turns a raw meeting transcript into a narrative note plus structured tasks,
//! decisions and open questions, with token usage and an estimated cost. A run
//! never fails: faults degrade to a well-formed output.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod pipeline;
pub mod ports;

pub use config::AnalysisConfig;
pub use domain::{AnalysisOutput, MeetingType, TranscriptInput, UsageRecord};
pub use error::{AppError, Result};
pub use pipeline::{AnalysisOptions, Orchestrator};
