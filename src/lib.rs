//! Localization QA reports for UI screenshot pairs.
//!
//! A source-language screenshot and its localized counterpart go through a
//! vision model, a skeptical verifier pass, and a deterministic reconciliation
//! step that removes ungrounded glossary claims and derives the quality level.

pub mod config;
pub mod error;
pub mod glossary;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod quality;
pub mod reconcile;
pub mod report;
pub mod scene;
pub mod skills;

pub use config::Config;
pub use error::{LqaError, LqaResult};
pub use pipeline::{run_batch, BatchItem, Pipeline};
pub use report::{AnalysisRequest, Issue, IssueCategory, QualityLevel, Report, Severity};
