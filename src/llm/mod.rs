pub mod analysis;
pub mod client;
pub mod images;
pub mod models;
pub mod parse;
pub mod prompts;
pub mod retry;
pub mod verify;

pub use analysis::{analyze, report_schema, AnalysisSettings};
pub use client::{GenerationBackend, GenerationRequest, OpenRouterBackend};
pub use images::{load_image, load_pair, InlineImage};
pub use models::{ModelChain, ModelStep};
pub use prompts::{analysis_prompts, verification_prompts, PromptContext, Prompts};
pub use retry::{run_chain, ChainOutput, RetryPolicy};
pub use verify::{merge_verdicts, verification_schema, verify};
