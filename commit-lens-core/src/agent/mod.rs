// agent module - the llm client and the multi-step analysis pipeline

pub mod api;
pub mod models;
pub mod orchestrator;
pub mod prompts;

pub use api::{ChatClient, ChatRequest, GroqClient, LlmAgent};
pub use models::{resolve_model, DEFAULT_MODEL};
pub use orchestrator::{AnalysisRun, Orchestrator, SkippedStep, Stage, StepOutcome};
