//! Prompt-orchestration pipelines for Bidcraft.
//!
//! Each step is a function of typed input and a [`ModelProvider`]
//! handle; [`pipeline`] chains them per domain:
//! - proposal: [`extract`] → [`matcher`] → draft via [`composer`]
//! - BD research: [`scorer`] → brief via [`composer`], with [`market`] context
//!
//! [`ModelProvider`]: bidcraft_provider::ModelProvider

pub mod catalog;
pub mod composer;
pub mod executor;
pub mod extract;
pub mod market;
pub mod matcher;
pub mod pipeline;
pub mod prompts;
pub mod scorer;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use composer::{ComposeEvent, ComposeStream};
pub use pipeline::{
    AnalyzeOutcome, BriefParams, ProposalPipeline, ResearchOutcome, ResearchParams, ResearchPipeline,
};
pub use scorer::ScoreOutcome;
