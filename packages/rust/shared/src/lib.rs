//! Shared types, error model, and configuration for Bidcraft.
//!
//! This crate is the foundation depended on by all other Bidcraft crates.
//! It provides:
//! - [`BidcraftError`], the unified error type
//! - Domain types ([`StructuredRequirements`], [`CapabilityMatch`], [`ScoredOpportunity`], [`Parsed`])
//! - Configuration ([`AppConfig`], [`Credentials`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AnthropicConfig, AppConfig, Credentials, FeedsConfig, MaxTokensConfig, ServerConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BidcraftError, Result};
pub use types::{
    CapabilityMatch, Contract, MatchedCapability, PARSE_FAILURE_PREFIX_CHARS, ParseFailure,
    Parsed, Priority, RawRecord, ScoredOpportunity, StructuredRequirements,
};
