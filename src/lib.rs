//! Shipping container identification from images.
//!
//! A vision model extracts structured container records from a photo; every
//! `container_id` is checked against the ISO 6346 check digit, and invalid
//! identifiers are sent back to the model for correction over a bounded
//! conversation. The `eval` module benchmarks models against labelled
//! images.

pub mod config;
pub mod eval;
pub mod extraction;
pub mod image;
pub mod llm;
pub mod output;

pub use extraction::{ContainerExtractor, ExtractionError, SessionOutcome};
pub use llm::{ChatClient, OpenRouterClient};
