//! Prompt module for LLM-based operations.
//!
//! Holds the shared system prompt and the task directives of the advisor.

pub mod advisor;

pub use advisor::*;
