//! # rustabit
//!
//! Master's Program Advisor - Rust Microservice
//!
//! Answers applicant questions about the two ITMO AI master's programs
//! ("Искусственный интеллект" and "Управление ИИ-продуктами/AI Product")
//! from scraped program data, with an LLM doing the writing.
//!
//! ## Modules
//!
//! - [`advisor`] - Relevance gate, model calls and fallback replies
//! - [`assembler`] - Message sequences and generation parameters per task
//! - [`classifier`] - Keyword relevance classifier
//! - [`context`] - Program and profile context rendering
//! - [`itmo`] - Program page scraper
//! - [`llm`] - OpenAI-compatible chat completion client
//! - [`models`] - Program, profile and conversation records
//! - [`profile`] - Step-by-step profile setup
//! - [`prompts`] - Prompt templates
//! - [`store`] - Record store trait with JSON file and in-memory backends
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustabit::advisor::Advisor;
//! use rustabit::llm::{LlmConfig, OpenAiClient};
//! use rustabit::store::JsonStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(JsonStore::open("./data")?);
//!     let model = Arc::new(OpenAiClient::new(LlmConfig {
//!         api_key: std::env::var("OPENAI_API_KEY")?,
//!         ..Default::default()
//!     })?);
//!     let advisor = Advisor::new(store, model);
//!     println!("{}", advisor.answer("Какие экзамены нужно сдавать?", 1).await);
//!     Ok(())
//! }
//! ```

pub mod advisor;
pub mod assembler;
pub mod classifier;
pub mod context;
pub mod error;
pub mod itmo;
pub mod llm;
pub mod models;
pub mod profile;
pub mod prompts;
pub mod store;

pub use error::{AdvisorError, Result};
