//! Record store for programs, user profiles and the conversation log.
//!
//! The advisor only depends on [`RecordStore`]; the binary picks the
//! file-backed [`JsonStore`], tests use [`MemoryStore`].

use crate::error::{AdvisorError, Result};
use crate::models::{Conversation, Program, UserProfile};

pub mod json;
pub mod memory;

pub use json::{default_data_dir, JsonStore};
pub use memory::MemoryStore;

/// Read/write access to the stored records.
///
/// Upserts replace the whole record under its key. Implementations must keep
/// each record intact under concurrent writers.
pub trait RecordStore: Send + Sync {
    fn get_program(&self, name: &str) -> Result<Option<Program>>;
    /// All programs, in an order that is stable for a single call
    fn get_all_programs(&self) -> Result<Vec<Program>>;
    /// Insert or replace by `name`; an empty name is a `Validation` error
    fn save_program(&self, program: &Program) -> Result<()>;
    fn get_user_profile(&self, user_id: i64) -> Result<Option<UserProfile>>;
    /// Insert or replace by `user_id`
    fn save_user_profile(&self, profile: &UserProfile) -> Result<()>;
    /// Append-only
    fn save_conversation(&self, entry: &Conversation) -> Result<()>;
}

/// Programs are keyed by name, so it must not be blank
pub(crate) fn validate_program(program: &Program) -> Result<()> {
    if program.name.trim().is_empty() {
        return Err(AdvisorError::Validation("program name is empty".to_string()));
    }
    Ok(())
}
