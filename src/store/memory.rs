//! In-memory store, useful for tests and one-off runs.

use super::{validate_program, RecordStore};
use crate::error::{AdvisorError, Result};
use crate::models::{Conversation, Program, UserProfile};
use std::collections::BTreeMap;
use std::sync::RwLock;

#[derive(Default)]
struct Records {
    programs: BTreeMap<String, Program>,
    profiles: BTreeMap<i64, UserProfile>,
    conversations: Vec<Conversation>,
}

/// Store keeping every record in process memory
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Records>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the conversation log, oldest first
    pub fn conversations(&self) -> Vec<Conversation> {
        self.records
            .read()
            .map(|r| r.conversations.clone())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> AdvisorError {
    AdvisorError::Storage("memory store lock poisoned".to_string())
}

impl RecordStore for MemoryStore {
    fn get_program(&self, name: &str) -> Result<Option<Program>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.programs.get(name).cloned())
    }

    fn get_all_programs(&self) -> Result<Vec<Program>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.programs.values().cloned().collect())
    }

    fn save_program(&self, program: &Program) -> Result<()> {
        validate_program(program)?;
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .programs
            .insert(program.name.clone(), program.clone());
        Ok(())
    }

    fn get_user_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.profiles.get(&user_id).cloned())
    }

    fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.profiles.insert(profile.user_id, profile.clone());
        Ok(())
    }

    fn save_conversation(&self, entry: &Conversation) -> Result<()> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.conversations.push(entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_upsert_replaces() -> Result<()> {
        let store = MemoryStore::new();
        let mut program = Program {
            name: "AI Product".to_string(),
            cost: "599 000 ₽".to_string(),
            ..Default::default()
        };
        store.save_program(&program)?;
        program.cost = "650 000 ₽".to_string();
        store.save_program(&program)?;

        let all = store.get_all_programs()?;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].cost, "650 000 ₽");
        Ok(())
    }

    #[test]
    fn test_conversations_append() -> Result<()> {
        let store = MemoryStore::new();
        for i in 0..2 {
            store.save_conversation(&Conversation {
                user_id: 7,
                message: format!("q{i}"),
                response: format!("a{i}"),
                timestamp: "2025-07-01T10:00:00+03:00".to_string(),
            })?;
        }
        assert_eq!(store.conversations().len(), 2);
        Ok(())
    }

    #[test]
    fn test_missing_profile() -> Result<()> {
        let store = MemoryStore::new();
        assert!(store.get_user_profile(1)?.is_none());
        Ok(())
    }

    #[test]
    fn test_empty_name_rejected() -> Result<()> {
        let store = MemoryStore::new();
        assert!(matches!(
            store.save_program(&Program {
                name: "  ".to_string(),
                ..Default::default()
            }),
            Err(AdvisorError::Validation(_))
        ));
        assert!(store.get_all_programs()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_concurrent_writers() -> Result<()> {
        let store = std::sync::Arc::new(MemoryStore::new());
        std::thread::scope(|scope| {
            for user_id in 0..16 {
                let store = store.clone();
                scope.spawn(move || {
                    store
                        .save_user_profile(&UserProfile {
                            user_id,
                            username: format!("user{user_id}"),
                            ..Default::default()
                        })
                        .expect("profile save failed");
                    store
                        .save_conversation(&Conversation {
                            user_id,
                            message: "вопрос".to_string(),
                            response: "ответ".to_string(),
                            timestamp: String::new(),
                        })
                        .expect("conversation save failed");
                });
            }
        });

        for user_id in 0..16 {
            let profile = store.get_user_profile(user_id)?.expect("profile missing");
            assert_eq!(profile.username, format!("user{user_id}"));
        }
        assert_eq!(store.conversations().len(), 16);
        Ok(())
    }
}
