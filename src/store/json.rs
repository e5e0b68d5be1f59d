//! File-backed store.
//!
//! Layout of the data directory:
//!
//! - `programs.json` - map of program name to [`Program`]
//! - `profiles.json` - map of user id to [`UserProfile`]
//! - `conversations.jsonl` - one [`Conversation`] per line, append-only
//! - `.lock` - advisory lock file
//!
//! Nothing is cached between calls. Reads take a shared lock and load the
//! file; an upsert takes the exclusive lock, re-reads the map, replaces the
//! one record and writes the map back through a temp file + rename. Several
//! handles and processes (a running server next to `rustabit scrape`) can
//! share one directory without losing each other's records.

use super::{validate_program, RecordStore};
use crate::error::{AdvisorError, Result};
use crate::models::{Conversation, Program, UserProfile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const PROGRAMS_FILE: &str = "programs.json";
const PROFILES_FILE: &str = "profiles.json";
const CONVERSATIONS_FILE: &str = "conversations.jsonl";
const LOCK_FILE: &str = ".lock";

/// Default data directory: `~/.rustabit`
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".rustabit"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

/// Store persisting records as JSON files in one directory
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open (or create) a store in `dir`. Corrupt map files fail here.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let store = Self { dir };

        let _lock = store.lock_shared()?;
        let programs: BTreeMap<String, Program> = load_map(&store.path(PROGRAMS_FILE))?;
        let profiles: BTreeMap<i64, UserProfile> = load_map(&store.path(PROFILES_FILE))?;

        info!(
            dir = %store.dir.display(),
            programs = programs.len(),
            profiles = profiles.len(),
            "Opened record store"
        );

        Ok(store)
    }

    /// Get the data directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn lock_file(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(self.path(LOCK_FILE))?)
    }

    /// Held until the returned file is dropped
    fn lock_shared(&self) -> Result<File> {
        let file = self.lock_file()?;
        file.lock_shared()?;
        Ok(file)
    }

    fn lock_exclusive(&self) -> Result<File> {
        let file = self.lock_file()?;
        file.lock()?;
        Ok(file)
    }

    fn read_map<K, V>(&self, file: &str) -> Result<BTreeMap<K, V>>
    where
        K: Ord + DeserializeOwned,
        V: DeserializeOwned,
    {
        let _lock = self.lock_shared()?;
        load_map(&self.path(file))
    }

    /// Read-modify-write of one map under the exclusive lock
    fn upsert<K, V>(&self, file: &str, key: K, value: V) -> Result<()>
    where
        K: Ord + Serialize + DeserializeOwned,
        V: Serialize + DeserializeOwned,
    {
        let _lock = self.lock_exclusive()?;
        let path = self.path(file);
        let mut map: BTreeMap<K, V> = load_map(&path)?;
        map.insert(key, value);
        write_atomic(&path, &map)
    }
}

fn load_map<K, V>(path: &Path) -> Result<BTreeMap<K, V>>
where
    K: Ord + DeserializeOwned,
    V: DeserializeOwned,
{
    if !path.exists() {
        debug!("Store file not found: {:?}", path);
        return Ok(BTreeMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&content)?)
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl RecordStore for JsonStore {
    fn get_program(&self, name: &str) -> Result<Option<Program>> {
        let mut programs: BTreeMap<String, Program> = self.read_map(PROGRAMS_FILE)?;
        Ok(programs.remove(name))
    }

    fn get_all_programs(&self) -> Result<Vec<Program>> {
        let programs: BTreeMap<String, Program> = self.read_map(PROGRAMS_FILE)?;
        Ok(programs.into_values().collect())
    }

    fn save_program(&self, program: &Program) -> Result<()> {
        validate_program(program)?;
        self.upsert(PROGRAMS_FILE, program.name.clone(), program.clone())?;
        debug!(name = %program.name, "Saved program");
        Ok(())
    }

    fn get_user_profile(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let mut profiles: BTreeMap<i64, UserProfile> = self.read_map(PROFILES_FILE)?;
        Ok(profiles.remove(&user_id))
    }

    fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        self.upsert(PROFILES_FILE, profile.user_id, profile.clone())?;
        debug!(user_id = profile.user_id, "Saved user profile");
        Ok(())
    }

    fn save_conversation(&self, entry: &Conversation) -> Result<()> {
        let line = format!("{}\n", serde_json::to_string(entry)?);
        let _lock = self.lock_exclusive()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(CONVERSATIONS_FILE))?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
