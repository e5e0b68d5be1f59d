//! Record types shared by the store, the context renderer and the scraper.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One study direction of a program with its seat counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Direction {
    pub name: String,
    /// Direction code such as `09.04.01`, empty when unknown
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub budget_places: u32,
    #[serde(default)]
    pub target_places: u32,
    #[serde(default)]
    pub contract_places: u32,
}

/// A member of the program team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub description: String,
}

/// A frequently asked question with its answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FaqEntry {
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

/// A master's program, keyed by `name`.
///
/// Written wholesale by the scraper; a save with an existing name replaces
/// the previous record including its timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Program {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub institute: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub cost: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub directions: Vec<Direction>,
    /// Distinct role titles
    #[serde(default)]
    pub career_prospects: Vec<String>,
    /// Distinct partner company names
    #[serde(default)]
    pub partners: Vec<String>,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    #[serde(default)]
    pub admission_ways: Vec<String>,
    #[serde(default)]
    pub faq: Vec<FaqEntry>,
    #[serde(default)]
    pub exam_dates: Vec<String>,
    /// ISO-8601
    #[serde(default)]
    pub created_at: String,
    /// ISO-8601
    #[serde(default)]
    pub updated_at: String,
}

/// Stated preferences of one end user, keyed by `user_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UserProfile {
    /// Optional in request bodies where the id comes from the URL
    #[serde(default)]
    pub user_id: i64,
    #[serde(default)]
    pub username: String,
    /// Free-form details, at least `description`
    #[serde(default)]
    pub background: BTreeMap<String, String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub technical_skills: Vec<String>,
    #[serde(default)]
    pub career_goals: Vec<String>,
    #[serde(default)]
    pub preferred_program: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl UserProfile {
    /// Background description, empty when none was given
    pub fn background_description(&self) -> &str {
        self.background
            .get("description")
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// One answered question, appended to the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub user_id: i64,
    pub message: String,
    pub response: String,
    /// ISO-8601
    pub timestamp: String,
}

/// Current local time in ISO-8601, the format used for every stored timestamp
pub fn now_iso() -> String {
    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
}
