//! Step-by-step profile setup.
//!
//! The wizard asks for background, interests, skills and goals in that order
//! and yields a complete [`UserProfile`] after the last answer. It holds no
//! store handle; the caller saves the result.

use crate::models::{now_iso, UserProfile};
use std::collections::BTreeMap;

const BACKGROUND_PROMPT: &str = "Расскажите немного о своем образовательном/профессиональном бэкграунде.

Например:
• Какое у вас образование
• Опыт работы
• Проекты, над которыми работали
• Что изучали самостоятельно";

const INTERESTS_PROMPT: &str = "Какие области ИИ/ML вас больше всего интересуют?

Например: Машинное обучение, Компьютерное зрение, NLP, Продуктовая аналитика, AI продукты

Перечислите через запятую:";

const SKILLS_PROMPT: &str = "Какими языками программирования, фреймворками или инструментами вы владеете?

Например: Python, R, SQL, TensorFlow, PyTorch, Docker, Git

Перечислите через запятую:";

const GOALS_PROMPT: &str = "Какие у вас карьерные планы после окончания магистратуры?

Например: ML Engineer в крупной компании, Product Manager в AI стартапе, Data Scientist

Перечислите через запятую:";

/// Where the wizard is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    AwaitingBackground,
    AwaitingInterests,
    AwaitingSkills,
    AwaitingGoals,
}

impl WizardState {
    /// Question shown to the user in this state
    pub fn prompt(&self) -> &'static str {
        match self {
            WizardState::AwaitingBackground => BACKGROUND_PROMPT,
            WizardState::AwaitingInterests => INTERESTS_PROMPT,
            WizardState::AwaitingSkills => SKILLS_PROMPT,
            WizardState::AwaitingGoals => GOALS_PROMPT,
        }
    }
}

/// Result of feeding one answer to the wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardStep {
    /// Ask the next question
    Next(&'static str),
    /// All answers collected
    Complete(UserProfile),
}

/// Collects the four answers of a profile setup
#[derive(Debug, Clone)]
pub struct ProfileWizard {
    user_id: i64,
    username: String,
    state: WizardState,
    background: String,
    interests: Vec<String>,
    skills: Vec<String>,
}

impl ProfileWizard {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            state: WizardState::AwaitingBackground,
            background: String::new(),
            interests: Vec::new(),
            skills: Vec::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Question for the current state
    pub fn prompt(&self) -> &'static str {
        self.state.prompt()
    }

    /// Record the answer to the current question and move on
    pub fn advance(&mut self, input: &str) -> WizardStep {
        match self.state {
            WizardState::AwaitingBackground => {
                self.background = input.trim().to_string();
                self.state = WizardState::AwaitingInterests;
            }
            WizardState::AwaitingInterests => {
                self.interests = split_list(input);
                self.state = WizardState::AwaitingSkills;
            }
            WizardState::AwaitingSkills => {
                self.skills = split_list(input);
                self.state = WizardState::AwaitingGoals;
            }
            WizardState::AwaitingGoals => {
                return WizardStep::Complete(self.finish(split_list(input)));
            }
        }
        WizardStep::Next(self.state.prompt())
    }

    fn finish(&self, career_goals: Vec<String>) -> UserProfile {
        let now = now_iso();
        let mut background = BTreeMap::new();
        background.insert("description".to_string(), self.background.clone());

        UserProfile {
            user_id: self.user_id,
            username: self.username.clone(),
            background,
            interests: self.interests.clone(),
            technical_skills: self.skills.clone(),
            career_goals,
            preferred_program: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Split a comma-separated answer, dropping blank items
fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
