//! Builds the message sequence for each advisor task.
//!
//! Every request is `[system, user]`: the shared [`SYSTEM_PROMPT`] followed by
//! a user turn holding the programs context, the optional profile context and
//! the task directive.

use crate::context::render_applicant;
use crate::llm::ChatMessage;
use crate::models::UserProfile;
use crate::prompts::{
    build_ask_directive, build_user_prompt, ADMISSION_GUIDE_DIRECTIVE, COMPARE_DIRECTIVE,
    RECOMMEND_DIRECTIVE, SYSTEM_PROMPT,
};

/// Output bound and sampling temperature of one model call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// What the model is asked to do
#[derive(Debug, Clone, Copy)]
pub enum Task<'a> {
    /// Answer a free-form question
    Ask { question: &'a str },
    /// Pick the best-fit program for an applicant
    Recommend { profile: &'a UserProfile },
    /// Compare both programs
    Compare,
    /// Describe every admission route
    AdmissionGuide,
}

impl Task<'_> {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Task::Ask { .. } => "ask",
            Task::Recommend { .. } => "recommend",
            Task::Compare => "compare",
            Task::AdmissionGuide => "admission_guide",
        }
    }

    /// Direct answers are more conversational, reports more consistent
    pub fn params(&self) -> GenerationParams {
        match self {
            Task::Ask { .. } => GenerationParams {
                max_tokens: 1500,
                temperature: 0.7,
            },
            Task::Recommend { .. } => GenerationParams {
                max_tokens: 2000,
                temperature: 0.6,
            },
            Task::Compare | Task::AdmissionGuide => GenerationParams {
                max_tokens: 2000,
                temperature: 0.5,
            },
        }
    }

    /// Text appended after the contexts
    pub fn directive(&self) -> String {
        match self {
            Task::Ask { question } => build_ask_directive(question),
            Task::Recommend { profile } => {
                format!("{}\n{}", render_applicant(profile), RECOMMEND_DIRECTIVE)
            }
            Task::Compare => COMPARE_DIRECTIVE.to_string(),
            Task::AdmissionGuide => ADMISSION_GUIDE_DIRECTIVE.to_string(),
        }
    }
}

/// Assemble `[system, user]` for a task. `profile_context` may be empty.
pub fn assemble(programs_context: &str, profile_context: &str, task: &Task<'_>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_user_prompt(
            programs_context,
            profile_context,
            &task.directive(),
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_assemble_ask() {
        let messages = assemble(
            "ПРОГРАММА: AI",
            "ПРОФИЛЬ ПОЛЬЗОВАТЕЛЯ:",
            &Task::Ask {
                question: "Какие экзамены?",
            },
        );
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.contains("ПРОГРАММА: AI"));
        assert!(messages[1].content.contains("ПРОФИЛЬ ПОЛЬЗОВАТЕЛЯ:"));
        assert!(messages[1].content.contains("ВОПРОС ПОЛЬЗОВАТЕЛЯ: Какие экзамены?"));
    }

    #[test]
    fn test_recommend_directive_carries_profile() {
        let profile = UserProfile {
            interests: vec!["NLP".to_string()],
            ..Default::default()
        };
        let messages = assemble("", "", &Task::Recommend { profile: &profile });
        let user = &messages[1].content;
        assert!(user.contains("ПРОФИЛЬ АБИТУРИЕНТА:"));
        assert!(user.contains("NLP"));
        assert!(user.contains(RECOMMEND_DIRECTIVE));
    }

    #[test]
    fn test_reports_share_system_prompt() {
        for task in [Task::Compare, Task::AdmissionGuide] {
            let messages = assemble("ctx", "", &task);
            assert_eq!(messages[0].content, SYSTEM_PROMPT);
            assert!(messages[1].content.contains("ЗАДАЧА:"));
        }
    }

    #[test]
    fn test_params() {
        let ask = Task::Ask { question: "q" }.params();
        assert_eq!(ask.max_tokens, 1500);
        assert!((ask.temperature - 0.7).abs() < f32::EPSILON);
        assert!(Task::Compare.params().temperature < ask.temperature);
        assert_eq!(Task::AdmissionGuide.name(), "admission_guide");
    }
}
