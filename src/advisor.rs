//! The advisor: relevance gate, context assembly, model call and fallbacks.
//!
//! Every public operation returns user-facing text and never an error.
//! Model failures are logged and replaced by a fixed apology per operation;
//! the conversation log is best-effort.

use crate::assembler::{assemble, Task};
use crate::classifier::KeywordClassifier;
use crate::context::{render_profile, render_programs};
use crate::error::Result;
use crate::llm::LanguageModel;
use crate::models::{now_iso, Conversation, UserProfile};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Reply to questions outside the two programs
pub const OUT_OF_SCOPE_REPLY: &str = "Я специализируюсь только на вопросах, связанных с магистерскими программами ИТМО в области искусственного интеллекта:
• \"Искусственный интеллект\"
• \"Управление ИИ-продуктами/AI Product\"

Пожалуйста, задайте вопрос о поступлении, обучении, карьерных перспективах или других аспектах этих программ.";

pub const ANSWER_FAILED: &str =
    "Извините, произошла ошибка при обработке вашего запроса. Попробуйте еще раз.";
pub const RECOMMEND_FAILED: &str = "Не удалось сгенерировать рекомендацию. Попробуйте позже.";
pub const COMPARE_FAILED: &str = "Не удалось выполнить сравнение программ. Попробуйте позже.";
pub const ADMISSION_GUIDE_FAILED: &str = "Не удалось создать гид по поступлению. Попробуйте позже.";

/// Returned by [`Advisor::recommend_for`] when the user has no profile yet
pub const PROFILE_REQUIRED: &str = "Для получения персональных рекомендаций необходимо заполнить профиль.

Профиль поможет мне:
• Понять ваш технический бэкграунд
• Узнать ваши карьерные цели
• Предложить подходящую программу
• Рекомендовать выборные дисциплины";

pub const PROFILE_SAVED: &str = "Профиль успешно сохранен!

Теперь вы можете получить персональные рекомендации по программам и планированию обучения.";
pub const PROFILE_SAVE_FAILED: &str = "Ошибка при сохранении профиля. Попробуйте еще раз.";

/// Answers questions and generates reports from stored program data
pub struct Advisor {
    store: Arc<dyn RecordStore>,
    model: Arc<dyn LanguageModel>,
    classifier: KeywordClassifier,
}

impl Advisor {
    /// Create an advisor with the built-in keyword lists
    pub fn new(store: Arc<dyn RecordStore>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            model,
            classifier: KeywordClassifier::default(),
        }
    }

    /// Replace the relevance classifier
    pub fn with_classifier(mut self, classifier: KeywordClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Answer a free-form question from `user_id`.
    ///
    /// Out-of-scope questions get [`OUT_OF_SCOPE_REPLY`] without a model call.
    /// A successful answer is trimmed and appended to the conversation log.
    pub async fn answer(&self, question: &str, user_id: i64) -> String {
        if !self.classifier.is_relevant(question) {
            info!(user_id, "Question rejected as out of scope");
            return OUT_OF_SCOPE_REPLY.to_string();
        }

        let profile = self.user_profile(user_id);
        let profile_context = render_profile(profile.as_ref());
        let task = Task::Ask { question };

        match self.generate(&profile_context, &task).await {
            Ok(response) => {
                let entry = Conversation {
                    user_id,
                    message: question.to_string(),
                    response: response.clone(),
                    timestamp: now_iso(),
                };
                if let Err(e) = self.store.save_conversation(&entry) {
                    warn!(user_id, error = %e, "Failed to log conversation");
                }
                response
            }
            Err(e) => {
                error!(user_id, task = task.name(), error = %e, "Model call failed");
                ANSWER_FAILED.to_string()
            }
        }
    }

    /// Personalised program recommendation for a profile
    pub async fn recommend(&self, profile: &UserProfile) -> String {
        self.report(&Task::Recommend { profile }, RECOMMEND_FAILED)
            .await
    }

    /// Recommendation for a stored profile, or [`PROFILE_REQUIRED`] without one
    pub async fn recommend_for(&self, user_id: i64) -> String {
        match self.user_profile(user_id) {
            Some(profile) => self.recommend(&profile).await,
            None => PROFILE_REQUIRED.to_string(),
        }
    }

    /// Side-by-side comparison of the programs
    pub async fn compare(&self) -> String {
        self.report(&Task::Compare, COMPARE_FAILED).await
    }

    /// Admission routes, dates, requirements and seat counts
    pub async fn admission_guide(&self) -> String {
        self.report(&Task::AdmissionGuide, ADMISSION_GUIDE_FAILED)
            .await
    }

    /// Store a finished profile, replacing any earlier one
    pub fn save_profile(&self, profile: &UserProfile) -> String {
        match store_profile(self.store.as_ref(), profile) {
            Ok(reply) | Err(reply) => reply.to_string(),
        }
    }

    /// Stored profile of a user; read failures count as "no profile"
    pub fn user_profile(&self, user_id: i64) -> Option<UserProfile> {
        self.store.get_user_profile(user_id).unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Failed to read profile");
            None
        })
    }

    /// Rendered context of every stored program; read failures render as empty
    pub fn programs_context(&self) -> String {
        match self.store.get_all_programs() {
            Ok(programs) => render_programs(&programs),
            Err(e) => {
                warn!(error = %e, "Failed to read programs");
                String::new()
            }
        }
    }

    /// Reports skip the relevance gate and the conversation log
    async fn report(&self, task: &Task<'_>, fallback: &str) -> String {
        match self.generate("", task).await {
            Ok(text) => text,
            Err(e) => {
                error!(task = task.name(), error = %e, "Model call failed");
                fallback.to_string()
            }
        }
    }

    async fn generate(&self, profile_context: &str, task: &Task<'_>) -> Result<String> {
        let programs_context = self.programs_context();
        let messages = assemble(&programs_context, profile_context, task);
        let params = task.params();

        debug!(
            task = task.name(),
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "Calling model"
        );

        let text = self
            .model
            .complete(&messages, params.max_tokens, params.temperature)
            .await?;
        Ok(text.trim().to_string())
    }
}

/// Save a finished profile and pick the reply for the user.
///
/// `Ok` carries [`PROFILE_SAVED`], `Err` carries [`PROFILE_SAVE_FAILED`]; the
/// store error itself is logged. Needs no model, so profile setup works
/// without an API key.
pub fn store_profile(
    store: &dyn RecordStore,
    profile: &UserProfile,
) -> std::result::Result<&'static str, &'static str> {
    match store.save_user_profile(profile) {
        Ok(()) => {
            info!(user_id = profile.user_id, "Profile saved");
            Ok(PROFILE_SAVED)
        }
        Err(e) => {
            error!(user_id = profile.user_id, error = %e, "Failed to save profile");
            Err(PROFILE_SAVE_FAILED)
        }
    }
}
