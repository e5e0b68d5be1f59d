//! Renders stored records into text blocks for the model prompt.
//!
//! Output is Russian, matching the language of the program pages and of the
//! system prompt. Sentinels mark missing data so the model can tell
//! "nothing scraped" apart from an empty section.

use crate::models::{Direction, FaqEntry, Program, TeamMember, UserProfile};

/// Rendered in place of an empty directions list
pub const DIRECTIONS_NOT_FOUND: &str = "Информация о направлениях не найдена";

/// Rendered in place of an empty FAQ
pub const FAQ_NOT_FOUND: &str = "FAQ не найден";

/// Rendered when the user has not chosen a program
pub const PREFERRED_NOT_SPECIFIED: &str = "не указана";

/// Placeholder for a direction without a code
const CODE_PLACEHOLDER: &str = "N/A";

/// Only the first FAQ entries go into the prompt
pub const MAX_FAQ_ENTRIES: usize = 5;

/// Separator line after every program block
const RECORD_SEPARATOR: &str = "---";

/// Render every program, in the given order. Empty input renders as `""`.
pub fn render_programs(programs: &[Program]) -> String {
    programs.iter().map(render_program).collect()
}

/// Render one program block, terminated by the record separator
pub fn render_program(program: &Program) -> String {
    let mut block = format!(
        "\nПРОГРАММА: {}\n\
         URL: {}\n\
         Институт: {}\n\
         Длительность: {}\n\
         Язык обучения: {}\n\
         Стоимость: {}\n\n\
         Описание: {}\n\n\
         Направления подготовки:\n{}\n\n\
         Карьерные перспективы:\n{}\n\n\
         Партнеры:\n{}\n\n",
        program.name,
        program.url,
        program.institute,
        program.duration,
        program.language,
        program.cost,
        program.description,
        format_directions(&program.directions),
        program.career_prospects.join(", "),
        program.partners.join(", "),
    );

    if !program.team.is_empty() {
        block.push_str(&format!("Команда:\n{}\n", format_team(&program.team)));
    }

    block.push_str(&format!(
        "Способы поступления:\n{}\n\n\
         Даты экзаменов:\n{}\n\n\
         FAQ:\n{}\n\
         {}\n",
        program.admission_ways.join(", "),
        program.exam_dates.join(", "),
        format_faq(&program.faq),
        RECORD_SEPARATOR,
    ));

    block
}

/// One line pair per direction, or [`DIRECTIONS_NOT_FOUND`]
pub fn format_directions(directions: &[Direction]) -> String {
    if directions.is_empty() {
        return DIRECTIONS_NOT_FOUND.to_string();
    }

    directions
        .iter()
        .map(|d| {
            let code = if d.code.is_empty() {
                CODE_PLACEHOLDER
            } else {
                d.code.as_str()
            };
            format!(
                "- {} ({})\n  Бюджет: {}, Целевые: {}, Контракт: {}\n",
                d.name, code, d.budget_places, d.target_places, d.contract_places
            )
        })
        .collect()
}

/// Q/A pairs for the first [`MAX_FAQ_ENTRIES`] entries, or [`FAQ_NOT_FOUND`]
pub fn format_faq(faq: &[FaqEntry]) -> String {
    if faq.is_empty() {
        return FAQ_NOT_FOUND.to_string();
    }

    faq.iter()
        .take(MAX_FAQ_ENTRIES)
        .map(|qa| format!("Q: {}\nA: {}\n\n", qa.question, qa.answer))
        .collect()
}

fn format_team(team: &[TeamMember]) -> String {
    team.iter()
        .map(|m| {
            if m.position.is_empty() {
                format!("- {}\n", m.name)
            } else {
                format!("- {} ({})\n", m.name, m.position)
            }
        })
        .collect()
}

/// Profile block for free-form questions; `""` when there is no profile.
///
/// Empty lists render as empty joins rather than dropping the block.
pub fn render_profile(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile else {
        return String::new();
    };

    format!(
        "\nПРОФИЛЬ ПОЛЬЗОВАТЕЛЯ:\n\
         Интересы: {}\n\
         Технические навыки: {}\n\
         Карьерные цели: {}\n\
         Предпочитаемая программа: {}\n",
        profile.interests.join(", "),
        profile.technical_skills.join(", "),
        profile.career_goals.join(", "),
        profile
            .preferred_program
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(PREFERRED_NOT_SPECIFIED),
    )
}

/// Applicant block used by the recommendation report, includes the background
pub fn render_applicant(profile: &UserProfile) -> String {
    format!(
        "ПРОФИЛЬ АБИТУРИЕНТА:\n\
         Интересы: {}\n\
         Технические навыки: {}\n\
         Карьерные цели: {}\n\
         Дополнительная информация: {}\n",
        profile.interests.join(", "),
        profile.technical_skills.join(", "),
        profile.career_goals.join(", "),
        profile.background_description(),
    )
}

/// Human-readable profile summary shown back to the user
pub fn profile_card(profile: &UserProfile) -> String {
    fn list_or(items: &[String], fallback: &str) -> String {
        if items.is_empty() {
            fallback.to_string()
        } else {
            items.join(", ")
        }
    }

    fn day(ts: &str) -> &str {
        if ts.is_empty() {
            "N/A"
        } else {
            ts.get(..10).unwrap_or(ts)
        }
    }

    format!(
        "Мой профиль\n\n\
         Имя: {}\n\
         Интересы: {}\n\
         Технические навыки: {}\n\
         Карьерные цели: {}\n\
         Предпочитаемая программа: {}\n\n\
         Создан: {}\n\
         Обновлен: {}\n",
        profile.username,
        list_or(&profile.interests, "не указаны"),
        list_or(&profile.technical_skills, "не указаны"),
        list_or(&profile.career_goals, "не указаны"),
        profile.preferred_program.as_deref().unwrap_or("не выбрана"),
        day(&profile.created_at),
        day(&profile.updated_at),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direction(code: &str) -> Direction {
        Direction {
            name: "Информатика и вычислительная техника".to_string(),
            code: code.to_string(),
            budget_places: 51,
            target_places: 4,
            contract_places: 55,
        }
    }

    fn program() -> Program {
        Program {
            name: "Искусственный интеллект".to_string(),
            url: "https://abit.itmo.ru/program/master/ai".to_string(),
            institute: "институт прикладных компьютерных наук".to_string(),
            duration: "2 года".to_string(),
            language: "русский".to_string(),
            cost: "599 000 ₽".to_string(),
            description: "Создавайте AI-продукты".to_string(),
            directions: vec![direction("09.04.01")],
            career_prospects: vec!["ML Engineer".to_string(), "Data Engineer".to_string()],
            partners: vec!["X5 Group".to_string()],
            team: vec![TeamMember {
                name: "Иван Иванов".to_string(),
                position: "Доцент".to_string(),
                description: String::new(),
            }],
            admission_ways: vec!["Конкурс портфолио".to_string()],
            faq: vec![FaqEntry {
                question: "Сколько стоит обучение?".to_string(),
                answer: "599 000 рублей в год.".to_string(),
            }],
            exam_dates: vec!["15.07.2025".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_render_programs_empty() {
        assert_eq!(render_programs(&[]), "");
    }

    #[test]
    fn test_render_program_contains_every_field() {
        let text = render_programs(&[program()]);
        for needle in [
            "ПРОГРАММА: Искусственный интеллект",
            "https://abit.itmo.ru/program/master/ai",
            "институт прикладных компьютерных наук",
            "2 года",
            "русский",
            "599 000 ₽",
            "Создавайте AI-продукты",
            "09.04.01",
            "ML Engineer, Data Engineer",
            "X5 Group",
            "Иван Иванов (Доцент)",
            "Конкурс портфолио",
            "15.07.2025",
            "Q: Сколько стоит обучение?",
        ] {
            assert!(text.contains(needle), "missing {needle:?} in {text}");
        }
        assert!(text.trim_end().ends_with(RECORD_SEPARATOR));
    }

    #[test]
    fn test_render_program_empty_sections_use_sentinels() {
        let bare = Program {
            name: "AI Product".to_string(),
            ..Default::default()
        };
        let text = render_program(&bare);
        assert!(text.contains(DIRECTIONS_NOT_FOUND));
        assert!(text.contains(FAQ_NOT_FOUND));
        assert!(!text.contains("Команда:"));
    }

    #[test]
    fn test_format_directions() {
        let text = format_directions(&[direction("09.04.01")]);
        assert!(text.contains("Информатика и вычислительная техника (09.04.01)"));
        assert!(text.contains("Бюджет: 51"));
        assert!(text.contains("Целевые: 4"));
        assert!(text.contains("Контракт: 55"));

        let no_code = format_directions(&[direction("")]);
        assert!(no_code.contains("(N/A)"));
        assert_eq!(format_directions(&[]), DIRECTIONS_NOT_FOUND);
    }

    #[test]
    fn test_format_faq_is_bounded() {
        let faq: Vec<FaqEntry> = (0..8)
            .map(|i| FaqEntry {
                question: format!("Вопрос {i}"),
                answer: format!("Ответ {i}"),
            })
            .collect();
        let text = format_faq(&faq);
        assert_eq!(text.matches("Q: ").count(), MAX_FAQ_ENTRIES);
        assert!(text.contains("Вопрос 4"));
        assert!(!text.contains("Вопрос 5"));
        assert_eq!(format_faq(&[]), FAQ_NOT_FOUND);
    }

    #[test]
    fn test_render_profile() {
        assert_eq!(render_profile(None), "");

        let profile = UserProfile {
            user_id: 1,
            interests: vec!["NLP".to_string(), "CV".to_string()],
            ..Default::default()
        };
        let text = render_profile(Some(&profile));
        assert!(text.contains("Интересы: NLP, CV"));
        assert!(text.contains("Технические навыки: \n"));
        assert!(text.contains(PREFERRED_NOT_SPECIFIED));

        let chosen = UserProfile {
            preferred_program: Some("AI Product".to_string()),
            ..profile
        };
        assert!(render_profile(Some(&chosen)).contains("Предпочитаемая программа: AI Product"));
    }

    #[test]
    fn test_render_applicant_includes_background() {
        let mut profile = UserProfile::default();
        profile
            .background
            .insert("description".to_string(), "бакалавр ПМИ".to_string());
        let text = render_applicant(&profile);
        assert!(text.contains("Дополнительная информация: бакалавр ПМИ"));
    }

    #[test]
    fn test_profile_card() {
        let profile = UserProfile {
            user_id: 1,
            username: "anna".to_string(),
            career_goals: vec!["ML Engineer".to_string()],
            created_at: "2025-07-01T10:00:00+03:00".to_string(),
            ..Default::default()
        };
        let card = profile_card(&profile);
        assert!(card.contains("Имя: anna"));
        assert!(card.contains("Интересы: не указаны"));
        assert!(card.contains("Карьерные цели: ML Engineer"));
        assert!(card.contains("Создан: 2025-07-01\n"));
        assert!(card.contains("Обновлен: N/A"));
        assert!(card.contains("не выбрана"));
    }
}
