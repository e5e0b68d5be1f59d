//! Advisor prompts for the two ITMO AI master's programs.
//!
//! One system prompt is shared by every call; only the user turn differs
//! between answering a question and the three reports.

/// Persona and guardrails sent as the system message of every request
pub const SYSTEM_PROMPT: &str = r#"Ты - эксперт-консультант по магистерским программам ИТМО в области искусственного интеллекта.
Твоя задача - помочь абитуриентам выбрать подходящую программу и спланировать обучение.

У тебя есть доступ к информации о двух программах:
1. "Искусственный интеллект" - техническая программа с фокусом на ML Engineering, Data Engineering, AI Product Development
2. "Управление ИИ-продуктами/AI Product" - продуктовая программа с фокусом на AI Product Management

ВАЖНЫЕ ПРАВИЛА:
- Отвечай ТОЛЬКО на вопросы, связанные с этими двумя магистерскими программами ИТМО
- Если вопрос не касается обучения в данных магистратурах, вежливо перенаправь пользователя к релевантной теме
- Используй только проверенную информацию из базы данных
- Давай конкретные и практичные рекомендации
- Учитывай бэкграунд и цели абитуриента при составлении рекомендаций

Формат ответов:
- Структурированные и информативные
- С конкретными примерами
- С учетом карьерных перспектив
- С рекомендациями по выборным дисциплинам (если применимо)"#;

/// Directive for a free-form question
/// Placeholders: {question}
pub const ASK_TEMPLATE: &str = r#"ВОПРОС ПОЛЬЗОВАТЕЛЯ: {question}

Пожалуйста, дай подробный и полезный ответ, основанный на предоставленной информации о программах."#;

/// Five-point recommendation directive, follows the applicant block
pub const RECOMMEND_DIRECTIVE: &str = r#"ЗАДАЧА: Проанализируй профиль абитуриента и дай детальную рекомендацию:
1. Какая программа лучше подходит и почему
2. Конкретные преимущества выбранной программы для данного профиля
3. Рекомендации по подготовке к поступлению
4. Рекомендуемая траектория обучения (какие курсы/проекты выбрать)
5. Карьерные перспективы после окончания

Будь конкретным и обоснованным в своих рекомендациях."#;

/// Six-criterion comparison directive
pub const COMPARE_DIRECTIVE: &str = r#"ЗАДАЧА: Создай подробное сравнение двух программ магистратуры ИТМО:

Сравни программы по следующим критериям:
1. Фокус и специализация
2. Карьерные возможности
3. Партнеры и проекты
4. Направления подготовки и количество мест
5. Способы поступления
6. Для кого подходит каждая программа

Представь информацию в структурированном виде, выделяя ключевые различия."#;

/// Six-point admission guide directive
pub const ADMISSION_GUIDE_DIRECTIVE: &str = r#"ЗАДАЧА: Создай подробный гид по поступлению на программы магистратуры ИТМО по ИИ.

Включи следующую информацию:
1. Все способы поступления (экзамены, конкурсы, портфолио и т.д.)
2. Даты и сроки
3. Требования и документы
4. Советы по подготовке к каждому способу поступления
5. Количество мест на каждом направлении
6. Стоимость обучения и возможности получения стипендий

Структурируй информацию так, чтобы она была максимально полезна для абитуриента."#;

/// Build the directive for a free-form question
pub fn build_ask_directive(question: &str) -> String {
    ASK_TEMPLATE.replace("{question}", question)
}

/// Concatenate the contexts and the task directive into the user turn.
///
/// `profile_context` may be empty.
pub fn build_user_prompt(programs_context: &str, profile_context: &str, directive: &str) -> String {
    format!("{programs_context}\n\n{profile_context}\n\n{directive}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ask_directive() {
        let directive = build_ask_directive("Сколько бюджетных мест?");
        assert!(directive.starts_with("ВОПРОС ПОЛЬЗОВАТЕЛЯ: Сколько бюджетных мест?"));
        assert!(!directive.contains("{question}"));
    }

    #[test]
    fn test_build_user_prompt_order() {
        let prompt = build_user_prompt("PROGRAMS", "PROFILE", "TASK");
        let programs = prompt.find("PROGRAMS").expect("programs missing");
        let profile = prompt.find("PROFILE").expect("profile missing");
        let task = prompt.find("TASK").expect("task missing");
        assert!(programs < profile && profile < task);
    }

    #[test]
    fn test_directives_are_numbered() {
        assert!(RECOMMEND_DIRECTIVE.contains("5. "));
        assert!(COMPARE_DIRECTIVE.contains("6. "));
        assert!(ADMISSION_GUIDE_DIRECTIVE.contains("6. "));
    }
}
