//! Program page scraper for abit.itmo.ru.
//!
//! Downloads the two program pages, extracts a [`Program`] from each with
//! text heuristics and upserts it into the record store. The pages have no
//! stable markup, so every field is best-effort and may come back empty.

use crate::error::{AdvisorError, OptionExt, Result};
use crate::models::{now_iso, Direction, FaqEntry, Program, TeamMember};
use crate::store::RecordStore;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// The two program pages
pub const PROGRAM_URLS: &[&str] = &[
    "https://abit.itmo.ru/program/master/ai",
    "https://abit.itmo.ru/program/master/ai_product",
];

/// User agent string for requests
pub const DEFAULT_USER_AGENT: &str = "AI-Master-2025-Chatbot/1.0";

const DIRECTION_TERMS: &[&str] = &[
    "информатика",
    "инноватика",
    "инфокоммуникационные",
    "математическое",
];

const ADMISSION_TERMS: &[&str] = &["экзамен", "конкурс", "портфолио", "олимпиада"];

const KNOWN_ROLES: &[&str] = &[
    "ML Engineer",
    "Data Engineer",
    "AI Product Developer",
    "Data Analyst",
    "AI Product Manager",
    "AI Project Manager",
    "Product Data Analyst",
    "AI Product Lead",
];

/// Partner logos recognised by alt text
const LOGO_PARTNERS: &[&str] = &["X5 Group", "Ozon Bank", "Альфа-Банк", "МТС"];

/// Partner logos recognised by image file name
const LOGO_SRC_HINTS: &[&str] = &["x5group", "ozonbank", "alphabank", "mts"];

const KNOWN_COMPANIES: &[&str] = &[
    "X5 Group",
    "Ozon Bank",
    "МТС",
    "Sber AI",
    "Норникель",
    "Napoleon IT",
    "Genotek",
    "Raft",
    "AIRI",
    "DeepPavlov",
    "Яндекс",
    "Газпромбанк",
    "Альфа-Банк",
    "Tinkoff",
    "Wildberries",
    "Huawei",
];

const MAX_DESCRIPTION_CHARS: usize = 1000;
const MIN_DESCRIPTION_BLOCK_CHARS: usize = 200;
const MAX_FAQ_ANSWER_CHARS: usize = 500;
const MAX_TEAM_MEMBERS: usize = 5;

/// Scraper configuration
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub user_agent: String,
    /// Pause between two page downloads
    pub delay_secs: u64,
    pub timeout_secs: u64,
    pub urls: Vec<String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            delay_secs: 1,
            timeout_secs: 30,
            urls: PROGRAM_URLS.iter().map(|u| u.to_string()).collect(),
        }
    }
}

/// Downloads program pages and stores the parsed programs
pub struct ProgramScraper {
    client: reqwest::Client,
    config: ScraperConfig,
}

impl ProgramScraper {
    pub fn new(config: ScraperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Download and parse one program page
    pub async fn fetch_program(&self, url: &str) -> Result<Program> {
        let url = Url::parse(url)
            .map_err(|e| AdvisorError::Config(format!("Invalid program URL '{}': {}", url, e)))?;

        debug!(url = %url, "Fetching program page");

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AdvisorError::RateLimited(60));
        }
        if !status.is_success() {
            return Err(AdvisorError::Api {
                code: i32::from(status.as_u16()),
                message: format!("HTTP error: {}", status),
            });
        }

        let html = response.text().await?;
        parse_program_page(&html, url.as_str())
    }

    /// Scrape every configured page into `store`, returning how many were saved.
    ///
    /// A page that fails is logged and skipped.
    pub async fn scrape_into(&self, store: &dyn RecordStore) -> usize {
        let mut saved = 0;

        for (idx, url) in self.config.urls.iter().enumerate() {
            if idx > 0 {
                // small jitter on top of the configured delay
                let jitter = rand::random::<u64>() % 500;
                let delay = Duration::from_secs(self.config.delay_secs)
                    + Duration::from_millis(jitter);
                tokio::time::sleep(delay).await;
            }

            info!(url = %url, "Parsing program page");

            let mut program = match self.fetch_program(url).await {
                Ok(program) => program,
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to scrape program page");
                    continue;
                }
            };

            let now = now_iso();
            program.created_at = now.clone();
            program.updated_at = now;

            match store.save_program(&program) {
                Ok(()) => {
                    info!(name = %program.name, "Saved program");
                    saved += 1;
                }
                Err(e) => warn!(name = %program.name, error = %e, "Failed to save program"),
            }
        }

        info!(saved, total = self.config.urls.len(), "Scrape complete");
        saved
    }
}

/// Compiled patterns used by the extractors
struct Patterns {
    duration: Regex,
    cost: Regex,
    code: Regex,
    budget: Regex,
    target: Regex,
    contract: Regex,
    role: Regex,
    date: Regex,
}

impl Patterns {
    fn new() -> Result<Self> {
        let re = |p: &str| Regex::new(p).map_err(|e| AdvisorError::Parse(e.to_string()));
        Ok(Self {
            duration: re(r"(\d+\s*года?)")?,
            cost: re(r"(\d+\s*\d*\s*000\s*₽)")?,
            code: re(r"(\d{2}\.\d{2}\.\d{2})")?,
            budget: re(r"(\d+)\s*бюджетных")?,
            target: re(r"(\d+)\s*целевая")?,
            contract: re(r"(\d+)\s*контрактных")?,
            role: re(r"[–-]\s*([A-Za-z\s]+(?:Engineer|Manager|Developer|Analyst|Lead))")?,
            date: re(r"\d{2}\.\d{2}\.\d{4}")?,
        })
    }
}

fn selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AdvisorError::Parse(e.to_string()))
}

/// Collapse runs of whitespace
fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Full text of an element, whitespace collapsed
fn element_text(el: &ElementRef<'_>) -> String {
    clean(&el.text().collect::<String>())
}

/// Text nodes that are direct children of an element
fn own_text(el: &ElementRef<'_>) -> String {
    let mut text = String::new();
    for child in el.children() {
        if let Some(t) = child.value().as_text() {
            text.push_str(t);
        }
    }
    clean(&text)
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn push_unique(items: &mut Vec<String>, item: String) {
    if !item.is_empty() && !items.contains(&item) {
        items.push(item);
    }
}

/// Parse a program page.
///
/// Fails only when the page has no `<h1>` program name.
pub fn parse_program_page(html: &str, url: &str) -> Result<Program> {
    let document = Html::parse_document(html);
    let patterns = Patterns::new()?;
    let page_text = document.root_element().text().collect::<String>();

    let h1 = selector("h1")?;
    let name = document
        .select(&h1)
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
        .ok_or_parse("program name (h1) not found")?;

    let mut program = Program {
        name,
        url: url.to_string(),
        description: extract_description(&document)?,
        directions: extract_directions(&document, &patterns)?,
        career_prospects: extract_career_prospects(&document, &patterns, &page_text)?,
        partners: extract_partners(&document, &page_text)?,
        team: extract_team(&document)?,
        admission_ways: extract_admission_ways(&document)?,
        faq: extract_faq(&document)?,
        exam_dates: extract_exam_dates(&document, &patterns)?,
        ..Default::default()
    };
    extract_basic_info(&document, &patterns, &page_text, &mut program)?;

    debug!(
        name = %program.name,
        directions = program.directions.len(),
        faq = program.faq.len(),
        "Parsed program page"
    );

    Ok(program)
}

fn extract_basic_info(
    document: &Html,
    patterns: &Patterns,
    page_text: &str,
    program: &mut Program,
) -> Result<()> {
    let faculty = selector(r#"a[href*="viewfaculty"]"#)?;
    if let Some(link) = document.select(&faculty).next() {
        program.institute = element_text(&link);
    }

    if let Some(m) = patterns.duration.captures(page_text).and_then(|c| c.get(1)) {
        program.duration = clean(m.as_str());
    }

    let lower = page_text.to_lowercase();
    if lower.contains("русский") {
        program.language = "русский".to_string();
    } else if lower.contains("english") {
        program.language = "английский".to_string();
    }

    if let Some(m) = patterns.cost.captures(page_text).and_then(|c| c.get(1)) {
        program.cost = clean(m.as_str());
    }

    Ok(())
}

/// First element of `tag` after `el` in document order, descendants included
fn find_next<'a>(document: &'a Html, el: &ElementRef<'a>, tag: &str) -> Result<Option<ElementRef<'a>>> {
    let any = selector(tag)?;
    let anchor = el.id();
    let mut passed = false;
    let everything = selector("*")?;
    for candidate in document.select(&everything) {
        if candidate.id() == anchor {
            passed = true;
            continue;
        }
        if passed && any.matches(&candidate) {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}

fn extract_description(document: &Html) -> Result<String> {
    let about = selector("section#about")?;
    if let Some(section) = document.select(&about).next() {
        if let Some(content) = find_next(document, &section, "div")? {
            let text = element_text(&content);
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }

    let divs = selector("div")?;
    let block = document
        .select(&divs)
        .map(|d| own_text(&d))
        .find(|t| t.chars().count() > MIN_DESCRIPTION_BLOCK_CHARS);

    Ok(block
        .map(|t| truncate_chars(&t, MAX_DESCRIPTION_CHARS))
        .unwrap_or_default())
}

fn extract_directions(document: &Html, patterns: &Patterns) -> Result<Vec<Direction>> {
    let h5 = selector("h5")?;
    let mut directions = Vec::new();

    for header in document.select(&h5) {
        let title = own_text(&header);
        let lower = title.to_lowercase();
        if !DIRECTION_TERMS.iter().any(|t| lower.contains(t)) {
            continue;
        }

        let mut direction = Direction {
            name: element_text(&header),
            ..Default::default()
        };

        if let Some(parent) = header.parent().and_then(ElementRef::wrap) {
            let text = parent.text().collect::<String>();
            let count = |re: &Regex| {
                re.captures(&text)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<u32>().ok())
                    .unwrap_or(0)
            };
            direction.budget_places = count(&patterns.budget);
            direction.target_places = count(&patterns.target);
            direction.contract_places = count(&patterns.contract);
            if let Some(m) = patterns.code.captures(&text).and_then(|c| c.get(1)) {
                direction.code = m.as_str().to_string();
            }
        }

        directions.push(direction);
    }

    Ok(directions)
}

fn extract_career_prospects(
    document: &Html,
    patterns: &Patterns,
    page_text: &str,
) -> Result<Vec<String>> {
    let mut prospects = Vec::new();

    let blocks = selector("section, div")?;
    let career = document
        .select(&blocks)
        .find(|el| own_text(el).to_lowercase().contains("карьера"));

    if let Some(section) = career {
        if let Some(next) = find_next(document, &section, "div")? {
            let text = next.text().collect::<String>();
            for caps in patterns.role.captures_iter(&text) {
                if let Some(role) = caps.get(1) {
                    push_unique(&mut prospects, clean(role.as_str()));
                }
            }
        }
    }

    for role in KNOWN_ROLES {
        if page_text.contains(role) {
            push_unique(&mut prospects, role.to_string());
        }
    }

    Ok(prospects)
}

fn extract_partners(document: &Html, page_text: &str) -> Result<Vec<String>> {
    let mut partners = Vec::new();

    let logos = selector("div.partners img")?;
    for img in document.select(&logos) {
        if let Some(alt) = img.value().attr("alt") {
            push_unique(&mut partners, clean(alt));
        }
    }

    let images = selector("img[alt]")?;
    for img in document.select(&images) {
        let alt = img.value().attr("alt").unwrap_or_default();
        let src = img
            .value()
            .attr("src")
            .unwrap_or_default()
            .to_lowercase();
        if LOGO_PARTNERS.iter().any(|c| alt.contains(c))
            || LOGO_SRC_HINTS.iter().any(|h| src.contains(h))
        {
            push_unique(&mut partners, clean(alt));
        }
    }

    for company in KNOWN_COMPANIES {
        if page_text.contains(company) {
            push_unique(&mut partners, company.to_string());
        }
    }

    Ok(partners)
}

fn extract_team(document: &Html) -> Result<Vec<TeamMember>> {
    let divs = selector("div")?;
    let name_tags = selector("h3, h4, strong")?;

    let Some(heading) = document
        .select(&divs)
        .find(|el| own_text(el).to_lowercase().contains("команда"))
    else {
        return Ok(Vec::new());
    };

    let team = heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "div")
        .take(MAX_TEAM_MEMBERS)
        .filter_map(|card| {
            let name = card.select(&name_tags).next().map(|n| element_text(&n))?;
            if name.is_empty() {
                return None;
            }
            let text = card.text().collect::<String>().to_lowercase();
            let position = if text.contains("руководитель") {
                "Руководитель программы"
            } else if text.contains("доцент") {
                "Доцент"
            } else if text.contains("преподаватель") {
                "Преподаватель"
            } else {
                ""
            };
            Some(TeamMember {
                name,
                position: position.to_string(),
                description: String::new(),
            })
        })
        .collect();

    Ok(team)
}

fn extract_admission_ways(document: &Html) -> Result<Vec<String>> {
    let h5 = selector("h5")?;
    Ok(document
        .select(&h5)
        .map(|h| element_text(&h))
        .filter(|t| {
            let lower = t.to_lowercase();
            ADMISSION_TERMS.iter().any(|term| lower.contains(term))
        })
        .collect())
}

fn extract_faq(document: &Html) -> Result<Vec<FaqEntry>> {
    let sections = selector("section")?;
    let headings = selector("h1, h2, h3, h4")?;
    let h5 = selector("h5")?;

    let faq_section = document.select(&sections).find(|s| {
        own_text(s).to_lowercase().contains("вопрос")
            || s
                .select(&headings)
                .any(|h| element_text(&h).to_lowercase().contains("вопрос"))
    });

    let Some(section) = faq_section else {
        return Ok(Vec::new());
    };

    let mut faq = Vec::new();
    for q in section.select(&h5) {
        let question = element_text(&q);
        let answer_elem = match q
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "div")
        {
            Some(div) => Some(div),
            None => find_next(document, &q, "p")?,
        };
        let answer = answer_elem
            .map(|a| truncate_chars(&element_text(&a), MAX_FAQ_ANSWER_CHARS))
            .unwrap_or_default();
        faq.push(FaqEntry { question, answer });
    }

    Ok(faq)
}

fn extract_exam_dates(document: &Html, patterns: &Patterns) -> Result<Vec<String>> {
    let divs = selector("div")?;
    Ok(document
        .select(&divs)
        .map(|d| own_text(&d))
        .filter(|t| patterns.date.is_match(t))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const PAGE: &str = r#"<html><body>
<h1> Искусственный
   интеллект </h1>
<a href="https://itmo.ru/ru/viewfaculty/12/ipkn.htm">институт прикладных компьютерных наук</a>
<div class="meta">Форма обучения очная, 2 года, язык: русский, стоимость 599 000 ₽ в год</div>
<section id="about"><h2>О программе</h2><div>Создавайте AI-продукты и технологии вместе с индустрией.</div></section>
<div class="direction"><h5>Информатика и вычислительная техника</h5><p>09.04.01 51 бюджетных 4 целевая 55 контрактных</p></div>
<div class="direction"><h5>Прикладная математика</h5><p>01.04.02 10 бюджетных</p></div>
<div>Карьера</div>
<div>Выпускники работают: - ML Engineer, - Data Engineer</div>
<div class="partners"><img alt="Sber AI" src="/logos/sber.png"><img alt="" src="/x.png"></div>
<img alt="X5 Group" src="/logos/x5group.svg">
<div>Команда программы</div>
<div><h4>Иван Иванов</h4><span>Руководитель программы</span></div>
<div><strong>Мария Петрова</strong><span>доцент факультета</span></div>
<h5>Вступительный экзамен</h5>
<h5>Конкурс портфолио</h5>
<section><h2>Частые вопросы</h2>
  <h5>Есть ли общежитие?</h5><div>Да, для иногородних студентов.</div>
  <h5>Можно ли учиться онлайн?</h5><div>Нет.</div>
</section>
<div>Экзамен 15.07.2025</div>
</body></html>"#;

    fn parsed() -> Program {
        parse_program_page(PAGE, "https://abit.itmo.ru/program/master/ai").expect("Parse failed")
    }

    #[test]
    fn test_basic_info() {
        let program = parsed();
        assert_eq!(program.name, "Искусственный интеллект");
        assert_eq!(program.url, "https://abit.itmo.ru/program/master/ai");
        assert_eq!(program.institute, "институт прикладных компьютерных наук");
        assert_eq!(program.duration, "2 года");
        assert_eq!(program.language, "русский");
        assert_eq!(program.cost, "599 000 ₽");
        assert_eq!(
            program.description,
            "Создавайте AI-продукты и технологии вместе с индустрией."
        );
    }

    #[test]
    fn test_directions() {
        let program = parsed();
        assert_eq!(program.directions.len(), 1);
        let direction = &program.directions[0];
        assert_eq!(direction.name, "Информатика и вычислительная техника");
        assert_eq!(direction.code, "09.04.01");
        assert_eq!(direction.budget_places, 51);
        assert_eq!(direction.target_places, 4);
        assert_eq!(direction.contract_places, 55);
    }

    #[test]
    fn test_lists() {
        let program = parsed();
        assert!(program.career_prospects.contains(&"ML Engineer".to_string()));
        assert!(program.career_prospects.contains(&"Data Engineer".to_string()));
        assert_eq!(
            program
                .career_prospects
                .iter()
                .filter(|r| r.as_str() == "ML Engineer")
                .count(),
            1
        );
        assert!(program.partners.contains(&"Sber AI".to_string()));
        assert!(program.partners.contains(&"X5 Group".to_string()));
        assert!(!program.partners.iter().any(|p| p.is_empty()));
        assert_eq!(
            program.admission_ways,
            vec!["Вступительный экзамен", "Конкурс портфолио"]
        );
        assert_eq!(program.exam_dates, vec!["Экзамен 15.07.2025"]);
    }

    #[test]
    fn test_team() {
        let program = parsed();
        assert_eq!(program.team.len(), 2);
        assert_eq!(program.team[0].name, "Иван Иванов");
        assert_eq!(program.team[0].position, "Руководитель программы");
        assert_eq!(program.team[1].position, "Доцент");
    }

    #[test]
    fn test_faq() {
        let program = parsed();
        assert_eq!(program.faq.len(), 2);
        assert_eq!(program.faq[0].question, "Есть ли общежитие?");
        assert_eq!(program.faq[0].answer, "Да, для иногородних студентов.");
    }

    #[test]
    fn test_missing_name_is_error() {
        let result = parse_program_page("<html><body><p>пусто</p></body></html>", "u");
        assert!(matches!(result, Err(AdvisorError::Parse(_))));
    }

    #[test]
    fn test_minimal_page() -> Result<()> {
        let program = parse_program_page("<html><body><h1>AI Product</h1></body></html>", "u")?;
        assert_eq!(program.name, "AI Product");
        assert!(program.directions.is_empty());
        assert!(program.faq.is_empty());
        assert!(program.description.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_scrape_into_skips_bad_urls() -> Result<()> {
        let scraper = ProgramScraper::new(ScraperConfig {
            delay_secs: 0,
            urls: vec!["not a url".to_string()],
            ..Default::default()
        })?;
        let store = MemoryStore::new();
        assert_eq!(scraper.scrape_into(&store).await, 0);
        assert!(store.get_all_programs()?.is_empty());
        Ok(())
    }
}
