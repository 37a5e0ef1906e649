//! Question sourcing for interviews.
//!
//! `LlmQuestionProvider` asks the LLM for a fresh question per slot.
//! `FallbackQuestionProvider` draws from the built-in pools and never fails.
//! Whatever provider is injected, `SessionManager` substitutes from the same
//! pools when a call errors, so starting an interview never fails.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::interview::models::DifficultyTier;
use crate::interview::prompts::{
    render_prompt, QUESTION_PROMPT_TEMPLATE, RESUME_QUESTIONS_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::PLAIN_TEXT_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};

pub const EASY_FALLBACKS: &[&str] = &[
    "Explain the React reconciliation process.",
    "What is the Virtual DOM in React?",
    "How does event handling work in JavaScript?",
];

pub const MEDIUM_FALLBACKS: &[&str] = &[
    "Explain React hooks and their use cases.",
    "How would you optimize a slow React app?",
    "What is the difference between controlled and uncontrolled components?",
];

pub const HARD_FALLBACKS: &[&str] = &[
    "Explain closures in JavaScript with examples.",
    "How does the React Fiber architecture work?",
    "Implement a debounce function in JavaScript and explain it.",
];

/// Used whenever a resume-based question set cannot be generated.
pub const RESUME_FALLBACKS: &[&str] = &[
    "What are your key technical strengths?",
    "Explain a challenging project you worked on.",
    "How do you handle debugging complex issues?",
    "What frameworks are you most comfortable with?",
    "Where do you see yourself improving technically?",
];

#[derive(Debug, Error)]
pub enum QuestionError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("provider returned no questions")]
    Empty,
}

#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn fetch_question(&self, tier: DifficultyTier) -> Result<String, QuestionError>;

    async fn fetch_question_set(
        &self,
        resume_text: &str,
        count: usize,
    ) -> Result<Vec<String>, QuestionError>;
}

pub fn fallback_pool(tier: DifficultyTier) -> &'static [&'static str] {
    match tier {
        DifficultyTier::Easy => EASY_FALLBACKS,
        DifficultyTier::Medium => MEDIUM_FALLBACKS,
        DifficultyTier::Hard => HARD_FALLBACKS,
    }
}

/// Picks an arbitrary question from the tier's pool.
pub fn fallback_question(tier: DifficultyTier) -> String {
    let pool = fallback_pool(tier);
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(pool[0])
        .to_string()
}

pub fn fallback_question_set() -> Vec<String> {
    RESUME_FALLBACKS.iter().map(|q| q.to_string()).collect()
}

/// Offline provider: every call succeeds with a pool question.
pub struct FallbackQuestionProvider;

#[async_trait]
impl QuestionProvider for FallbackQuestionProvider {
    async fn fetch_question(&self, tier: DifficultyTier) -> Result<String, QuestionError> {
        Ok(fallback_question(tier))
    }

    async fn fetch_question_set(
        &self,
        _resume_text: &str,
        _count: usize,
    ) -> Result<Vec<String>, QuestionError> {
        Ok(fallback_question_set())
    }
}

pub struct LlmQuestionProvider {
    llm: LlmClient,
    role: String,
}

impl LlmQuestionProvider {
    pub fn new(llm: LlmClient, role: impl Into<String>) -> Self {
        Self {
            llm,
            role: role.into(),
        }
    }
}

#[async_trait]
impl QuestionProvider for LlmQuestionProvider {
    async fn fetch_question(&self, tier: DifficultyTier) -> Result<String, QuestionError> {
        let prompt = render_prompt(
            QUESTION_PROMPT_TEMPLATE,
            &[("tier", tier.as_str()), ("role", self.role.as_str())],
        );
        let text = self.llm.call_text(&prompt, PLAIN_TEXT_SYSTEM).await?;
        // Models sometimes number a single question anyway.
        parse_numbered_list(&text)
            .into_iter()
            .next()
            .ok_or(QuestionError::Empty)
    }

    async fn fetch_question_set(
        &self,
        resume_text: &str,
        count: usize,
    ) -> Result<Vec<String>, QuestionError> {
        let count_text = count.to_string();
        let prompt = render_prompt(
            RESUME_QUESTIONS_PROMPT_TEMPLATE,
            &[("resume_text", resume_text), ("count", count_text.as_str())],
        );
        let text = self.llm.call_text(&prompt, PLAIN_TEXT_SYSTEM).await?;
        let mut questions = parse_numbered_list(&text);
        if questions.is_empty() {
            return Err(QuestionError::Empty);
        }
        questions.truncate(count);
        Ok(questions)
    }
}

/// Splits "1. foo\n2) bar" style output into items.
///
/// Numbered lines start a new item; unnumbered lines continue the previous one.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match strip_list_marker(line) {
            Some(rest) if !rest.is_empty() => items.push(rest.to_string()),
            Some(_) => {}
            None => match items.last_mut() {
                Some(last) => {
                    last.push(' ');
                    last.push_str(line);
                }
                None => items.push(line.to_string()),
            },
        }
    }

    items
}

fn strip_list_marker(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(rest.trim());
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &line[digits..];
    rest.strip_prefix('.')
        .or_else(|| rest.strip_prefix(')'))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_tier_has_at_least_three_fallbacks() {
        for tier in [DifficultyTier::Easy, DifficultyTier::Medium, DifficultyTier::Hard] {
            assert!(fallback_pool(tier).len() >= 3, "{tier:?}");
        }
    }

    #[test]
    fn test_fallback_question_comes_from_tier_pool() {
        for _ in 0..20 {
            let q = fallback_question(DifficultyTier::Hard);
            assert!(HARD_FALLBACKS.contains(&q.as_str()));
        }
    }

    #[test]
    fn test_fallback_question_set_is_fixed_five() {
        let set = fallback_question_set();
        assert_eq!(set.len(), 5);
        assert_eq!(set[0], "What are your key technical strengths?");
    }

    #[test]
    fn test_parse_numbered_list_dot_and_paren() {
        let text = "1. What is Rust?\n2) Why ownership?\n\n3.   Explain lifetimes.";
        assert_eq!(
            parse_numbered_list(text),
            vec!["What is Rust?", "Why ownership?", "Explain lifetimes."]
        );
    }

    #[test]
    fn test_parse_numbered_list_joins_continuation_lines() {
        let text = "1. Describe a project where\nyou led the design.\n2. Next question?";
        assert_eq!(
            parse_numbered_list(text),
            vec!["Describe a project where you led the design.", "Next question?"]
        );
    }

    #[test]
    fn test_parse_numbered_list_unnumbered_single_question() {
        assert_eq!(
            parse_numbered_list("  How does the event loop work?  "),
            vec!["How does the event loop work?"]
        );
    }

    #[test]
    fn test_parse_numbered_list_bullets_and_empty_markers() {
        let text = "- First\n* Second\n3.\n";
        assert_eq!(parse_numbered_list(text), vec!["First", "Second"]);
    }

    #[test]
    fn test_parse_numbered_list_keeps_leading_number_words() {
        // "404 errors" has no list marker after the digits.
        assert_eq!(
            parse_numbered_list("404 errors: how do you debug them?"),
            vec!["404 errors: how do you debug them?"]
        );
    }

    #[tokio::test]
    async fn test_fallback_provider_never_fails() {
        let provider = FallbackQuestionProvider;
        let q = provider.fetch_question(DifficultyTier::Easy).await.unwrap();
        assert!(EASY_FALLBACKS.contains(&q.as_str()));
        let set = provider.fetch_question_set("resume", 3).await.unwrap();
        assert_eq!(set.len(), 5);
    }
}
