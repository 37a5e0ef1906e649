//! Answer scoring: a pluggable grader for submitted answers.
//!
//! Default: `HeuristicAnswerScorer` (deterministic, no network).
//! With an API key: `LlmAnswerScorer`, which grades through the LLM client.
//!
//! `SessionManager` holds an `Arc<dyn AnswerScorer>` and falls back to the
//! heuristic whenever the injected scorer fails.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::interview::models::{Answer, DifficultyTier};
use crate::interview::prompts::{
    render_prompt, SCORE_PROMPT_TEMPLATE, SCORE_SYSTEM, SUMMARY_PROMPT_TEMPLATE,
};
use crate::llm_client::prompts::PLAIN_TEXT_SYSTEM;
use crate::llm_client::{LlmClient, LlmError};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 10;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait AnswerScorer: Send + Sync {
    /// Grades one answer. Implementations may return any integer; callers clamp to 1..=10.
    async fn score(&self, question: &str, answer: &str) -> Result<i64, ScoringError>;

    /// Free-text evaluation of a finished interview.
    async fn summarize(&self, answers: &[Answer], final_score: u8) -> Result<String, ScoringError>;
}

/// Integer-floor mean of the slot scores. Ungraded slots count as 0.
pub fn final_score(answers: &[Answer]) -> u8 {
    if answers.is_empty() {
        return 0;
    }
    let total: u32 = answers.iter().map(|a| a.score.unwrap_or(0) as u32).sum();
    (total / answers.len() as u32) as u8
}

pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(MIN_SCORE as i64, MAX_SCORE as i64) as u8
}

pub fn default_summary(question_count: usize, final_score: u8) -> String {
    format!(
        "Candidate completed {question_count} questions with an average score of {final_score}/10."
    )
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicAnswerScorer
// ────────────────────────────────────────────────────────────────────────────

const STOP_WORDS: &[&str] = &[
    "what", "which", "when", "where", "explain", "describe", "does", "with", "would", "your",
    "this", "that", "from", "have", "between", "their", "there", "about", "into", "work",
];

const CODE_MARKERS: &[&str] = &["()", "=>", "{", "};", "::", "const ", "let ", "function"];

/// Deterministic grader used when no LLM is configured and as the fallback
/// for a failing `LlmAnswerScorer`.
///
/// Score = 1 + length points (0..=5) + question-term overlap (0..=3) + code marker (0..=1).
pub struct HeuristicAnswerScorer;

#[async_trait]
impl AnswerScorer for HeuristicAnswerScorer {
    async fn score(&self, question: &str, answer: &str) -> Result<i64, ScoringError> {
        Ok(heuristic_score(question, answer) as i64)
    }

    async fn summarize(&self, answers: &[Answer], final_score: u8) -> Result<String, ScoringError> {
        Ok(heuristic_summary(answers, final_score))
    }
}

pub fn heuristic_score(question: &str, answer: &str) -> u8 {
    let answer = answer.trim();
    if answer.is_empty() {
        return MIN_SCORE;
    }

    let words = answer.split_whitespace().count();
    let length_points = match words {
        0..=4 => 0,
        5..=19 => 1,
        20..=59 => 3,
        60..=149 => 4,
        _ => 5,
    };

    let question_terms = significant_terms(question);
    let overlap = significant_terms(answer)
        .intersection(&question_terms)
        .count()
        .min(3) as i64;

    let code_points = CODE_MARKERS.iter().any(|m| answer.contains(m)) as i64;

    clamp_score(1 + length_points + overlap + code_points)
}

fn significant_terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 4)
        .map(str::to_lowercase)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn heuristic_summary(answers: &[Answer], final_score: u8) -> String {
    let mut summary = default_summary(answers.len(), final_score);

    let unanswered = answers
        .iter()
        .filter(|a| a.answer_text.trim().is_empty())
        .count();
    if unanswered > 0 {
        summary.push_str(&format!(" {unanswered} question(s) were left unanswered."));
    }

    let strongest = [DifficultyTier::Easy, DifficultyTier::Medium, DifficultyTier::Hard]
        .into_iter()
        .filter_map(|tier| {
            let scores: Vec<u32> = answers
                .iter()
                .filter(|a| a.difficulty_tier == tier)
                .filter_map(|a| a.score.map(u32::from))
                .collect();
            if scores.is_empty() {
                None
            } else {
                Some((tier, scores.iter().sum::<u32>() / scores.len() as u32))
            }
        })
        .max_by_key(|(_, avg)| *avg);

    if let Some((tier, avg)) = strongest {
        summary.push_str(&format!(
            " Strongest on {} questions (average {avg}/10).",
            tier.as_str()
        ));
    }
    summary
}

// ────────────────────────────────────────────────────────────────────────────
// LlmAnswerScorer
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ScoreVerdict {
    score: i64,
    #[allow(dead_code)]
    #[serde(default)]
    rationale: Option<String>,
}

/// Grades answers with the LLM. Errors propagate so the manager can fall back.
pub struct LlmAnswerScorer(pub LlmClient);

#[async_trait]
impl AnswerScorer for LlmAnswerScorer {
    async fn score(&self, question: &str, answer: &str) -> Result<i64, ScoringError> {
        if answer.trim().is_empty() {
            return Ok(MIN_SCORE as i64);
        }
        let prompt = render_prompt(
            SCORE_PROMPT_TEMPLATE,
            &[("question", question), ("answer", answer)],
        );
        let verdict: ScoreVerdict = self.0.call_json(&prompt, SCORE_SYSTEM).await?;
        Ok(verdict.score)
    }

    async fn summarize(&self, answers: &[Answer], final_score: u8) -> Result<String, ScoringError> {
        let score_text = final_score.to_string();
        let transcript = render_transcript(answers);
        let prompt = render_prompt(
            SUMMARY_PROMPT_TEMPLATE,
            &[("final_score", score_text.as_str()), ("transcript", transcript.as_str())],
        );
        Ok(self.0.call_text(&prompt, PLAIN_TEXT_SYSTEM).await?)
    }
}

fn render_transcript(answers: &[Answer]) -> String {
    answers
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let answer = if a.answer_text.trim().is_empty() {
                "(no answer)"
            } else {
                a.answer_text.as_str()
            };
            format!(
                "Q{} [{}]: {}\nA: {}\nScore: {}/10",
                i + 1,
                a.difficulty_tier.as_str(),
                a.question,
                answer,
                a.score.unwrap_or(0)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graded(tier: DifficultyTier, text: &str, score: u8) -> Answer {
        Answer {
            question: "Q".to_string(),
            difficulty_tier: tier,
            answer_text: text.to_string(),
            time_spent_seconds: 5,
            score: Some(score),
        }
    }

    #[test]
    fn test_final_score_floors_mean() {
        let answers: Vec<Answer> = [7, 8, 6, 9, 5, 7]
            .into_iter()
            .map(|s| graded(DifficultyTier::Easy, "x", s))
            .collect();
        assert_eq!(final_score(&answers), 7);
    }

    #[test]
    fn test_final_score_counts_ungraded_as_zero() {
        let mut answers = vec![graded(DifficultyTier::Easy, "x", 9); 5];
        answers.push(Answer::unanswered("Q".to_string(), DifficultyTier::Hard));
        // 45 / 6 = 7.5 → 7
        assert_eq!(final_score(&answers), 7);
    }

    #[test]
    fn test_final_score_empty_is_zero() {
        assert_eq!(final_score(&[]), 0);
    }

    #[test]
    fn test_clamp_score_bounds() {
        assert_eq!(clamp_score(-3), 1);
        assert_eq!(clamp_score(0), 1);
        assert_eq!(clamp_score(7), 7);
        assert_eq!(clamp_score(42), 10);
    }

    #[test]
    fn test_heuristic_empty_answer_scores_minimum() {
        assert_eq!(heuristic_score("What is the Virtual DOM?", "   "), 1);
    }

    #[test]
    fn test_heuristic_rewards_relevant_detail() {
        let question = "Explain React hooks and their use cases.";
        let short = heuristic_score(question, "not sure");
        let long = heuristic_score(
            question,
            "React hooks such as useState and useEffect let function components hold state \
             and run side effects. Custom hooks extract reusable stateful logic, for example \
             a useFetch hook that wraps loading and error state. Hooks must be called at the \
             top level so React can keep their order stable between renders.",
        );
        assert!(long > short, "long={long} short={short}");
        assert!(long <= 10);
    }

    #[test]
    fn test_heuristic_is_deterministic() {
        let q = "Implement a debounce function in JS and explain.";
        let a = "function debounce(fn, ms) { let t; return (...args) => { clearTimeout(t); t = setTimeout(() => fn(...args), ms); }; }";
        assert_eq!(heuristic_score(q, a), heuristic_score(q, a));
    }

    #[test]
    fn test_heuristic_summary_mentions_unanswered_and_strongest_tier() {
        let answers = vec![
            graded(DifficultyTier::Easy, "a", 4),
            graded(DifficultyTier::Easy, "", 1),
            graded(DifficultyTier::Medium, "b", 6),
            graded(DifficultyTier::Medium, "c", 6),
            graded(DifficultyTier::Hard, "d", 9),
            graded(DifficultyTier::Hard, "e", 9),
        ];
        let summary = heuristic_summary(&answers, 5);
        assert!(summary.starts_with("Candidate completed 6 questions"));
        assert!(summary.contains("1 question(s) were left unanswered"));
        assert!(summary.contains("Strongest on hard questions"));
    }

    #[test]
    fn test_render_transcript_marks_missing_answers() {
        let answers = vec![Answer::unanswered(
            "What is a closure?".to_string(),
            DifficultyTier::Easy,
        )];
        let transcript = render_transcript(&answers);
        assert!(transcript.contains("Q1 [easy]: What is a closure?"));
        assert!(transcript.contains("(no answer)"));
    }

    #[tokio::test]
    async fn test_heuristic_scorer_trait_impl() {
        let scorer = HeuristicAnswerScorer;
        assert_eq!(scorer.score("Q", "").await.unwrap(), 1);
    }
}
