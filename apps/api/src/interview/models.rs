use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every interview has exactly this many question slots.
pub const QUESTION_COUNT: usize = 6;

/// Tier of each slot, in order. Not configurable per candidate.
pub const SLOT_TIERS: [DifficultyTier; QUESTION_COUNT] = [
    DifficultyTier::Easy,
    DifficultyTier::Easy,
    DifficultyTier::Medium,
    DifficultyTier::Medium,
    DifficultyTier::Hard,
    DifficultyTier::Hard,
];

pub type CandidateId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyTier {
    Easy,
    Medium,
    Hard,
}

impl DifficultyTier {
    /// Seconds the candidate gets to answer a question of this tier.
    pub fn allotted_seconds(self) -> u32 {
        match self {
            DifficultyTier::Easy => 20,
            DifficultyTier::Medium => 60,
            DifficultyTier::Hard => 120,
        }
    }

    pub fn for_slot(index: usize) -> Option<Self> {
        SLOT_TIERS.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DifficultyTier::Easy => "easy",
            DifficultyTier::Medium => "medium",
            DifficultyTier::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Uploading,
    CollectingInfo,
    Interviewing,
    Paused,
    Completed,
}

impl CandidateStatus {
    /// Contact fields are frozen once the interview has started.
    pub fn contact_locked(self) -> bool {
        matches!(
            self,
            CandidateStatus::Interviewing | CandidateStatus::Paused | CandidateStatus::Completed
        )
    }
}

/// One question slot of an interview.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    pub question: String,
    pub difficulty_tier: DifficultyTier,
    /// Empty until the slot is submitted.
    pub answer_text: String,
    pub time_spent_seconds: u32,
    /// 1..=10, absent until graded.
    pub score: Option<u8>,
}

impl Answer {
    pub fn unanswered(question: String, difficulty_tier: DifficultyTier) -> Self {
        Self {
            question,
            difficulty_tier,
            answer_text: String::new(),
            time_spent_seconds: 0,
            score: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CandidateStatus,
    pub current_question_index: usize,
    pub time_remaining_seconds: u32,
    pub answers: Vec<Answer>,
    pub final_score: Option<u8>,
    pub summary: Option<String>,
    #[serde(default)]
    pub resume_text: Option<String>,
    #[serde(default)]
    pub resume_questions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Candidate {
    pub fn has_contact_info(&self) -> bool {
        has_contact_info(&self.name, &self.email, &self.phone)
    }

    /// The slot the candidate is currently answering, if an interview is set up.
    pub fn current_answer(&self) -> Option<&Answer> {
        self.answers.get(self.current_question_index)
    }

    pub fn questions_answered(&self) -> usize {
        self.answers.iter().filter(|a| a.score.is_some()).count()
    }
}

fn has_contact_info(name: &str, email: &str, phone: &str) -> bool {
    [name, email, phone].iter().all(|f| !f.trim().is_empty())
}

/// Initial fields for `add_candidate`, typically pre-filled from resume extraction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCandidate {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub resume_text: Option<String>,
}

impl NewCandidate {
    pub fn has_contact_info(&self) -> bool {
        has_contact_info(&self.name, &self.email, &self.phone)
    }
}

/// Partial update merged by `update_candidate`. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidatePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub resume_text: Option<String>,
    pub resume_questions: Option<Vec<String>>,
}

impl CandidatePatch {
    pub fn touches_contact(&self) -> bool {
        self.name.is_some() || self.email.is_some() || self.phone.is_some()
    }
}

/// Which half of the UI is shown. Presentation-only, never persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivePanel {
    #[default]
    Interviewee,
    Interviewer,
}

/// What the interviewee sees for the active slot.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub question: String,
    pub difficulty_tier: DifficultyTier,
    /// 1-based.
    pub question_number: usize,
    pub total_questions: usize,
    pub allotted_seconds: u32,
    pub time_remaining_seconds: u32,
}

impl QuestionView {
    pub fn for_candidate(candidate: &Candidate) -> Option<Self> {
        let answer = candidate.current_answer()?;
        Some(Self {
            question: answer.question.clone(),
            difficulty_tier: answer.difficulty_tier,
            question_number: candidate.current_question_index + 1,
            total_questions: candidate.answers.len(),
            allotted_seconds: answer.difficulty_tier.allotted_seconds(),
            time_remaining_seconds: candidate.time_remaining_seconds,
        })
    }
}
