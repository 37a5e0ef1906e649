//! The interview session state machine.
//!
//! `InterviewSession` owns the roster and every transition a candidate goes
//! through. It is synchronous and does no I/O: the async collaborator calls
//! (question fetching, grading) happen in `SessionManager`, which feeds their
//! results into the transitions here.
//!
//! Lifecycle:
//!
//! ```text
//! CollectingInfo ──mark_ready──▶ Uploading ──begin_interview──▶ Interviewing ──6th submission──▶ Completed
//!                                    ▲                            │      ▲
//!                                    │                 focus away │      │ resume_interview
//!                                    └──restart_candidate──── Paused ◀───┘
//! ```
//!
//! Lookups of unknown ids are silent no-ops; every operation reports whether
//! it changed anything so callers can re-read state when they care.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::interview::models::{
    ActivePanel, Answer, Candidate, CandidateId, CandidatePatch, CandidateStatus, DifficultyTier,
    NewCandidate, QUESTION_COUNT, SLOT_TIERS,
};
use crate::interview::scoring::{default_summary, final_score};

/// Everything that survives a restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionState {
    /// Insertion order is preserved; candidates are only appended or removed.
    pub candidates: Vec<Candidate>,
    pub focused_candidate_id: Option<CandidateId>,
    pub interview_in_progress: bool,
}

/// A submission captured before the scorer is awaited.
///
/// `commit_submission` re-checks `index` against the candidate, so a second
/// submission racing for the same slot is discarded instead of landing in the
/// next one.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub candidate_id: CandidateId,
    pub index: usize,
    pub question: String,
    pub tier: DifficultyTier,
    pub time_spent_seconds: u32,
    /// True when this is the last slot and committing it completes the interview.
    pub completes: bool,
    answers: Vec<Answer>,
}

impl PendingSubmission {
    /// The candidate's answers with this submission filled in.
    pub fn graded_answers(&self, answer_text: &str, score: u8) -> Vec<Answer> {
        let mut answers = self.answers.clone();
        if let Some(slot) = answers.get_mut(self.index) {
            slot.answer_text = answer_text.to_string();
            slot.time_spent_seconds = self.time_spent_seconds;
            slot.score = Some(score);
        }
        answers
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Unknown candidate, not interviewing, or the expected slot did not match.
    Ignored,
    /// The slot was already advanced by another submission while this one was graded.
    Stale,
    Advanced { question_index: usize },
    Completed { final_score: u8 },
}

impl SubmitOutcome {
    pub fn changed_state(self) -> bool {
        matches!(
            self,
            SubmitOutcome::Advanced { .. } | SubmitOutcome::Completed { .. }
        )
    }
}

#[derive(Debug, Default)]
pub struct InterviewSession {
    state: SessionState,
    active_panel: ActivePanel,
}

impl InterviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a session from persisted state.
    ///
    /// A restart counts as navigating away: interviews that were running are
    /// paused and no timer is considered active. Statuses therefore round-trip
    /// exactly through `PersistedState`, but an `Interviewing` candidate comes
    /// back from here as `Paused`.
    pub fn restore(mut state: SessionState) -> Self {
        for candidate in &mut state.candidates {
            if candidate.status == CandidateStatus::Interviewing {
                candidate.status = CandidateStatus::Paused;
                info!("Paused interview for candidate {} on restore", candidate.id);
            }
        }
        state.interview_in_progress = false;
        if let Some(id) = state.focused_candidate_id {
            if !state.candidates.iter().any(|c| c.id == id) {
                warn!("Focused candidate {id} missing from restored roster, clearing focus");
                state.focused_candidate_id = None;
            }
        }
        Self {
            state,
            active_panel: ActivePanel::default(),
        }
    }

    // ── Read accessors ──────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.state.candidates
    }

    pub fn candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.state.candidates.iter().find(|c| c.id == id)
    }

    pub fn exists(&self, id: CandidateId) -> bool {
        self.candidate(id).is_some()
    }

    pub fn focused_candidate_id(&self) -> Option<CandidateId> {
        self.state.focused_candidate_id
    }

    pub fn interview_in_progress(&self) -> bool {
        self.state.interview_in_progress
    }

    pub fn active_panel(&self) -> ActivePanel {
        self.active_panel
    }

    fn candidate_mut(&mut self, id: CandidateId) -> Option<&mut Candidate> {
        self.state.candidates.iter_mut().find(|c| c.id == id)
    }

    // ── Roster ──────────────────────────────────────────────────────────

    /// Appends a candidate and focuses it. Always succeeds.
    pub fn add_candidate(&mut self, new: NewCandidate, now: DateTime<Utc>) -> &Candidate {
        let status = if new.has_contact_info() {
            CandidateStatus::Uploading
        } else {
            CandidateStatus::CollectingInfo
        };
        let candidate = Candidate {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            status,
            current_question_index: 0,
            time_remaining_seconds: 0,
            answers: Vec::new(),
            final_score: None,
            summary: None,
            resume_text: new.resume_text,
            resume_questions: Vec::new(),
            created_at: now,
            completed_at: None,
        };
        let id = candidate.id;
        info!("Added candidate {id} with status {:?}", candidate.status);
        self.state.candidates.push(candidate);
        self.focus(Some(id));
        &self.state.candidates[self.state.candidates.len() - 1]
    }

    /// Merges `patch` into the candidate. Contact fields are ignored once the
    /// interview has started. Field combinations are not validated here.
    pub fn update_candidate(&mut self, id: CandidateId, patch: CandidatePatch) -> bool {
        let Some(candidate) = self.candidate_mut(id) else {
            debug!("update_candidate: unknown candidate {id}");
            return false;
        };

        let contact_locked = candidate.status.contact_locked();
        if contact_locked && patch.touches_contact() {
            debug!("Ignoring contact changes for candidate {id}: interview already started");
        }

        let CandidatePatch {
            name,
            email,
            phone,
            resume_text,
            resume_questions,
        } = patch;

        if !contact_locked {
            if let Some(name) = name {
                candidate.name = name;
            }
            if let Some(email) = email {
                candidate.email = email;
            }
            if let Some(phone) = phone {
                candidate.phone = phone;
            }
        }
        if let Some(resume_text) = resume_text {
            candidate.resume_text = Some(resume_text);
        }
        if let Some(resume_questions) = resume_questions {
            candidate.resume_questions = resume_questions;
        }
        true
    }

    /// `CollectingInfo → Uploading` once all contact fields are present.
    pub fn mark_ready(&mut self, id: CandidateId) -> bool {
        match self.candidate_mut(id) {
            Some(c) if c.status == CandidateStatus::CollectingInfo && c.has_contact_info() => {
                c.status = CandidateStatus::Uploading;
                true
            }
            _ => false,
        }
    }

    pub fn delete_candidate(&mut self, id: CandidateId) -> bool {
        let before = self.state.candidates.len();
        self.state.candidates.retain(|c| c.id != id);
        if self.state.candidates.len() == before {
            debug!("delete_candidate: unknown candidate {id}");
            return false;
        }
        if self.state.focused_candidate_id == Some(id) {
            self.state.focused_candidate_id = None;
        }
        info!("Deleted candidate {id}");
        true
    }

    // ── Focus and presentation ──────────────────────────────────────────

    /// Focuses a candidate (or nobody). Unknown ids are ignored.
    pub fn set_focused_candidate(&mut self, id: Option<CandidateId>) -> bool {
        if let Some(id) = id {
            if !self.exists(id) {
                debug!("set_focused_candidate: unknown candidate {id}");
                return false;
            }
        }
        self.focus(id);
        true
    }

    /// Moving focus away from a running interview pauses it.
    fn focus(&mut self, id: Option<CandidateId>) {
        let previous = self.state.focused_candidate_id;
        if let Some(prev) = previous.filter(|p| Some(*p) != id) {
            if let Some(c) = self.candidate_mut(prev) {
                if c.status == CandidateStatus::Interviewing {
                    c.status = CandidateStatus::Paused;
                    info!("Paused interview for candidate {prev} (focus moved away)");
                    self.state.interview_in_progress = false;
                }
            }
        }
        self.state.focused_candidate_id = id;
    }

    pub fn set_active_panel(&mut self, panel: ActivePanel) {
        self.active_panel = panel;
    }

    // ── Interview lifecycle ─────────────────────────────────────────────

    /// Marks an interview as about to start, before questions are fetched.
    ///
    /// Only candidates that have not started yet qualify. A paused interview
    /// continues through `resume_interview`, and a completed one keeps its
    /// result.
    pub fn flag_interview_starting(&mut self, id: CandidateId) -> bool {
        match self.candidate(id) {
            None => {
                debug!("start_interview: unknown candidate {id}");
                return false;
            }
            Some(c) if c.status.contact_locked() => {
                debug!("start_interview: candidate {id} is already {:?}", c.status);
                return false;
            }
            Some(_) => {}
        }
        self.state.interview_in_progress = true;
        true
    }

    /// Installs the six questions and moves the candidate to `Interviewing`.
    ///
    /// Returns false if the candidate vanished while questions were fetched,
    /// another start got there first, or the question count is wrong. When
    /// nobody ends up interviewing the in-progress flag is cleared again.
    pub fn begin_interview(&mut self, id: CandidateId, questions: Vec<String>) -> bool {
        if questions.len() != QUESTION_COUNT {
            warn!(
                "begin_interview: expected {QUESTION_COUNT} questions, got {}",
                questions.len()
            );
            self.state.interview_in_progress = false;
            return false;
        }
        let Some(candidate) = self.candidate_mut(id) else {
            debug!("begin_interview: candidate {id} no longer exists");
            self.state.interview_in_progress = false;
            return false;
        };
        if candidate.status.contact_locked() {
            debug!("begin_interview: candidate {id} is already {:?}", candidate.status);
            return false;
        }

        candidate.answers = questions
            .into_iter()
            .zip(SLOT_TIERS)
            .map(|(question, tier)| Answer::unanswered(question, tier))
            .collect();
        candidate.status = CandidateStatus::Interviewing;
        candidate.current_question_index = 0;
        candidate.time_remaining_seconds = SLOT_TIERS[0].allotted_seconds();
        candidate.final_score = None;
        candidate.summary = None;
        candidate.completed_at = None;

        self.state.interview_in_progress = true;
        info!("Interview started for candidate {id}");
        true
    }

    /// Clears the in-progress flag. Candidate statuses are untouched.
    pub fn pause_interview(&mut self) {
        self.state.interview_in_progress = false;
    }

    /// `Paused → Interviewing` at the same slot with a fresh timer.
    pub fn resume_interview(&mut self, id: CandidateId) -> bool {
        let resumable = self.candidate(id).is_some_and(|c| {
            c.status == CandidateStatus::Paused && c.answers.len() == QUESTION_COUNT
        });
        if !resumable {
            debug!("resume_interview: candidate {id} is not paused");
            return false;
        }

        self.focus(Some(id));
        let Some(candidate) = self.candidate_mut(id) else {
            return false;
        };
        let tier = DifficultyTier::for_slot(candidate.current_question_index)
            .unwrap_or(DifficultyTier::Easy);
        candidate.status = CandidateStatus::Interviewing;
        candidate.time_remaining_seconds = tier.allotted_seconds();
        self.state.interview_in_progress = true;
        info!("Resumed interview for candidate {id}");
        true
    }

    /// Throws away interview progress and returns the candidate to `Uploading`.
    pub fn restart_candidate(&mut self, id: CandidateId) -> bool {
        let focused = self.state.focused_candidate_id == Some(id);
        let Some(candidate) = self.candidate_mut(id) else {
            debug!("restart_candidate: unknown candidate {id}");
            return false;
        };
        if candidate.status == CandidateStatus::Completed {
            debug!("restart_candidate: candidate {id} already completed");
            return false;
        }
        candidate.status = CandidateStatus::Uploading;
        candidate.current_question_index = 0;
        candidate.time_remaining_seconds = 0;
        candidate.answers.clear();
        if focused {
            self.state.interview_in_progress = false;
        }
        info!("Restarted candidate {id}");
        true
    }

    /// One tick of the countdown, floored at zero. Returns the remaining time.
    ///
    /// Reaching zero does not submit anything; the caller is expected to call
    /// `submit_answer` with whatever text was entered.
    pub fn decrement_timer(&mut self, id: CandidateId) -> Option<u32> {
        let candidate = self.candidate_mut(id)?;
        if candidate.status != CandidateStatus::Interviewing {
            return None;
        }
        candidate.time_remaining_seconds = candidate.time_remaining_seconds.saturating_sub(1);
        Some(candidate.time_remaining_seconds)
    }

    /// Captures the active slot for grading.
    ///
    /// `expected_index` guards timer-driven submissions: if the slot already
    /// moved on, the submission is dropped.
    pub fn prepare_submission(
        &self,
        id: CandidateId,
        expected_index: Option<usize>,
    ) -> Option<PendingSubmission> {
        let candidate = self.candidate(id)?;
        if candidate.status != CandidateStatus::Interviewing {
            debug!("submit_answer: candidate {id} is not interviewing");
            return None;
        }
        let index = candidate.current_question_index;
        if let Some(expected) = expected_index.filter(|e| *e != index) {
            warn!("submit_answer: candidate {id} is on slot {index}, submission was for slot {expected}");
            return None;
        }
        let slot = candidate.answers.get(index)?;

        Some(PendingSubmission {
            candidate_id: id,
            index,
            question: slot.question.clone(),
            tier: slot.difficulty_tier,
            time_spent_seconds: slot
                .difficulty_tier
                .allotted_seconds()
                .saturating_sub(candidate.time_remaining_seconds),
            completes: index + 1 == candidate.answers.len(),
            answers: candidate.answers.clone(),
        })
    }

    /// Writes a graded answer and advances to the next slot or completes the interview.
    ///
    /// `summary` is only used when the submission completes the interview; a
    /// default summary is produced if none is given.
    pub fn commit_submission(
        &mut self,
        pending: &PendingSubmission,
        answer_text: String,
        score: u8,
        summary: Option<String>,
        now: DateTime<Utc>,
    ) -> SubmitOutcome {
        let id = pending.candidate_id;
        let Some(candidate) = self.candidate_mut(id) else {
            debug!("submit_answer: candidate {id} deleted while grading");
            return SubmitOutcome::Ignored;
        };
        if candidate.status != CandidateStatus::Interviewing
            || candidate.current_question_index != pending.index
            || candidate.answers.len() != QUESTION_COUNT
        {
            warn!(
                "Discarding stale submission for candidate {id} slot {}",
                pending.index
            );
            return SubmitOutcome::Stale;
        }

        let slot = &mut candidate.answers[pending.index];
        slot.answer_text = answer_text;
        slot.time_spent_seconds = pending.time_spent_seconds;
        slot.score = Some(score);

        let next = pending.index + 1;
        if let Some(tier) = candidate.answers.get(next).map(|a| a.difficulty_tier) {
            candidate.current_question_index = next;
            candidate.time_remaining_seconds = tier.allotted_seconds();
            return SubmitOutcome::Advanced {
                question_index: next,
            };
        }

        let overall = final_score(&candidate.answers);
        candidate.status = CandidateStatus::Completed;
        candidate.final_score = Some(overall);
        candidate.summary =
            Some(summary.unwrap_or_else(|| default_summary(candidate.answers.len(), overall)));
        candidate.completed_at = Some(now);
        self.state.interview_in_progress = false;
        info!("Interview completed for candidate {id} with final score {overall}/10");
        SubmitOutcome::Completed {
            final_score: overall,
        }
    }
}
