//! Async front of the interview session.
//!
//! `SessionManager` wraps `InterviewSession` in a lock, runs collaborator
//! calls outside it, and saves the state after every mutation. Apart from
//! `load`, none of its operations return errors: collaborator failures fall
//! back to built-in content and save failures are logged.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::interview::models::{
    ActivePanel, Candidate, CandidateId, CandidatePatch, DifficultyTier, NewCandidate,
    QuestionView, SLOT_TIERS,
};
use crate::interview::persistence::{PersistedState, StateStore, StoreError};
use crate::interview::questions::{fallback_question, fallback_question_set, QuestionProvider};
use crate::interview::scoring::{
    clamp_score, default_summary, final_score, heuristic_score, AnswerScorer,
};
use crate::interview::session::{InterviewSession, SubmitOutcome};

/// Everything the UI needs to render either panel.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub candidates: Vec<Candidate>,
    pub focused_candidate_id: Option<CandidateId>,
    pub interview_in_progress: bool,
    pub active_panel: ActivePanel,
}

pub struct SessionManager {
    session: Mutex<InterviewSession>,
    questions: Arc<dyn QuestionProvider>,
    scorer: Arc<dyn AnswerScorer>,
    store: Arc<dyn StateStore>,
}

impl SessionManager {
    /// Restores the last saved state, or starts empty if nothing was saved.
    ///
    /// A blob that exists but cannot be read is an error and is left in place.
    pub async fn load(
        questions: Arc<dyn QuestionProvider>,
        scorer: Arc<dyn AnswerScorer>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self, StoreError> {
        let session = match store.load().await? {
            Some(persisted) => {
                info!(
                    "Restored {} candidates from {} store",
                    persisted.state.candidates.len(),
                    store.backend()
                );
                InterviewSession::restore(persisted.state)
            }
            None => InterviewSession::new(),
        };

        Ok(Self {
            session: Mutex::new(session),
            questions,
            scorer,
            store,
        })
    }

    /// Saves while the caller still holds the lock so saves land in mutation order.
    async fn persist(&self, session: &InterviewSession) {
        let persisted = PersistedState::current(session.state().clone());
        if let Err(e) = self.store.save(&persisted).await {
            error!(
                "Failed to save session state to {} store: {e}",
                self.store.backend()
            );
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub async fn snapshot(&self) -> SessionView {
        let session = self.session.lock().await;
        SessionView {
            candidates: session.candidates().to_vec(),
            focused_candidate_id: session.focused_candidate_id(),
            interview_in_progress: session.interview_in_progress(),
            active_panel: session.active_panel(),
        }
    }

    pub async fn candidates(&self) -> Vec<Candidate> {
        self.session.lock().await.candidates().to_vec()
    }

    pub async fn candidate(&self, id: CandidateId) -> Option<Candidate> {
        self.session.lock().await.candidate(id).cloned()
    }

    pub async fn exists(&self, id: CandidateId) -> bool {
        self.session.lock().await.exists(id)
    }

    pub async fn current_question(&self, id: CandidateId) -> Option<QuestionView> {
        let session = self.session.lock().await;
        session.candidate(id).and_then(QuestionView::for_candidate)
    }

    // ── Roster ──────────────────────────────────────────────────────────

    pub async fn add_candidate(&self, new: NewCandidate) -> Candidate {
        let mut session = self.session.lock().await;
        let candidate = session.add_candidate(new, Utc::now()).clone();
        self.persist(&session).await;
        candidate
    }

    pub async fn update_candidate(&self, id: CandidateId, patch: CandidatePatch) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.update_candidate(id, patch);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    pub async fn mark_ready(&self, id: CandidateId) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.mark_ready(id);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    pub async fn delete_candidate(&self, id: CandidateId) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.delete_candidate(id);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    // ── Focus and presentation ──────────────────────────────────────────

    pub async fn set_focused_candidate(&self, id: Option<CandidateId>) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.set_focused_candidate(id);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    /// Not persisted.
    pub async fn set_active_panel(&self, panel: ActivePanel) {
        self.session.lock().await.set_active_panel(panel);
    }

    // ── Interview lifecycle ─────────────────────────────────────────────

    /// Fetches six questions and moves the candidate into `Interviewing`.
    ///
    /// The in-progress flag is raised before fetching and dropped again if the
    /// candidate is deleted meanwhile. A failed fetch for any slot is replaced
    /// with a pool question, so false means the candidate is unknown, gone, or
    /// already past the start.
    pub async fn start_interview(&self, id: CandidateId) -> bool {
        {
            let mut session = self.session.lock().await;
            if !session.flag_interview_starting(id) {
                return false;
            }
            self.persist(&session).await;
        }

        let questions = join_all(SLOT_TIERS.iter().map(|tier| self.question_for(*tier))).await;

        let mut session = self.session.lock().await;
        let started = session.begin_interview(id, questions);
        if !started {
            warn!("Interview for candidate {id} did not start after fetching questions");
        }
        self.persist(&session).await;
        started
    }

    async fn question_for(&self, tier: DifficultyTier) -> String {
        match self.questions.fetch_question(tier).await {
            Ok(q) if !q.trim().is_empty() => q,
            Ok(_) => {
                warn!("Question provider returned an empty {tier:?} question, using fallback");
                fallback_question(tier)
            }
            Err(e) => {
                warn!("Question provider failed for {tier:?}, using fallback: {e}");
                fallback_question(tier)
            }
        }
    }

    pub async fn pause_interview(&self) {
        let mut session = self.session.lock().await;
        session.pause_interview();
        self.persist(&session).await;
    }

    pub async fn resume_interview(&self, id: CandidateId) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.resume_interview(id);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    pub async fn restart_candidate(&self, id: CandidateId) -> bool {
        let mut session = self.session.lock().await;
        let changed = session.restart_candidate(id);
        if changed {
            self.persist(&session).await;
        }
        changed
    }

    pub async fn decrement_timer(&self, id: CandidateId) -> Option<u32> {
        let mut session = self.session.lock().await;
        let remaining = session.decrement_timer(id);
        if remaining.is_some() {
            self.persist(&session).await;
        }
        remaining
    }

    /// Grades and records an answer for the active slot.
    ///
    /// The lock is released while the scorer runs; the slot is re-checked
    /// before committing, so of two submissions for one slot only the first
    /// to commit is kept.
    pub async fn submit_answer(
        &self,
        id: CandidateId,
        answer_text: String,
        expected_index: Option<usize>,
    ) -> SubmitOutcome {
        let pending = {
            let session = self.session.lock().await;
            match session.prepare_submission(id, expected_index) {
                Some(pending) => pending,
                None => return SubmitOutcome::Ignored,
            }
        };

        let score = match self.scorer.score(&pending.question, &answer_text).await {
            Ok(raw) => clamp_score(raw),
            Err(e) => {
                warn!(
                    "Scorer failed for candidate {id} slot {} ({}), using heuristic: {e}",
                    pending.index,
                    pending.tier.as_str()
                );
                heuristic_score(&pending.question, &answer_text)
            }
        };

        let summary = if pending.completes {
            let answers = pending.graded_answers(&answer_text, score);
            let overall = final_score(&answers);
            match self.scorer.summarize(&answers, overall).await {
                Ok(text) if !text.trim().is_empty() => Some(text),
                Ok(_) => Some(default_summary(answers.len(), overall)),
                Err(e) => {
                    warn!("Summary generation failed for candidate {id}, using default: {e}");
                    Some(default_summary(answers.len(), overall))
                }
            }
        } else {
            None
        };

        let mut session = self.session.lock().await;
        let outcome = session.commit_submission(&pending, answer_text, score, summary, Utc::now());
        if outcome.changed_state() {
            self.persist(&session).await;
        }
        outcome
    }

    /// Resume-tailored questions, or the fixed fallback set.
    pub async fn resume_questions(&self, resume_text: &str, count: usize) -> Vec<String> {
        match self.questions.fetch_question_set(resume_text, count).await {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => fallback_question_set(),
            Err(e) => {
                warn!("Resume question generation failed, using fallback set: {e}");
                fallback_question_set()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::models::{Answer, CandidateStatus, QUESTION_COUNT};
    use crate::interview::persistence::{FileStateStore, MemoryStateStore};
    use crate::interview::questions::{
        FallbackQuestionProvider, QuestionError, EASY_FALLBACKS, HARD_FALLBACKS,
        MEDIUM_FALLBACKS, RESUME_FALLBACKS,
    };
    use crate::interview::scoring::{HeuristicAnswerScorer, ScoringError};
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;
    use uuid::Uuid;

    struct FailingQuestions;

    #[async_trait]
    impl QuestionProvider for FailingQuestions {
        async fn fetch_question(&self, _tier: DifficultyTier) -> Result<String, QuestionError> {
            Err(QuestionError::Empty)
        }

        async fn fetch_question_set(
            &self,
            _resume_text: &str,
            _count: usize,
        ) -> Result<Vec<String>, QuestionError> {
            Err(QuestionError::Llm(LlmError::EmptyContent))
        }
    }

    struct TierQuestions;

    #[async_trait]
    impl QuestionProvider for TierQuestions {
        async fn fetch_question(&self, tier: DifficultyTier) -> Result<String, QuestionError> {
            Ok(format!("{} question", tier.as_str()))
        }

        async fn fetch_question_set(
            &self,
            _resume_text: &str,
            count: usize,
        ) -> Result<Vec<String>, QuestionError> {
            Ok((1..=count).map(|i| format!("Resume question {i}")).collect())
        }
    }

    /// Hands out scores in order and records the summary input.
    struct ScriptedScorer {
        scores: Vec<i64>,
        next: AtomicUsize,
    }

    impl ScriptedScorer {
        fn new(scores: &[i64]) -> Self {
            Self {
                scores: scores.to_vec(),
                next: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AnswerScorer for ScriptedScorer {
        async fn score(&self, _question: &str, _answer: &str) -> Result<i64, ScoringError> {
            let i = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores[i % self.scores.len()])
        }

        async fn summarize(&self, answers: &[Answer], final_score: u8) -> Result<String, ScoringError> {
            Ok(format!("{} answers, {final_score}/10", answers.len()))
        }
    }

    struct FailingScorer;

    #[async_trait]
    impl AnswerScorer for FailingScorer {
        async fn score(&self, _question: &str, _answer: &str) -> Result<i64, ScoringError> {
            Err(ScoringError::Llm(LlmError::RateLimited { retries: 3 }))
        }

        async fn summarize(&self, _answers: &[Answer], _final_score: u8) -> Result<String, ScoringError> {
            Err(ScoringError::Llm(LlmError::RateLimited { retries: 3 }))
        }
    }

    /// Loads nothing and fails every save.
    struct BrokenStore;

    #[async_trait]
    impl StateStore for BrokenStore {
        async fn load(&self) -> Result<Option<PersistedState>, StoreError> {
            Ok(None)
        }

        async fn save(&self, _state: &PersistedState) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk full")))
        }

        fn backend(&self) -> &'static str {
            "broken"
        }
    }

    async fn manager_with(
        questions: impl QuestionProvider + 'static,
        scorer: impl AnswerScorer + 'static,
        store: Arc<dyn StateStore>,
    ) -> SessionManager {
        SessionManager::load(Arc::new(questions), Arc::new(scorer), store)
            .await
            .unwrap()
    }

    fn ready() -> NewCandidate {
        NewCandidate {
            name: "Jo".to_string(),
            email: "jo@x.com".to_string(),
            phone: "555-1000".to_string(),
            resume_text: None,
        }
    }

    #[tokio::test]
    async fn test_start_with_failing_provider_uses_tier_fallbacks() {
        let manager = manager_with(
            FailingQuestions,
            HeuristicAnswerScorer,
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;

        assert!(manager.start_interview(id).await);

        let c = manager.candidate(id).await.unwrap();
        assert_eq!(c.status, CandidateStatus::Interviewing);
        assert_eq!(c.time_remaining_seconds, 20);
        assert_eq!(c.answers.len(), QUESTION_COUNT);
        for answer in &c.answers {
            let pool = match answer.difficulty_tier {
                DifficultyTier::Easy => EASY_FALLBACKS,
                DifficultyTier::Medium => MEDIUM_FALLBACKS,
                DifficultyTier::Hard => HARD_FALLBACKS,
            };
            assert!(pool.contains(&answer.question.as_str()), "{}", answer.question);
        }
        assert!(manager.snapshot().await.interview_in_progress);
    }

    /// Serves one tier question per permit added to the gate.
    struct GatedQuestions {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl QuestionProvider for GatedQuestions {
        async fn fetch_question(&self, tier: DifficultyTier) -> Result<String, QuestionError> {
            let _permit = self.gate.acquire().await.map_err(|_| QuestionError::Empty)?;
            Ok(format!("{} question", tier.as_str()))
        }

        async fn fetch_question_set(
            &self,
            _resume_text: &str,
            _count: usize,
        ) -> Result<Vec<String>, QuestionError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_delete_during_question_fetch_clears_flag() {
        let gate = Arc::new(Semaphore::new(0));
        let manager = Arc::new(
            manager_with(
                GatedQuestions { gate: gate.clone() },
                HeuristicAnswerScorer,
                Arc::new(MemoryStateStore::new()),
            )
            .await,
        );
        let id = manager.add_candidate(ready()).await.id;

        let starting = tokio::spawn({
            let manager = manager.clone();
            async move { manager.start_interview(id).await }
        });
        while !manager.snapshot().await.interview_in_progress {
            tokio::task::yield_now().await;
        }

        assert!(manager.delete_candidate(id).await);
        gate.add_permits(QUESTION_COUNT);

        assert!(!starting.await.unwrap());
        let view = manager.snapshot().await;
        assert!(view.candidates.is_empty());
        assert!(!view.interview_in_progress);
    }

    #[tokio::test]
    async fn test_start_unknown_candidate_is_noop() {
        let manager = manager_with(
            TierQuestions,
            HeuristicAnswerScorer,
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        assert!(!manager.start_interview(Uuid::new_v4()).await);
        assert!(!manager.snapshot().await.interview_in_progress);
    }

    #[tokio::test]
    async fn test_full_interview_floor_average() {
        let manager = manager_with(
            TierQuestions,
            ScriptedScorer::new(&[7, 8, 6, 9, 5, 7]),
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;
        manager.start_interview(id).await;

        for i in 0..QUESTION_COUNT - 1 {
            let outcome = manager.submit_answer(id, format!("answer {i}"), Some(i)).await;
            assert_eq!(outcome, SubmitOutcome::Advanced { question_index: i + 1 });
        }
        let outcome = manager.submit_answer(id, "last".to_string(), None).await;
        assert_eq!(outcome, SubmitOutcome::Completed { final_score: 7 });

        let c = manager.candidate(id).await.unwrap();
        assert_eq!(c.status, CandidateStatus::Completed);
        assert_eq!(c.final_score, Some(7));
        assert_eq!(c.summary.as_deref(), Some("6 answers, 7/10"));
        assert_eq!(c.answers[0].question, "easy question");
        assert_eq!(c.answers[5].question, "hard question");
        assert!(!manager.snapshot().await.interview_in_progress);
    }

    #[tokio::test]
    async fn test_out_of_range_scores_are_clamped() {
        let manager = manager_with(
            TierQuestions,
            ScriptedScorer::new(&[42, -3]),
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;
        manager.start_interview(id).await;
        manager.submit_answer(id, "a".to_string(), None).await;
        manager.submit_answer(id, "b".to_string(), None).await;

        let c = manager.candidate(id).await.unwrap();
        assert_eq!(c.answers[0].score, Some(10));
        assert_eq!(c.answers[1].score, Some(1));
    }

    #[tokio::test]
    async fn test_failing_scorer_falls_back_to_heuristic_and_default_summary() {
        let manager = manager_with(
            TierQuestions,
            FailingScorer,
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;
        manager.start_interview(id).await;
        for _ in 0..QUESTION_COUNT {
            manager.submit_answer(id, String::new(), None).await;
        }

        let c = manager.candidate(id).await.unwrap();
        assert_eq!(c.status, CandidateStatus::Completed);
        assert!(c.answers.iter().all(|a| a.score == Some(heuristic_score("", ""))));
        let overall = c.final_score.unwrap();
        assert_eq!(c.summary, Some(default_summary(QUESTION_COUNT, overall)));
    }

    #[tokio::test]
    async fn test_stale_expected_index_is_ignored() {
        let manager = manager_with(
            TierQuestions,
            ScriptedScorer::new(&[5]),
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;
        manager.start_interview(id).await;
        manager.submit_answer(id, "manual".to_string(), Some(0)).await;

        let outcome = manager.submit_answer(id, "timer".to_string(), Some(0)).await;
        assert_eq!(outcome, SubmitOutcome::Ignored);
        let c = manager.candidate(id).await.unwrap();
        assert_eq!(c.current_question_index, 1);
        assert_eq!(c.answers[1].answer_text, "");
    }

    #[tokio::test]
    async fn test_submit_for_unknown_or_idle_candidate_is_ignored() {
        let manager = manager_with(
            TierQuestions,
            ScriptedScorer::new(&[5]),
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let id = manager.add_candidate(ready()).await.id;
        assert_eq!(
            manager.submit_answer(id, "x".to_string(), None).await,
            SubmitOutcome::Ignored
        );
        assert_eq!(
            manager.submit_answer(Uuid::new_v4(), "x".to_string(), None).await,
            SubmitOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_state_survives_reload_and_pauses_interview() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let first = manager_with(TierQuestions, ScriptedScorer::new(&[6]), store.clone()).await;
        let id = first.add_candidate(ready()).await.id;
        first.start_interview(id).await;
        first.submit_answer(id, "a".to_string(), None).await;
        first.decrement_timer(id).await;

        let second = manager_with(TierQuestions, ScriptedScorer::new(&[6]), store).await;
        let c = second.candidate(id).await.unwrap();
        assert_eq!(c.status, CandidateStatus::Paused);
        assert_eq!(c.current_question_index, 1);
        assert_eq!(c.time_remaining_seconds, 19);
        assert_eq!(c.answers[0].score, Some(6));
        assert!(!second.snapshot().await.interview_in_progress);
        assert_eq!(second.snapshot().await.focused_candidate_id, Some(id));

        assert!(second.resume_interview(id).await);
        let view = second.current_question(id).await.unwrap();
        assert_eq!(view.question_number, 2);
        assert_eq!(view.time_remaining_seconds, 20);
    }

    #[tokio::test]
    async fn test_unreadable_state_refuses_to_load_and_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let blob = r#"{"version":2,"state":{"candidates":[],"focused_candidate_id":null,"interview_in_progress":false}}"#;
        std::fs::write(&path, blob).unwrap();

        let result = SessionManager::load(
            Arc::new(TierQuestions),
            Arc::new(HeuristicAnswerScorer),
            Arc::new(FileStateStore::new(&path)),
        )
        .await;

        assert!(matches!(result, Err(StoreError::UnsupportedVersion(2))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), blob);
    }

    #[tokio::test]
    async fn test_broken_store_does_not_fail_operations() {
        let manager = manager_with(
            TierQuestions,
            ScriptedScorer::new(&[6]),
            Arc::new(BrokenStore),
        )
        .await;
        assert!(manager.candidates().await.is_empty());

        let id = manager.add_candidate(ready()).await.id;
        assert!(manager.start_interview(id).await);
        assert_eq!(
            manager.submit_answer(id, "a".to_string(), None).await,
            SubmitOutcome::Advanced { question_index: 1 }
        );
    }

    #[tokio::test]
    async fn test_delete_is_persisted() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let manager = manager_with(FallbackQuestionProvider, HeuristicAnswerScorer, store.clone()).await;
        let id = manager.add_candidate(ready()).await.id;
        assert!(manager.delete_candidate(id).await);
        assert!(!manager.delete_candidate(id).await);

        let saved = store.load().await.unwrap().unwrap();
        assert!(saved.state.candidates.is_empty());
        assert_eq!(saved.state.focused_candidate_id, None);
    }

    #[tokio::test]
    async fn test_resume_questions_fall_back_to_fixed_set() {
        let manager = manager_with(
            FailingQuestions,
            HeuristicAnswerScorer,
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        let questions = manager.resume_questions("Rust developer", 3).await;
        assert_eq!(questions.len(), RESUME_FALLBACKS.len());
        assert_eq!(questions[0], RESUME_FALLBACKS[0]);

        let manager = manager_with(
            TierQuestions,
            HeuristicAnswerScorer,
            Arc::new(MemoryStateStore::new()),
        )
        .await;
        assert_eq!(manager.resume_questions("Rust developer", 3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_panel_selection_is_not_persisted() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());
        let manager = manager_with(FallbackQuestionProvider, HeuristicAnswerScorer, store.clone()).await;
        manager.set_active_panel(ActivePanel::Interviewer).await;
        assert_eq!(manager.snapshot().await.active_panel, ActivePanel::Interviewer);
        assert!(store.load().await.unwrap().is_none());
    }
}
