use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interview::models::{Candidate, CandidateId, CandidateStatus};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Highest final score first; unscored candidates sort as 0.
    #[default]
    Score,
    /// Case-insensitive, A to Z.
    Name,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    /// Case-insensitive substring of the candidate name.
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
}

/// One roster line in the interviewer view. The full transcript lives on
/// `Candidate` and is served per candidate.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CandidateRow {
    pub id: CandidateId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: CandidateStatus,
    pub final_score: Option<u8>,
    pub summary: Option<String>,
    pub questions_answered: usize,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Candidate> for CandidateRow {
    fn from(c: &Candidate) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            email: c.email.clone(),
            phone: c.phone.clone(),
            status: c.status,
            final_score: c.final_score,
            summary: c.summary.clone(),
            questions_answered: c.questions_answered(),
            created_at: c.created_at,
            completed_at: c.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    /// Counts cover the whole roster, not just the rows matching the search.
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    /// Mean final score over completed candidates.
    pub average_score: Option<f64>,
    pub candidates: Vec<CandidateRow>,
}

pub fn build_dashboard(candidates: &[Candidate], query: &DashboardQuery) -> DashboardReport {
    let completed: Vec<u8> = candidates
        .iter()
        .filter(|c| c.status == CandidateStatus::Completed)
        .filter_map(|c| c.final_score)
        .collect();
    let in_progress = candidates
        .iter()
        .filter(|c| {
            matches!(
                c.status,
                CandidateStatus::Interviewing | CandidateStatus::Paused
            )
        })
        .count();
    let average_score = (!completed.is_empty()).then(|| {
        completed.iter().map(|s| *s as f64).sum::<f64>() / completed.len() as f64
    });

    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<CandidateRow> = candidates
        .iter()
        .filter(|c| match &needle {
            Some(n) => c.name.to_lowercase().contains(n.as_str()),
            None => true,
        })
        .map(CandidateRow::from)
        .collect();

    // Stable sorts keep roster order among ties.
    match query.sort {
        SortKey::Score => rows.sort_by(|a, b| {
            b.final_score
                .unwrap_or(0)
                .cmp(&a.final_score.unwrap_or(0))
        }),
        SortKey::Name => rows.sort_by_key(|r| r.name.to_lowercase()),
    }

    DashboardReport {
        total: candidates.len(),
        completed: completed.len(),
        in_progress,
        average_score,
        candidates: rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn candidate(name: &str, status: CandidateStatus, final_score: Option<u8>) -> Candidate {
        Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            phone: "555 0100".to_string(),
            status,
            current_question_index: 0,
            time_remaining_seconds: 0,
            answers: vec![],
            final_score,
            summary: None,
            resume_text: None,
            resume_questions: vec![],
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    fn roster() -> Vec<Candidate> {
        vec![
            candidate("bea", CandidateStatus::Completed, Some(6)),
            candidate("Alan", CandidateStatus::Interviewing, None),
            candidate("Cleo", CandidateStatus::Completed, Some(9)),
            candidate("Dana", CandidateStatus::CollectingInfo, None),
        ]
    }

    fn names(report: &DashboardReport) -> Vec<&str> {
        report.candidates.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_score_descending() {
        let report = build_dashboard(&roster(), &DashboardQuery::default());
        assert_eq!(names(&report), ["Cleo", "bea", "Alan", "Dana"]);
    }

    #[test]
    fn test_sort_by_name_ignores_case() {
        let query = DashboardQuery {
            search: None,
            sort: SortKey::Name,
        };
        let report = build_dashboard(&roster(), &query);
        assert_eq!(names(&report), ["Alan", "bea", "Cleo", "Dana"]);
    }

    #[test]
    fn test_search_filters_rows_but_not_totals() {
        let query = DashboardQuery {
            search: Some("  LE ".to_string()),
            sort: SortKey::Score,
        };
        let report = build_dashboard(&roster(), &query);
        assert_eq!(names(&report), ["Cleo"]);
        assert_eq!(report.total, 4);
        assert_eq!(report.completed, 2);
        assert_eq!(report.in_progress, 1);
    }

    #[test]
    fn test_average_over_completed_only() {
        let report = build_dashboard(&roster(), &DashboardQuery::default());
        assert_eq!(report.average_score, Some(7.5));

        let empty = build_dashboard(&[], &DashboardQuery::default());
        assert_eq!(empty.average_score, None);
        assert!(empty.candidates.is_empty());
    }

    #[test]
    fn test_sort_key_parses_lowercase() {
        let query: DashboardQuery = serde_json::from_str(r#"{"sort":"name"}"#).unwrap();
        assert_eq!(query.sort, SortKey::Name);
        assert!(query.search.is_none());
    }
}
