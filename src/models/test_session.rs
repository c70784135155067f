use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSession {
    pub id: Uuid,
    pub drive_candidate_id: Uuid,
    pub drive_session_id: Uuid,
    pub test_token: String,
    pub status: String,
    pub test_round: i32,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub score: Option<i32>,
    pub time_spent_seconds: Option<i32>,
    pub questions_snapshot: JsonValue,
    pub responses: JsonValue,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSession {
    pub fn session_status(&self) -> Option<TestSessionStatus> {
        TestSessionStatus::parse(&self.status)
    }

    pub fn snapshot(&self) -> Vec<SnapshotQuestion> {
        serde_json::from_value(self.questions_snapshot.clone()).unwrap_or_default()
    }

    /// Responses as question index -> chosen option index.
    /// Stored as a jsonb object keyed by the stringified index.
    pub fn response_map(&self) -> HashMap<usize, usize> {
        let raw: HashMap<String, usize> =
            serde_json::from_value(self.responses.clone()).unwrap_or_default();
        raw.into_iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|idx| (idx, v)))
            .collect()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TestSessionStatus::InProgress.as_str()
            && self.expires_at.map(|e| now >= e).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSessionStatus {
    Pending,
    InProgress,
    Completed,
    Expired,
}

impl TestSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestSessionStatus::Pending => "pending",
            TestSessionStatus::InProgress => "in_progress",
            TestSessionStatus::Completed => "completed",
            TestSessionStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TestSessionStatus::Pending),
            "in_progress" => Some(TestSessionStatus::InProgress),
            "completed" => Some(TestSessionStatus::Completed),
            "expired" => Some(TestSessionStatus::Expired),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TestSessionStatus::Completed | TestSessionStatus::Expired)
    }
}

/// A question frozen onto the session at issue time. Grading always runs
/// against this snapshot, never against the live bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotQuestion {
    pub id: Uuid,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session_with(status: &str, responses: JsonValue) -> TestSession {
        TestSession {
            id: Uuid::new_v4(),
            drive_candidate_id: Uuid::new_v4(),
            drive_session_id: Uuid::new_v4(),
            test_token: "tok".into(),
            status: status.into(),
            test_round: 1,
            total_questions: 2,
            answered_questions: 0,
            correct_answers: 0,
            score: None,
            time_spent_seconds: None,
            questions_snapshot: json!([]),
            responses,
            started_at: None,
            completed_at: None,
            expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn response_map_parses_string_keys() {
        let session = session_with("in_progress", json!({"0": 2, "3": 1}));
        let map = session.response_map();
        assert_eq!(map.get(&0), Some(&2));
        assert_eq!(map.get(&3), Some(&1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn overdue_requires_in_progress_and_a_deadline() {
        let now = Utc::now();
        let mut session = session_with("in_progress", json!({}));
        assert!(!session.is_overdue(now));
        session.expires_at = Some(now - chrono::Duration::seconds(1));
        assert!(session.is_overdue(now));
        session.status = "completed".into();
        assert!(!session.is_overdue(now));
    }

    #[test]
    fn terminal_statuses() {
        assert!(TestSessionStatus::Completed.is_terminal());
        assert!(TestSessionStatus::Expired.is_terminal());
        assert!(!TestSessionStatus::Pending.is_terminal());
        assert!(!TestSessionStatus::InProgress.is_terminal());
    }
}
