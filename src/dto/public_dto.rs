use serde::{Deserialize, Serialize};
use validator::Validate;

/// A snapshot question as shown to the candidate — no correct index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub index: usize,
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTestResponse {
    pub session_id: uuid::Uuid,
    pub status: String,
    pub test_round: i32,
    pub total_questions: i32,
    pub duration_minutes: i32,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartTestResponse {
    pub session_id: uuid::Uuid,
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerItem {
    pub question_index: i32,
    pub choice: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswerRequest {
    pub question_index: i32,
    pub choice: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_index: i32,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitTestRequest {
    #[serde(default)]
    pub answers: Vec<AnswerItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitTestResponse {
    pub session_id: uuid::Uuid,
    pub status: String,
    pub score: i32,
    pub passed: bool,
    pub correct_answers: i32,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub time_remaining_seconds: Option<i32>,
    pub questions_answered: i32,
    pub total_questions: i32,
}
