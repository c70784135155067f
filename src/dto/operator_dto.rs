use crate::utils::roster::{RosterRow, SkippedRow};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

fn default_drive_type() -> String {
    "walk_in".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDrivePayload {
    #[validate(length(min = 1, message = "Drive name cannot be empty"))]
    pub name: String,
    #[serde(default = "default_drive_type")]
    pub drive_type: String,
    pub job_id: Option<Uuid>,
    #[validate(range(min = 0, max = 100))]
    pub aptitude_cutoff: i32,
    #[validate(range(min = 0, max = 100))]
    pub technical_cutoff: i32,
    #[validate(range(min = 1, message = "Duration must be at least 1 minute"))]
    pub test_duration_minutes: i32,
    #[validate(range(min = 1, message = "Question count must be at least 1"))]
    pub question_count: i32,
    #[serde(default)]
    pub roster: Vec<RosterRow>,
}

#[derive(Debug, Serialize)]
pub struct CreateDriveResponse {
    pub drive: crate::models::drive_session::DriveSession,
    pub candidate_count: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Serialize)]
pub struct ImportRosterResponse {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCutoffsPayload {
    #[validate(range(min = 0, max = 100))]
    pub aptitude_cutoff: i32,
    #[validate(range(min = 0, max = 100))]
    pub technical_cutoff: i32,
}

#[derive(Debug, Serialize)]
pub struct UpdateCutoffsResponse {
    pub requalified_candidates: i64,
}

/// Query params for the candidate list. `'all'` (or omission) leaves a
/// dimension unconstrained.
#[derive(Debug, Clone, Deserialize)]
pub struct CandidateFilterQuery {
    pub min_aptitude: Option<i32>,
    pub max_aptitude: Option<i32>,
    pub min_technical: Option<i32>,
    pub max_technical: Option<i32>,
    pub status: Option<String>,
    pub current_round: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IssueSessionPayload {
    pub test_round: i32,
    #[serde(default)]
    pub reissue: bool,
}

#[derive(Debug, Serialize)]
pub struct IssueSessionResponse {
    pub session_id: Uuid,
    pub test_token: String,
    pub status: String,
    pub test_round: i32,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkCandidatesPayload {
    #[validate(length(min = 1, message = "candidate_ids cannot be empty"))]
    pub candidate_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BulkScheduleResponse {
    pub scheduled: Vec<Uuid>,
    pub skipped: Vec<crate::services::bulk_service::SkippedCandidate>,
}

#[derive(Debug, Serialize)]
pub struct BulkSelectResponse {
    pub selected: Vec<Uuid>,
    pub skipped: Vec<crate::services::bulk_service::SkippedCandidate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NotifyNextRoundPayload {
    #[validate(range(min = 2, max = 3))]
    pub round: i32,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub notified: Vec<Uuid>,
    pub failed: Vec<crate::services::bulk_service::SkippedCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionPayload {
    pub drive_session_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: i32,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub test_round: i32,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionsPayload {
    #[validate(length(min = 1, message = "questions cannot be empty"))]
    pub questions: Vec<CreateQuestionPayload>,
}
