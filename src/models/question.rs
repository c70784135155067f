use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// A bank question. `options` holds exactly four choices; `correct_answer`
/// indexes into them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AptitudeQuestion {
    pub id: Uuid,
    pub drive_session_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub question: String,
    pub options: JsonValue,
    pub correct_answer: i32,
    pub difficulty: String,
    pub category: Option<String>,
    pub test_round: i32,
    pub tags: JsonValue,
    pub created_at: DateTime<Utc>,
}

impl AptitudeQuestion {
    pub fn option_texts(&self) -> Vec<String> {
        serde_json::from_value(self.options.clone()).unwrap_or_default()
    }
}
