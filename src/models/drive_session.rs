use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriveSession {
    pub id: Uuid,
    pub name: String,
    pub drive_type: String,
    pub job_id: Option<Uuid>,
    pub aptitude_cutoff: i32,
    pub technical_cutoff: i32,
    pub test_duration_minutes: i32,
    pub question_count: i32,
    pub status: String,
    pub total_candidates: i32,
    pub registered_count: i32,
    pub aptitude_qualified_count: i32,
    pub technical_qualified_count: i32,
    pub interview_scheduled_count: i32,
    pub final_selected_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriveSession {
    pub fn stage(&self) -> Option<DriveStage> {
        DriveStage::parse(&self.status)
    }

    /// Cutoff for a test round. Round 3 (interview) has no cutoff.
    pub fn cutoff_for_round(&self, round: i32) -> Option<i32> {
        match round {
            1 => Some(self.aptitude_cutoff),
            2 => Some(self.technical_cutoff),
            _ => None,
        }
    }
}

/// Drive lifecycle. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveStage {
    Draft,
    Registration,
    Aptitude,
    Technical,
    Interview,
    Completed,
}

impl DriveStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveStage::Draft => "draft",
            DriveStage::Registration => "registration",
            DriveStage::Aptitude => "aptitude",
            DriveStage::Technical => "technical",
            DriveStage::Interview => "interview",
            DriveStage::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(DriveStage::Draft),
            "registration" => Some(DriveStage::Registration),
            "aptitude" => Some(DriveStage::Aptitude),
            "technical" => Some(DriveStage::Technical),
            "interview" => Some(DriveStage::Interview),
            "completed" => Some(DriveStage::Completed),
            _ => None,
        }
    }

    pub fn next(&self) -> Option<Self> {
        match self {
            DriveStage::Draft => Some(DriveStage::Registration),
            DriveStage::Registration => Some(DriveStage::Aptitude),
            DriveStage::Aptitude => Some(DriveStage::Technical),
            DriveStage::Technical => Some(DriveStage::Interview),
            DriveStage::Interview => Some(DriveStage::Completed),
            DriveStage::Completed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveType {
    WalkIn,
    Campus,
}

impl DriveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriveType::WalkIn => "walk_in",
            DriveType::Campus => "campus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "walk_in" => Some(DriveType::WalkIn),
            "campus" => Some(DriveType::Campus),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_forward_only() {
        let mut stage = DriveStage::Draft;
        let mut seen = vec![stage];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage);
        }
        assert_eq!(stage, DriveStage::Completed);
        assert_eq!(seen.len(), 6);
        assert_eq!(DriveStage::Completed.next(), None);
    }

    #[test]
    fn stage_strings_round_trip() {
        for s in [
            "draft",
            "registration",
            "aptitude",
            "technical",
            "interview",
            "completed",
        ] {
            assert_eq!(DriveStage::parse(s).unwrap().as_str(), s);
        }
        assert_eq!(DriveStage::parse("archived"), None);
    }
}
