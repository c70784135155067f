use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriveCandidate {
    pub id: Uuid,
    pub drive_session_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub registration_token: String,
    pub registration_status: String,
    pub aptitude_score: Option<i32>,
    pub technical_score: Option<i32>,
    pub current_round: i32,
    pub qualification_status: String,
    pub interview_scheduled: bool,
    pub screening_notified: bool,
    pub last_notified_round: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriveCandidate {
    pub fn score_for_round(&self, round: i32) -> Option<i32> {
        match round {
            1 => self.aptitude_score,
            2 => self.technical_score,
            _ => None,
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.qualification_status == QualificationStatus::Qualified.as_str()
    }
}

/// Canonical per-round candidate status. The legacy UI shipped several
/// overlapping vocabularies; everything funnels through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Registered,
    AptitudePending,
    AptitudeInProgress,
    AptitudeCompleted,
    TechnicalPending,
    TechnicalInProgress,
    TechnicalCompleted,
    InterviewScheduled,
    Selected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Registered => "registered",
            CandidateStatus::AptitudePending => "aptitude_pending",
            CandidateStatus::AptitudeInProgress => "aptitude_in_progress",
            CandidateStatus::AptitudeCompleted => "aptitude_completed",
            CandidateStatus::TechnicalPending => "technical_pending",
            CandidateStatus::TechnicalInProgress => "technical_in_progress",
            CandidateStatus::TechnicalCompleted => "technical_completed",
            CandidateStatus::InterviewScheduled => "interview_scheduled",
            CandidateStatus::Selected => "selected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registered" => Some(CandidateStatus::Registered),
            "aptitude_pending" => Some(CandidateStatus::AptitudePending),
            "aptitude_in_progress" => Some(CandidateStatus::AptitudeInProgress),
            "aptitude_completed" => Some(CandidateStatus::AptitudeCompleted),
            "technical_pending" => Some(CandidateStatus::TechnicalPending),
            "technical_in_progress" => Some(CandidateStatus::TechnicalInProgress),
            "technical_completed" => Some(CandidateStatus::TechnicalCompleted),
            "interview_scheduled" => Some(CandidateStatus::InterviewScheduled),
            "selected" => Some(CandidateStatus::Selected),
            _ => None,
        }
    }

    /// Mapping table for the status labels older screens used.
    /// Unknown labels are rejected rather than guessed at.
    pub fn from_legacy(s: &str) -> Option<Self> {
        match s {
            "screening" | "registered" => Some(CandidateStatus::Registered),
            "test_assigned" | "aptitude_pending" => Some(CandidateStatus::AptitudePending),
            "test_in_progress" | "aptitude_in_progress" => {
                Some(CandidateStatus::AptitudeInProgress)
            }
            "test_completed" | "aptitude_completed" => Some(CandidateStatus::AptitudeCompleted),
            "tech_assigned" | "technical_pending" => Some(CandidateStatus::TechnicalPending),
            "tech_in_progress" | "technical_in_progress" => {
                Some(CandidateStatus::TechnicalInProgress)
            }
            "tech_completed" | "technical_completed" => Some(CandidateStatus::TechnicalCompleted),
            "interview" | "interview_scheduled" => Some(CandidateStatus::InterviewScheduled),
            "hired" | "final_selected" | "selected" => Some(CandidateStatus::Selected),
            _ => Self::parse(s),
        }
    }

    pub fn pending_for(round: i32) -> Option<Self> {
        match round {
            1 => Some(CandidateStatus::AptitudePending),
            2 => Some(CandidateStatus::TechnicalPending),
            _ => None,
        }
    }

    pub fn in_progress_for(round: i32) -> Option<Self> {
        match round {
            1 => Some(CandidateStatus::AptitudeInProgress),
            2 => Some(CandidateStatus::TechnicalInProgress),
            _ => None,
        }
    }

    pub fn completed_for(round: i32) -> Option<Self> {
        match round {
            1 => Some(CandidateStatus::AptitudeCompleted),
            2 => Some(CandidateStatus::TechnicalCompleted),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    Pending,
    Qualified,
    NotQualified,
}

impl QualificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualificationStatus::Pending => "pending",
            QualificationStatus::Qualified => "qualified",
            QualificationStatus::NotQualified => "not_qualified",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QualificationStatus::Pending),
            "qualified" => Some(QualificationStatus::Qualified),
            "not_qualified" => Some(QualificationStatus::NotQualified),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_vocabulary_collapses_to_canonical() {
        assert_eq!(
            CandidateStatus::from_legacy("test_completed"),
            Some(CandidateStatus::AptitudeCompleted)
        );
        assert_eq!(
            CandidateStatus::from_legacy("aptitude_completed"),
            Some(CandidateStatus::AptitudeCompleted)
        );
        assert_eq!(
            CandidateStatus::from_legacy("screening"),
            Some(CandidateStatus::Registered)
        );
        assert_eq!(
            CandidateStatus::from_legacy("hired"),
            Some(CandidateStatus::Selected)
        );
        assert_eq!(CandidateStatus::from_legacy("vibing"), None);
    }

    #[test]
    fn canonical_strings_round_trip() {
        for status in [
            CandidateStatus::Registered,
            CandidateStatus::AptitudePending,
            CandidateStatus::AptitudeInProgress,
            CandidateStatus::AptitudeCompleted,
            CandidateStatus::TechnicalPending,
            CandidateStatus::TechnicalInProgress,
            CandidateStatus::TechnicalCompleted,
            CandidateStatus::InterviewScheduled,
            CandidateStatus::Selected,
        ] {
            assert_eq!(CandidateStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn qualification_strings_round_trip() {
        for status in [
            QualificationStatus::Pending,
            QualificationStatus::Qualified,
            QualificationStatus::NotQualified,
        ] {
            assert_eq!(QualificationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(QualificationStatus::parse("maybe"), None);
    }

    #[test]
    fn round_status_helpers_cover_test_rounds_only() {
        assert_eq!(
            CandidateStatus::completed_for(1),
            Some(CandidateStatus::AptitudeCompleted)
        );
        assert_eq!(
            CandidateStatus::completed_for(2),
            Some(CandidateStatus::TechnicalCompleted)
        );
        assert_eq!(CandidateStatus::completed_for(3), None);
    }
}
