use crate::error::{Error, Result};
use crate::models::drive_candidate::{CandidateStatus, DriveCandidate, QualificationStatus};
use crate::services::notification_service::NotificationService;
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Batch actions over filtered candidate subsets. Never atomic as a whole:
/// one candidate's failure is reported and the batch continues.
#[derive(Clone)]
pub struct BulkService {
    pool: PgPool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedCandidate {
    pub id: Uuid,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<Uuid>,
    pub skipped: Vec<SkippedCandidate>,
}

/// Multi-field candidate filter. `None` means the `'all'` sentinel —
/// unconstrained. Score bounds are inclusive; an unscored round counts
/// as zero for bounding purposes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateFilter {
    pub min_aptitude: Option<i32>,
    pub max_aptitude: Option<i32>,
    pub min_technical: Option<i32>,
    pub max_technical: Option<i32>,
    pub status: Option<CandidateStatus>,
    pub current_round: Option<i32>,
}

impl CandidateFilter {
    /// Builds a filter from raw query values, collapsing the `'all'`
    /// sentinel and legacy status labels into canonical form.
    pub fn from_query(
        min_aptitude: Option<i32>,
        max_aptitude: Option<i32>,
        min_technical: Option<i32>,
        max_technical: Option<i32>,
        status: Option<&str>,
        current_round: Option<&str>,
    ) -> Result<Self> {
        let status = match status {
            None => None,
            Some("all") => None,
            Some(raw) => Some(CandidateStatus::from_legacy(raw).ok_or_else(|| {
                Error::BadRequest(format!("Unknown candidate status '{}'", raw))
            })?),
        };
        let current_round = match current_round {
            None => None,
            Some("all") => None,
            Some(raw) => {
                let round: i32 = raw.parse().map_err(|_| {
                    Error::BadRequest(format!("Invalid round '{}'", raw))
                })?;
                if !(1..=3).contains(&round) {
                    return Err(Error::BadRequest(format!("Invalid round '{}'", raw)));
                }
                Some(round)
            }
        };
        Ok(Self {
            min_aptitude,
            max_aptitude,
            min_technical,
            max_technical,
            status,
            current_round,
        })
    }
}

impl BulkService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pure read over one drive's candidates.
    pub async fn filter_candidates(
        &self,
        drive_session_id: Uuid,
        filter: &CandidateFilter,
    ) -> Result<Vec<DriveCandidate>> {
        let candidates = sqlx::query_as::<_, DriveCandidate>(
            r#"
            SELECT * FROM drive_candidates
            WHERE drive_session_id = $1
              AND ($2::int IS NULL OR COALESCE(aptitude_score, 0) >= $2)
              AND ($3::int IS NULL OR COALESCE(aptitude_score, 0) <= $3)
              AND ($4::int IS NULL OR COALESCE(technical_score, 0) >= $4)
              AND ($5::int IS NULL OR COALESCE(technical_score, 0) <= $5)
              AND ($6::text IS NULL OR registration_status = $6)
              AND ($7::int IS NULL OR current_round = $7)
            ORDER BY created_at ASC
            "#,
        )
        .bind(drive_session_id)
        .bind(filter.min_aptitude)
        .bind(filter.max_aptitude)
        .bind(filter.min_technical)
        .bind(filter.max_technical)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.current_round)
        .fetch_all(&self.pool)
        .await?;
        Ok(candidates)
    }

    /// Schedules interviews for qualified round-3 candidates. Per-candidate
    /// independence: a skip or failure never rolls back the others.
    pub async fn bulk_schedule_interviews(
        &self,
        drive_session_id: Uuid,
        candidate_ids: &[Uuid],
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for &id in candidate_ids {
            match self.schedule_one(drive_session_id, id).await {
                Ok(()) => outcome.succeeded.push(id),
                Err(Error::Database(e)) => {
                    tracing::error!(candidate_id = %id, error = ?e, "interview scheduling failed");
                    outcome.skipped.push(SkippedCandidate {
                        id,
                        reason: "internal error".to_string(),
                    });
                }
                Err(e) => outcome.skipped.push(SkippedCandidate {
                    id,
                    reason: e.to_string().replace("Bad request: ", "").replace("Not found: ", ""),
                }),
            }
        }

        crate::services::drive_service::DriveService::new(self.pool.clone())
            .update_counts(drive_session_id)
            .await?;

        tracing::info!(
            drive_session_id = %drive_session_id,
            scheduled = outcome.succeeded.len(),
            skipped = outcome.skipped.len(),
            "bulk interview scheduling finished"
        );

        Ok(outcome)
    }

    async fn schedule_one(&self, drive_session_id: Uuid, candidate_id: Uuid) -> Result<()> {
        let candidate = self.get_candidate(drive_session_id, candidate_id).await?;

        if candidate.current_round != 3 || !candidate.is_qualified() {
            return Err(Error::BadRequest("not eligible".to_string()));
        }
        if candidate.interview_scheduled {
            return Err(Error::BadRequest("already scheduled".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE drive_candidates
            SET interview_scheduled = TRUE, registration_status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(CandidateStatus::InterviewScheduled.as_str())
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Marks interviewed candidates as finally selected.
    pub async fn bulk_finalize_selection(
        &self,
        drive_session_id: Uuid,
        candidate_ids: &[Uuid],
    ) -> Result<BulkOutcome> {
        let mut outcome = BulkOutcome::default();

        for &id in candidate_ids {
            let result = async {
                let candidate = self.get_candidate(drive_session_id, id).await?;
                if !candidate.interview_scheduled {
                    return Err(Error::BadRequest("not eligible".to_string()));
                }
                if candidate.registration_status == CandidateStatus::Selected.as_str() {
                    return Err(Error::BadRequest("already selected".to_string()));
                }
                sqlx::query(
                    r#"
                    UPDATE drive_candidates
                    SET registration_status = $1, updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(CandidateStatus::Selected.as_str())
                .bind(id)
                .execute(&self.pool)
                .await?;
                Ok(())
            }
            .await;

            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(e) => outcome.skipped.push(SkippedCandidate {
                    id,
                    reason: e.to_string().replace("Bad request: ", "").replace("Not found: ", ""),
                }),
            }
        }

        crate::services::drive_service::DriveService::new(self.pool.clone())
            .update_counts(drive_session_id)
            .await?;

        Ok(outcome)
    }

    /// Invites every not-yet-notified candidate to screening. The notified
    /// flag is set only after the notifier confirms delivery, so a re-run
    /// after partial failure never re-notifies anyone.
    pub async fn send_screening_emails(
        &self,
        drive_session_id: Uuid,
        notifier: &NotificationService,
    ) -> Result<BulkOutcome> {
        let targets = sqlx::query_as::<_, DriveCandidate>(
            r#"
            SELECT * FROM drive_candidates
            WHERE drive_session_id = $1 AND screening_notified = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(drive_session_id)
        .fetch_all(&self.pool)
        .await?;

        let mut outcome = BulkOutcome::default();
        for candidate in &targets {
            let payload = json!({
                "candidate_id": candidate.id,
                "name": candidate.name,
                "email": candidate.email,
                "registration_token": candidate.registration_token,
            });
            let delivered = notifier
                .deliver(Some(candidate.id), "screening_invite", &payload)
                .await
                .unwrap_or(false);

            if delivered {
                sqlx::query(
                    r#"UPDATE drive_candidates SET screening_notified = TRUE, updated_at = NOW()
                       WHERE id = $1"#,
                )
                .bind(candidate.id)
                .execute(&self.pool)
                .await?;
                outcome.succeeded.push(candidate.id);
            } else {
                outcome.skipped.push(SkippedCandidate {
                    id: candidate.id,
                    reason: "delivery failed".to_string(),
                });
            }
        }

        Ok(outcome)
    }

    /// Tells candidates who qualified into `round` that the next round is
    /// open. Same only-flag-on-success semantics as screening invites.
    pub async fn send_next_round_emails(
        &self,
        drive_session_id: Uuid,
        round: i32,
        notifier: &NotificationService,
    ) -> Result<BulkOutcome> {
        if !(2..=3).contains(&round) {
            return Err(Error::BadRequest(
                "Next-round notifications apply to rounds 2 and 3".to_string(),
            ));
        }

        let targets = sqlx::query_as::<_, DriveCandidate>(
            r#"
            SELECT * FROM drive_candidates
            WHERE drive_session_id = $1 AND current_round = $2
              AND qualification_status = $3
              AND (last_notified_round IS NULL OR last_notified_round < $2)
            ORDER BY created_at ASC
            "#,
        )
        .bind(drive_session_id)
        .bind(round)
        .bind(QualificationStatus::Qualified.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut outcome = BulkOutcome::default();
        for candidate in &targets {
            let payload = json!({
                "candidate_id": candidate.id,
                "name": candidate.name,
                "email": candidate.email,
                "next_round": round,
            });
            let delivered = notifier
                .deliver(Some(candidate.id), "next_round_open", &payload)
                .await
                .unwrap_or(false);

            if delivered {
                sqlx::query(
                    r#"UPDATE drive_candidates SET last_notified_round = $1, updated_at = NOW()
                       WHERE id = $2"#,
                )
                .bind(round)
                .bind(candidate.id)
                .execute(&self.pool)
                .await?;
                outcome.succeeded.push(candidate.id);
            } else {
                outcome.skipped.push(SkippedCandidate {
                    id: candidate.id,
                    reason: "delivery failed".to_string(),
                });
            }
        }

        Ok(outcome)
    }

    async fn get_candidate(
        &self,
        drive_session_id: Uuid,
        candidate_id: Uuid,
    ) -> Result<DriveCandidate> {
        sqlx::query_as::<_, DriveCandidate>(
            r#"SELECT * FROM drive_candidates WHERE id = $1 AND drive_session_id = $2"#,
        )
        .bind(candidate_id)
        .bind(drive_session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_sentinel_means_unconstrained() {
        let filter = CandidateFilter::from_query(
            Some(0),
            Some(100),
            Some(0),
            Some(100),
            Some("all"),
            Some("all"),
        )
        .unwrap();
        assert_eq!(filter.status, None);
        assert_eq!(filter.current_round, None);
        assert_eq!(filter.min_aptitude, Some(0));
        assert_eq!(filter.max_aptitude, Some(100));
    }

    #[test]
    fn legacy_status_labels_are_canonicalized() {
        let filter =
            CandidateFilter::from_query(None, None, None, None, Some("test_completed"), None)
                .unwrap();
        assert_eq!(filter.status, Some(CandidateStatus::AptitudeCompleted));
    }

    #[test]
    fn unknown_status_and_bad_round_are_rejected() {
        assert!(
            CandidateFilter::from_query(None, None, None, None, Some("astral"), None).is_err()
        );
        assert!(CandidateFilter::from_query(None, None, None, None, None, Some("4")).is_err());
        assert!(CandidateFilter::from_query(None, None, None, None, None, Some("x")).is_err());
    }

    #[test]
    fn round_parses_within_bounds() {
        let filter =
            CandidateFilter::from_query(None, None, None, None, None, Some("3")).unwrap();
        assert_eq!(filter.current_round, Some(3));
    }
}
