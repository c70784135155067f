use crate::config::get_config;
use crate::error::{Error, Result};
use crate::models::drive_candidate::{CandidateStatus, DriveCandidate, QualificationStatus};
use crate::models::drive_session::DriveSession;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Derives pass/fail from score vs. cutoff. Qualification is never edited
/// directly — it is recomputed from stored scores whenever cutoffs move.
#[derive(Clone)]
pub struct QualificationService {
    pool: PgPool,
}

/// Inclusive comparison: hitting the cutoff exactly qualifies.
pub fn qualifies(score: i32, cutoff: i32) -> bool {
    score >= cutoff
}

/// Whether a stored score flips under a cutoff change, and to what.
pub fn requalify_decision(score: i32, old_cutoff: i32, new_cutoff: i32) -> Option<bool> {
    let old_q = qualifies(score, old_cutoff);
    let new_q = qualifies(score, new_cutoff);
    if old_q == new_q {
        None
    } else {
        Some(new_q)
    }
}

impl QualificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Stores the round score, derives qualification against the session's
    /// current cutoff, and advances `current_round` on a pass. Issuing the
    /// next round's test stays a separate explicit action.
    pub async fn evaluate(
        &self,
        candidate_id: Uuid,
        test_round: i32,
        score: i32,
    ) -> Result<DriveCandidate> {
        let candidate = sqlx::query_as::<_, DriveCandidate>(
            r#"SELECT * FROM drive_candidates WHERE id = $1"#,
        )
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await?;

        let drive = sqlx::query_as::<_, DriveSession>(
            r#"SELECT * FROM drive_sessions WHERE id = $1"#,
        )
        .bind(candidate.drive_session_id)
        .fetch_one(&self.pool)
        .await?;

        let (cutoff, score_column) = match test_round {
            1 => (drive.aptitude_cutoff, "aptitude_score"),
            2 => (drive.technical_cutoff, "technical_score"),
            _ => {
                return Err(Error::BadRequest(format!(
                    "Round {} has no cutoff",
                    test_round
                )))
            }
        };

        let qualified = qualifies(score, cutoff);
        let status = if qualified {
            QualificationStatus::Qualified
        } else {
            QualificationStatus::NotQualified
        };
        let next_round = if qualified && test_round < 3 {
            test_round + 1
        } else {
            candidate.current_round
        };
        let registration_status = CandidateStatus::completed_for(test_round)
            .map(|s| s.as_str().to_string())
            .unwrap_or_else(|| candidate.registration_status.clone());

        let updated = sqlx::query_as::<_, DriveCandidate>(&format!(
            r#"
            UPDATE drive_candidates
            SET {score_column} = $1, qualification_status = $2,
                current_round = GREATEST(current_round, $3),
                registration_status = $4, updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#
        ))
        .bind(score)
        .bind(status.as_str())
        .bind(next_round)
        .bind(&registration_status)
        .bind(candidate_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            candidate_id = %candidate_id,
            test_round,
            score,
            cutoff,
            qualified,
            "round evaluated"
        );

        crate::services::drive_service::DriveService::new(self.pool.clone())
            .update_counts(candidate.drive_session_id)
            .await?;

        Ok(updated)
    }

    /// Re-derives qualification for every stored score affected by a cutoff
    /// change — no re-grading. The new cutoffs and the full requalification
    /// pass commit in one transaction. Returns the number of candidates
    /// whose qualification flipped; identical cutoffs flip nobody.
    ///
    /// Scope policy: candidates already past the adjusted round (beyond
    /// `round + 1`, or with an interview scheduled) keep their
    /// qualification.
    pub async fn recalculate_cutoffs(
        &self,
        drive_session_id: Uuid,
        new_aptitude_cutoff: i32,
        new_technical_cutoff: i32,
    ) -> Result<i64> {
        for cutoff in [new_aptitude_cutoff, new_technical_cutoff] {
            if !(0..=100).contains(&cutoff) {
                return Err(Error::BadRequest(
                    "Cutoffs must be between 0 and 100".to_string(),
                ));
            }
        }

        let mut tx = self.pool.begin().await?;

        let drive = sqlx::query_as::<_, DriveSession>(
            r#"SELECT * FROM drive_sessions WHERE id = $1 FOR UPDATE"#,
        )
        .bind(drive_session_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Drive session not found".to_string()))?;

        sqlx::query(
            r#"
            UPDATE drive_sessions
            SET aptitude_cutoff = $1, technical_cutoff = $2, updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(new_aptitude_cutoff)
        .bind(new_technical_cutoff)
        .bind(drive_session_id)
        .execute(&mut *tx)
        .await?;

        let mut flipped = 0i64;
        flipped += Self::requalify_round(
            &mut tx,
            drive_session_id,
            1,
            drive.aptitude_cutoff,
            new_aptitude_cutoff,
        )
        .await?;
        flipped += Self::requalify_round(
            &mut tx,
            drive_session_id,
            2,
            drive.technical_cutoff,
            new_technical_cutoff,
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            drive_session_id = %drive_session_id,
            new_aptitude_cutoff,
            new_technical_cutoff,
            flipped,
            "cutoffs recalculated"
        );

        crate::services::drive_service::DriveService::new(self.pool.clone())
            .update_counts(drive_session_id)
            .await?;

        Ok(flipped)
    }

    /// One round's requalification pass, in bounded keyset batches so the
    /// per-statement row count stays small while the transaction holds.
    async fn requalify_round(
        tx: &mut Transaction<'_, Postgres>,
        drive_session_id: Uuid,
        test_round: i32,
        old_cutoff: i32,
        new_cutoff: i32,
    ) -> Result<i64> {
        if old_cutoff == new_cutoff {
            return Ok(0);
        }

        let batch_size = get_config().requalify_batch_size;
        let scope = match test_round {
            1 => {
                r#"
                SELECT * FROM drive_candidates
                WHERE drive_session_id = $1 AND aptitude_score IS NOT NULL
                  AND interview_scheduled = FALSE AND current_round <= 2
                  AND id > $2
                ORDER BY id ASC
                LIMIT $3
                "#
            }
            _ => {
                r#"
                SELECT * FROM drive_candidates
                WHERE drive_session_id = $1 AND technical_score IS NOT NULL
                  AND interview_scheduled = FALSE AND current_round >= 2
                  AND id > $2
                ORDER BY id ASC
                LIMIT $3
                "#
            }
        };

        let mut flipped = 0i64;
        let mut cursor = Uuid::nil();

        loop {
            let batch = sqlx::query_as::<_, DriveCandidate>(scope)
                .bind(drive_session_id)
                .bind(cursor)
                .bind(batch_size)
                .fetch_all(&mut **tx)
                .await?;

            let Some(last) = batch.last() else { break };
            cursor = last.id;

            for candidate in &batch {
                let Some(score) = candidate.score_for_round(test_round) else {
                    continue;
                };
                let Some(now_qualified) = requalify_decision(score, old_cutoff, new_cutoff)
                else {
                    continue;
                };

                let (status, current_round) = if now_qualified {
                    (QualificationStatus::Qualified, test_round + 1)
                } else {
                    (QualificationStatus::NotQualified, test_round)
                };

                sqlx::query(
                    r#"
                    UPDATE drive_candidates
                    SET qualification_status = $1, current_round = $2, updated_at = NOW()
                    WHERE id = $3
                    "#,
                )
                .bind(status.as_str())
                .bind(current_round)
                .bind(candidate.id)
                .execute(&mut **tx)
                .await?;
                flipped += 1;
            }

            if (batch.len() as i64) < batch_size {
                break;
            }
        }

        Ok(flipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hitting_the_cutoff_exactly_qualifies() {
        assert!(qualifies(60, 60));
        assert!(qualifies(61, 60));
        assert!(!qualifies(59, 60));
    }

    #[test]
    fn raising_a_cutoff_flips_only_the_band_between() {
        // cutoff 60 -> 65: a 60 flips to unqualified, a 59 was already out
        assert_eq!(requalify_decision(60, 60, 65), Some(false));
        assert_eq!(requalify_decision(59, 60, 65), None);
        assert_eq!(requalify_decision(65, 60, 65), None);
        assert_eq!(requalify_decision(64, 60, 65), Some(false));
    }

    #[test]
    fn lowering_a_cutoff_promotes_the_band_between() {
        assert_eq!(requalify_decision(55, 60, 50), Some(true));
        assert_eq!(requalify_decision(49, 60, 50), None);
        assert_eq!(requalify_decision(60, 60, 50), None);
    }

    #[test]
    fn identical_cutoffs_flip_nothing() {
        for score in 0..=100 {
            assert_eq!(requalify_decision(score, 60, 60), None);
        }
    }
}
