use crate::dto::operator_dto::CreateDrivePayload;
use crate::error::{Error, Result};
use crate::models::drive_candidate::{CandidateStatus, DriveCandidate};
use crate::models::drive_session::{DriveSession, DriveStage, DriveType};
use crate::utils::roster::{self, RosterRow, SkippedRow};
use crate::utils::token::generate_access_token;
use sqlx::PgPool;
use uuid::Uuid;

/// Owns drive configuration and lifecycle, and the roster import path.
#[derive(Clone)]
pub struct DriveService {
    pool: PgPool,
}

#[derive(Debug)]
pub struct ImportOutcome {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
}

impl DriveService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a drive and imports its roster in one transaction. Invalid
    /// rows are skipped and reported individually; valid rows always land.
    /// Finishes in `registration` with `total_candidates` set.
    pub async fn create(
        &self,
        payload: CreateDrivePayload,
    ) -> Result<(DriveSession, ImportOutcome)> {
        validate_config(&payload)?;
        let drive_type = DriveType::parse(&payload.drive_type).ok_or_else(|| {
            Error::BadRequest(format!("Unknown drive type '{}'", payload.drive_type))
        })?;

        let parsed = roster::validate_rows(payload.roster, &[]);

        let mut tx = self.pool.begin().await?;

        let drive = sqlx::query_as::<_, DriveSession>(
            r#"
            INSERT INTO drive_sessions (
                name, drive_type, job_id, aptitude_cutoff, technical_cutoff,
                test_duration_minutes, question_count, status
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 'draft')
            RETURNING *
            "#,
        )
        .bind(&payload.name)
        .bind(drive_type.as_str())
        .bind(payload.job_id)
        .bind(payload.aptitude_cutoff)
        .bind(payload.technical_cutoff)
        .bind(payload.test_duration_minutes)
        .bind(payload.question_count)
        .fetch_one(&mut *tx)
        .await?;

        for row in &parsed.rows {
            insert_candidate(&mut tx, drive.id, row).await?;
        }

        let drive = sqlx::query_as::<_, DriveSession>(
            r#"
            UPDATE drive_sessions
            SET status = 'registration', total_candidates = $1, registered_count = $1,
                updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(parsed.rows.len() as i32)
        .bind(drive.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            drive_session_id = %drive.id,
            imported = parsed.rows.len(),
            skipped = parsed.skipped.len(),
            "drive created"
        );

        Ok((
            drive,
            ImportOutcome {
                imported: parsed.rows.len(),
                skipped: parsed.skipped,
            },
        ))
    }

    /// Appends roster rows to a drive still in `registration`. Same per-row
    /// validation and dedup as `create`; emails already in the session are
    /// skipped, not overwritten.
    pub async fn import_roster(
        &self,
        drive_session_id: Uuid,
        rows: Vec<RosterRow>,
    ) -> Result<ImportOutcome> {
        let drive = self.get(drive_session_id).await?;
        if drive.stage() != Some(DriveStage::Registration) {
            return Err(Error::BadRequest(format!(
                "Roster can only be imported during registration, drive is '{}'",
                drive.status
            )));
        }

        let known: Vec<String> = sqlx::query_scalar::<_, String>(
            r#"SELECT email FROM drive_candidates WHERE drive_session_id = $1"#,
        )
        .bind(drive_session_id)
        .fetch_all(&self.pool)
        .await?;

        let parsed = roster::validate_rows(rows, &known);

        let mut tx = self.pool.begin().await?;
        for row in &parsed.rows {
            insert_candidate(&mut tx, drive_session_id, row).await?;
        }
        tx.commit().await?;

        self.update_counts(drive_session_id).await?;

        tracing::info!(
            drive_session_id = %drive_session_id,
            imported = parsed.rows.len(),
            skipped = parsed.skipped.len(),
            "roster imported"
        );

        Ok(ImportOutcome {
            imported: parsed.rows.len(),
            skipped: parsed.skipped,
        })
    }

    /// Moves the drive one stage forward. Backward transitions do not exist.
    pub async fn advance_stage(&self, drive_session_id: Uuid) -> Result<DriveSession> {
        let drive = self.get(drive_session_id).await?;
        let stage = drive
            .stage()
            .ok_or_else(|| Error::Internal(format!("Unknown drive status '{}'", drive.status)))?;
        let next = stage.next().ok_or_else(|| {
            Error::BadRequest("Drive is already completed".to_string())
        })?;

        // CAS on the current status so two concurrent advances move one stage, not two
        let updated = sqlx::query_as::<_, DriveSession>(
            r#"
            UPDATE drive_sessions SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(next.as_str())
        .bind(drive_session_id)
        .bind(stage.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(drive) => {
                tracing::info!(drive_session_id = %drive.id, stage = next.as_str(), "drive advanced");
                Ok(drive)
            }
            None => self.get(drive_session_id).await,
        }
    }

    /// Full recompute of every denormalized counter. Counters are never
    /// incremented in place.
    pub async fn update_counts(&self, drive_session_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE drive_sessions ds SET
                total_candidates = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id),
                registered_count = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id),
                aptitude_qualified_count = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id AND c.current_round >= 2),
                technical_qualified_count = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id AND c.current_round >= 3),
                interview_scheduled_count = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id AND c.interview_scheduled),
                final_selected_count = (SELECT COUNT(*) FROM drive_candidates c
                    WHERE c.drive_session_id = ds.id AND c.registration_status = $1),
                updated_at = NOW()
            WHERE ds.id = $2
            "#,
        )
        .bind(CandidateStatus::Selected.as_str())
        .bind(drive_session_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, drive_session_id: Uuid) -> Result<DriveSession> {
        let drive = sqlx::query_as::<_, DriveSession>(
            r#"SELECT * FROM drive_sessions WHERE id = $1"#,
        )
        .bind(drive_session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(drive)
    }

    pub async fn list(&self) -> Result<Vec<DriveSession>> {
        let drives = sqlx::query_as::<_, DriveSession>(
            r#"SELECT * FROM drive_sessions ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(drives)
    }

    pub async fn get_candidate(
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
        .ok_or_else(|| Error::NotFound("Candidate not found in this drive".to_string()))
    }

    /// Cascading and irreversible.
    pub async fn delete(&self, drive_session_id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM drive_sessions WHERE id = $1"#)
            .bind(drive_session_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Drive session not found".to_string()));
        }
        tracing::info!(drive_session_id = %drive_session_id, "drive deleted");
        Ok(())
    }
}

async fn insert_candidate(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    drive_session_id: Uuid,
    row: &RosterRow,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO drive_candidates (
            drive_session_id, name, email, phone, college,
            registration_token, registration_status
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(drive_session_id)
    .bind(&row.name)
    .bind(&row.email)
    .bind(&row.phone)
    .bind(&row.college)
    .bind(generate_access_token(24))
    .bind(CandidateStatus::Registered.as_str())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

fn validate_config(payload: &CreateDrivePayload) -> Result<()> {
    for cutoff in [payload.aptitude_cutoff, payload.technical_cutoff] {
        if !(0..=100).contains(&cutoff) {
            return Err(Error::BadRequest(
                "Cutoffs must be between 0 and 100".to_string(),
            ));
        }
    }
    if payload.test_duration_minutes < 1 {
        return Err(Error::BadRequest(
            "Test duration must be at least 1 minute".to_string(),
        ));
    }
    if payload.question_count < 1 {
        return Err(Error::BadRequest(
            "Question count must be at least 1".to_string(),
        ));
    }
    Ok(())
}
