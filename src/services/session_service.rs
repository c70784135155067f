use crate::dto::public_dto::AnswerItem;
use crate::error::{Error, Result};
use crate::models::drive_candidate::{CandidateStatus, DriveCandidate};
use crate::models::drive_session::DriveSession;
use crate::models::test_session::{SnapshotQuestion, TestSession, TestSessionStatus};
use crate::services::scoring::ScoringService;
use crate::utils::time;
use crate::utils::token::generate_access_token;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

/// Runs one candidate's timed attempt at one round: issue, start, answer,
/// submit. The TestSession row is the unit of mutual exclusion — every
/// status transition is a compare-and-set on `status`.
#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
}

impl SessionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a `pending` session for the candidate's current round and
    /// snapshots a question sample onto it. With `reissue`, a stale pending
    /// session is terminally marked `expired` and replaced; an `in_progress`
    /// session is never displaced.
    pub async fn issue_session(
        &self,
        drive_session_id: Uuid,
        candidate_id: Uuid,
        test_round: i32,
        reissue: bool,
    ) -> Result<TestSession> {
        if !(1..=2).contains(&test_round) {
            return Err(Error::BadRequest(
                "Only rounds 1 (aptitude) and 2 (technical) are test rounds".to_string(),
            ));
        }

        let drive = self.get_drive(drive_session_id).await?;
        let candidate = self.get_candidate(drive_session_id, candidate_id).await?;

        if candidate.current_round != test_round {
            return Err(Error::BadRequest(format!(
                "Candidate is at round {}, cannot issue a round {} test",
                candidate.current_round, test_round
            )));
        }

        let live = sqlx::query_as::<_, TestSession>(
            r#"
            SELECT * FROM test_sessions
            WHERE drive_candidate_id = $1 AND test_round = $2
              AND status IN ('pending', 'in_progress')
            "#,
        )
        .bind(candidate_id)
        .bind(test_round)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(existing) = live {
            if existing.status == TestSessionStatus::InProgress.as_str() {
                return Err(Error::Conflict(
                    "Candidate already has a test in progress for this round".to_string(),
                ));
            }
            if !reissue {
                return Err(Error::Conflict(
                    "Candidate already has a pending test for this round".to_string(),
                ));
            }
            sqlx::query(
                r#"UPDATE test_sessions SET status = 'expired', updated_at = NOW()
                   WHERE id = $1 AND status = 'pending'"#,
            )
            .bind(existing.id)
            .execute(&self.pool)
            .await?;
        }

        let bank = crate::services::question_bank::QuestionBankService::new(self.pool.clone());
        let questions = bank
            .sample_questions(
                test_round,
                drive.job_id,
                Some(drive.id),
                drive.question_count as i64,
            )
            .await?;

        let snapshot: Vec<SnapshotQuestion> = questions
            .iter()
            .map(|q| SnapshotQuestion {
                id: q.id,
                question: q.question.clone(),
                options: q.option_texts(),
                correct_answer: q.correct_answer,
            })
            .collect();

        let test_token = generate_access_token(32);
        let session = sqlx::query_as::<_, TestSession>(
            r#"
            INSERT INTO test_sessions (
                drive_candidate_id, drive_session_id, test_token, status, test_round,
                total_questions, questions_snapshot, responses
            ) VALUES ($1, $2, $3, 'pending', $4, $5, $6, '{}'::jsonb)
            RETURNING *
            "#,
        )
        .bind(candidate_id)
        .bind(drive_session_id)
        .bind(&test_token)
        .bind(test_round)
        .bind(snapshot.len() as i32)
        .bind(serde_json::to_value(&snapshot)?)
        .fetch_one(&self.pool)
        .await?;

        if let Some(status) = CandidateStatus::pending_for(test_round) {
            self.set_candidate_status(candidate_id, status).await?;
        }

        tracing::info!(
            session_id = %session.id,
            candidate_id = %candidate_id,
            test_round,
            total_questions = session.total_questions,
            "test session issued"
        );

        Ok(session)
    }

    /// Looks a session up by token and settles lazy expiry first: an
    /// overdue `in_progress` session is auto-submitted with whatever
    /// responses exist before the caller sees it.
    pub async fn resolve_by_token(&self, token: &str) -> Result<TestSession> {
        let session = sqlx::query_as::<_, TestSession>(
            r#"SELECT * FROM test_sessions WHERE test_token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Unknown test token".to_string()))?;

        if session.is_overdue(time::now()) {
            return self.auto_submit(&session).await;
        }
        Ok(session)
    }

    /// Idempotent start: the first call fixes `expires_at`; later calls
    /// return the session unchanged — no restart, no extension.
    pub async fn start_session(&self, token: &str) -> Result<TestSession> {
        let session = self.resolve_by_token(token).await?;

        match session.session_status() {
            Some(TestSessionStatus::Pending) => {}
            Some(TestSessionStatus::InProgress) | Some(TestSessionStatus::Completed) => {
                return Ok(session)
            }
            Some(TestSessionStatus::Expired) => {
                return Err(Error::Conflict(
                    "This test session was cancelled".to_string(),
                ))
            }
            None => {
                return Err(Error::Internal(format!(
                    "Unknown session status '{}'",
                    session.status
                )))
            }
        }

        let drive = self.get_drive(session.drive_session_id).await?;
        let now = time::now();
        let expires_at = now + Duration::minutes(drive.test_duration_minutes as i64);

        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET status = 'in_progress', started_at = $1, expires_at = $2, updated_at = NOW()
            WHERE test_token = $3 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(expires_at)
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        let session = match updated {
            Some(s) => {
                if let Some(status) = CandidateStatus::in_progress_for(s.test_round) {
                    self.set_candidate_status(s.drive_candidate_id, status).await?;
                }
                s
            }
            // lost the race to a concurrent start; the winner's timing stands
            None => self.resolve_by_token(token).await?,
        };

        Ok(session)
    }

    /// Last-write-wins single answer. Only an `in_progress` session inside
    /// its time window accepts answers.
    pub async fn record_answer(
        &self,
        token: &str,
        question_index: i32,
        choice: i32,
    ) -> Result<DateTime<Utc>> {
        let session = self.resolve_by_token(token).await?;

        if session.status != TestSessionStatus::InProgress.as_str() {
            return Err(Error::BadRequest(format!(
                "Session is '{}', not accepting answers",
                session.status
            )));
        }
        let now = time::now();
        if session.expires_at.map(|e| now >= e).unwrap_or(true) {
            return Err(Error::BadRequest(
                "Session time has elapsed".to_string(),
            ));
        }

        let snapshot = session.snapshot();
        validate_answer(&snapshot, question_index, choice)?;

        let mut responses = session.response_map();
        responses.insert(question_index as usize, choice as usize);
        let responses_json = to_response_json(&responses);

        let updated = sqlx::query(
            r#"
            UPDATE test_sessions
            SET responses = $1, answered_questions = $2, updated_at = NOW()
            WHERE id = $3 AND status = 'in_progress'
            "#,
        )
        .bind(&responses_json)
        .bind(responses.len() as i32)
        .bind(session.id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            // auto-submit or a concurrent submit closed the session under us
            return Err(Error::BadRequest(
                "Session is no longer accepting answers".to_string(),
            ));
        }

        Ok(now)
    }

    /// Scores the session against its snapshot. Batched answers are merged
    /// (last-write-wins) before grading. Idempotent: a completed session
    /// returns its existing score without rescoring.
    pub async fn submit_session(
        &self,
        token: &str,
        answers: &[AnswerItem],
    ) -> Result<TestSession> {
        let session = self.resolve_by_token(token).await?;

        match session.session_status() {
            Some(TestSessionStatus::Completed) => return Ok(session),
            Some(TestSessionStatus::InProgress) => {}
            Some(TestSessionStatus::Pending) => {
                return Err(Error::BadRequest(
                    "Session has not been started".to_string(),
                ))
            }
            Some(TestSessionStatus::Expired) => {
                return Err(Error::Conflict(
                    "This test session was cancelled".to_string(),
                ))
            }
            None => {
                return Err(Error::Internal(format!(
                    "Unknown session status '{}'",
                    session.status
                )))
            }
        }

        let snapshot = session.snapshot();
        let mut responses = session.response_map();
        for item in answers {
            validate_answer(&snapshot, item.question_index, item.choice)?;
            responses.insert(item.question_index as usize, item.choice as usize);
        }

        let now = time::now();
        self.complete_session(&session, &snapshot, &responses, now)
            .await
    }

    /// One scoring pass, serialized by a compare-and-set on `status`. The
    /// CAS loser returns the winner's row untouched.
    async fn complete_session(
        &self,
        session: &TestSession,
        snapshot: &[SnapshotQuestion],
        responses: &std::collections::HashMap<usize, usize>,
        completed_at: DateTime<Utc>,
    ) -> Result<TestSession> {
        let outcome = ScoringService::grade(snapshot, responses);
        let time_spent = session
            .started_at
            .map(|s| (completed_at - s).num_seconds().max(0) as i32);

        let updated = sqlx::query_as::<_, TestSession>(
            r#"
            UPDATE test_sessions
            SET status = 'completed', responses = $1, answered_questions = $2,
                correct_answers = $3, score = $4, completed_at = $5,
                time_spent_seconds = $6, updated_at = NOW()
            WHERE id = $7 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(to_response_json(responses))
        .bind(outcome.answered_questions)
        .bind(outcome.correct_answers)
        .bind(outcome.score)
        .bind(completed_at)
        .bind(time_spent)
        .bind(session.id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(completed) => {
                tracing::info!(
                    session_id = %completed.id,
                    score = outcome.score,
                    correct = outcome.correct_answers,
                    total = completed.total_questions,
                    "test session scored"
                );
                let engine =
                    crate::services::qualification_service::QualificationService::new(
                        self.pool.clone(),
                    );
                engine
                    .evaluate(
                        completed.drive_candidate_id,
                        completed.test_round,
                        outcome.score,
                    )
                    .await?;
                Ok(completed)
            }
            None => {
                // a concurrent submit won the CAS; its result is authoritative
                let current = sqlx::query_as::<_, TestSession>(
                    r#"SELECT * FROM test_sessions WHERE id = $1"#,
                )
                .bind(session.id)
                .fetch_one(&self.pool)
                .await?;
                Ok(current)
            }
        }
    }

    /// Expiry submit: scores whatever responses exist, with the deadline as
    /// the completion instant. No candidate work is ever discarded.
    async fn auto_submit(&self, session: &TestSession) -> Result<TestSession> {
        let snapshot = session.snapshot();
        let responses = session.response_map();
        let completed_at = session.expires_at.unwrap_or_else(time::now);
        tracing::info!(session_id = %session.id, "auto-submitting overdue session");
        self.complete_session(session, &snapshot, &responses, completed_at)
            .await
    }

    /// Background sweep for overdue sessions nobody touches. Returns whether
    /// any work was done, in the `run_once` worker convention.
    pub async fn sweep_expired(&self) -> Result<bool> {
        let overdue = sqlx::query_as::<_, TestSession>(
            r#"
            SELECT * FROM test_sessions
            WHERE status = 'in_progress' AND expires_at <= NOW()
            ORDER BY expires_at ASC
            LIMIT 100
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        if overdue.is_empty() {
            return Ok(false);
        }

        for session in &overdue {
            if let Err(e) = self.auto_submit(session).await {
                tracing::error!(session_id = %session.id, error = ?e, "sweep auto-submit failed");
            }
        }
        Ok(true)
    }

    pub async fn get_session_by_id(&self, id: Uuid) -> Result<TestSession> {
        let session =
            sqlx::query_as::<_, TestSession>(r#"SELECT * FROM test_sessions WHERE id = $1"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(session)
    }

    async fn get_drive(&self, id: Uuid) -> Result<DriveSession> {
        let drive =
            sqlx::query_as::<_, DriveSession>(r#"SELECT * FROM drive_sessions WHERE id = $1"#)
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(drive)
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
        .ok_or_else(|| Error::NotFound("Candidate not found in this drive".to_string()))
    }

    async fn set_candidate_status(
        &self,
        candidate_id: Uuid,
        status: CandidateStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE drive_candidates SET registration_status = $1, updated_at = NOW() WHERE id = $2"#,
        )
        .bind(status.as_str())
        .bind(candidate_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn validate_answer(
    snapshot: &[SnapshotQuestion],
    question_index: i32,
    choice: i32,
) -> Result<()> {
    if question_index < 0 || question_index as usize >= snapshot.len() {
        return Err(Error::BadRequest(format!(
            "Question index {} is out of range",
            question_index
        )));
    }
    let options = snapshot[question_index as usize].options.len() as i32;
    if choice < 0 || choice >= options {
        return Err(Error::BadRequest(format!(
            "Choice {} is out of range for question {}",
            choice, question_index
        )));
    }
    Ok(())
}

fn to_response_json(responses: &std::collections::HashMap<usize, usize>) -> serde_json::Value {
    let map: serde_json::Map<String, serde_json::Value> = responses
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    serde_json::Value::Object(map)
}
