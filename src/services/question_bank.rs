use crate::error::{Error, Result};
use crate::models::question::AptitudeQuestion;
use sqlx::PgPool;
use uuid::Uuid;

/// Thin glue over the question pool. Sessions snapshot whatever this hands
/// out, so bank edits never affect an already-issued test.
#[derive(Clone)]
pub struct QuestionBankService {
    pool: PgPool,
}

impl QuestionBankService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Uniform random sample for one round. Drive-scoped questions win over
    /// job-scoped ones over the shared pool; the caller gets
    /// `min(count, available)` rows. An empty pool is an error — a
    /// zero-question test is never issued.
    pub async fn sample_questions(
        &self,
        test_round: i32,
        job_id: Option<Uuid>,
        drive_session_id: Option<Uuid>,
        count: i64,
    ) -> Result<Vec<AptitudeQuestion>> {
        let questions = sqlx::query_as::<_, AptitudeQuestion>(
            r#"
            SELECT * FROM aptitude_questions
            WHERE test_round = $1
              AND (drive_session_id = $2 OR drive_session_id IS NULL)
              AND (job_id = $3 OR job_id IS NULL)
            ORDER BY (drive_session_id IS NULL), (job_id IS NULL), RANDOM()
            LIMIT $4
            "#,
        )
        .bind(test_round)
        .bind(drive_session_id)
        .bind(job_id)
        .bind(count)
        .fetch_all(&self.pool)
        .await?;

        if questions.is_empty() {
            return Err(Error::BadRequest(format!(
                "Question pool is empty for round {}",
                test_round
            )));
        }

        if (questions.len() as i64) < count {
            tracing::warn!(
                test_round,
                requested = count,
                available = questions.len(),
                "question pool short, issuing shortened test"
            );
        }

        Ok(questions)
    }

    pub async fn add_questions(
        &self,
        payloads: Vec<crate::dto::operator_dto::CreateQuestionPayload>,
    ) -> Result<usize> {
        let mut inserted = 0;
        for payload in payloads {
            if payload.options.len() != 4 {
                return Err(Error::BadRequest(
                    "A question must have exactly 4 options".to_string(),
                ));
            }
            if !(0..4).contains(&payload.correct_answer) {
                return Err(Error::BadRequest(
                    "correct_answer must index one of the 4 options".to_string(),
                ));
            }
            if !(1..=2).contains(&payload.test_round) {
                return Err(Error::BadRequest(
                    "test_round must be 1 (aptitude) or 2 (technical)".to_string(),
                ));
            }

            sqlx::query(
                r#"
                INSERT INTO aptitude_questions
                    (drive_session_id, job_id, question, options, correct_answer,
                     difficulty, category, test_round, tags)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(payload.drive_session_id)
            .bind(payload.job_id)
            .bind(&payload.question)
            .bind(serde_json::to_value(&payload.options)?)
            .bind(payload.correct_answer)
            .bind(payload.difficulty.as_deref().unwrap_or("medium"))
            .bind(&payload.category)
            .bind(payload.test_round)
            .bind(serde_json::to_value(payload.tags.unwrap_or_default())?)
            .execute(&self.pool)
            .await?;
            inserted += 1;
        }
        Ok(inserted)
    }
}
