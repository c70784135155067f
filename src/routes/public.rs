use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::public_dto::{
    GetTestResponse, PublicQuestion, SaveAnswerRequest, SaveAnswerResponse, StartTestResponse,
    StatusResponse, SubmitTestRequest, SubmitTestResponse,
};
use crate::models::test_session::TestSession;
use crate::services::qualification_service::qualifies;
use crate::utils::time;
use crate::AppState;

fn public_questions(session: &TestSession) -> Vec<PublicQuestion> {
    session
        .snapshot()
        .into_iter()
        .enumerate()
        .map(|(index, q)| PublicQuestion {
            index,
            question: q.question,
            options: q.options,
        })
        .collect()
}

#[axum::debug_handler]
pub async fn get_test_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.resolve_by_token(&token).await?;
    let drive = state.drive_service.get(session.drive_session_id).await?;

    let response = GetTestResponse {
        session_id: session.id,
        status: session.status.clone(),
        test_round: session.test_round,
        total_questions: session.total_questions,
        duration_minutes: drive.test_duration_minutes,
        started_at: session.started_at,
        expires_at: session.expires_at,
        questions: public_questions(&session),
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn start_test(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.start_session(&token).await?;

    let response = StartTestResponse {
        session_id: session.id,
        status: session.status.clone(),
        started_at: session.started_at.unwrap_or_else(time::now),
        expires_at: session.expires_at.unwrap_or_else(time::now),
        questions: public_questions(&session),
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SaveAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let timestamp = state
        .session_service
        .record_answer(&token, req.question_index, req.choice)
        .await?;
    Ok(Json(SaveAnswerResponse {
        saved: true,
        question_index: req.question_index,
        timestamp,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitTestRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let session = state
        .session_service
        .submit_session(&token, &req.answers)
        .await?;

    let drive = state.drive_service.get(session.drive_session_id).await?;
    let score = session.score.unwrap_or(0);
    let passed = drive
        .cutoff_for_round(session.test_round)
        .map(|cutoff| qualifies(score, cutoff))
        .unwrap_or(false);

    let response = SubmitTestResponse {
        session_id: session.id,
        status: session.status.clone(),
        score,
        passed,
        correct_answers: session.correct_answers,
        total_questions: session.total_questions,
    };
    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn get_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let session = state.session_service.resolve_by_token(&token).await?;

    let time_remaining = match (session.session_status(), session.expires_at) {
        (Some(crate::models::test_session::TestSessionStatus::InProgress), Some(expires)) => {
            Some((expires - time::now()).num_seconds().max(0) as i32)
        }
        _ => None,
    };

    let response = StatusResponse {
        status: session.status.clone(),
        started_at: session.started_at,
        time_remaining_seconds: time_remaining,
        questions_answered: session.answered_questions,
        total_questions: session.total_questions,
    };
    Ok(Json(response).into_response())
}
