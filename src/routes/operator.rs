use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::operator_dto::{
    BulkCandidatesPayload, BulkScheduleResponse, BulkSelectResponse, CandidateFilterQuery,
    CreateDrivePayload, CreateDriveResponse, CreateQuestionsPayload, ExportQuery,
    ImportRosterResponse, IssueSessionPayload, IssueSessionResponse, NotifyNextRoundPayload,
    NotifyResponse, UpdateCutoffsPayload, UpdateCutoffsResponse,
};
use crate::services::bulk_service::CandidateFilter;
use crate::services::export_service::{ExportFormat, ExportService};
use crate::utils::roster;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_drive(
    State(state): State<AppState>,
    Json(payload): Json<CreateDrivePayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let (drive, outcome) = state.drive_service.create(payload).await?;
    let response = CreateDriveResponse {
        drive,
        candidate_count: outcome.imported,
        skipped: outcome.skipped,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn list_drives(State(state): State<AppState>) -> crate::error::Result<Response> {
    let drives = state.drive_service.list().await?;
    Ok(Json(drives).into_response())
}

#[axum::debug_handler]
pub async fn get_drive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let drive = state.drive_service.get(id).await?;
    Ok(Json(drive).into_response())
}

#[axum::debug_handler]
pub async fn advance_drive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let drive = state.drive_service.advance_stage(id).await?;
    Ok(Json(drive).into_response())
}

#[axum::debug_handler]
pub async fn update_cutoffs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCutoffsPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let requalified = state
        .qualification_service
        .recalculate_cutoffs(id, payload.aptitude_cutoff, payload.technical_cutoff)
        .await?;
    Ok(Json(UpdateCutoffsResponse {
        requalified_candidates: requalified,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn delete_drive(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    state.drive_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn import_roster(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: axum::extract::Multipart,
) -> crate::error::Result<Response> {
    let mut rows = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            let data = field.bytes().await?;
            rows = Some(roster::parse_csv(&data)?);
        }
    }
    let rows = rows.ok_or_else(|| {
        crate::error::Error::BadRequest("Missing 'file' field with the roster CSV".to_string())
    })?;

    let outcome = state.drive_service.import_roster(id, rows).await?;
    Ok(Json(ImportRosterResponse {
        imported: outcome.imported,
        skipped: outcome.skipped,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn list_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<CandidateFilterQuery>,
) -> crate::error::Result<Response> {
    let filter = CandidateFilter::from_query(
        query.min_aptitude,
        query.max_aptitude,
        query.min_technical,
        query.max_technical,
        query.status.as_deref(),
        query.current_round.as_deref(),
    )?;
    let candidates = state.bulk_service.filter_candidates(id, &filter).await?;
    Ok(Json(candidates).into_response())
}

#[axum::debug_handler]
pub async fn get_candidate(
    State(state): State<AppState>,
    Path((id, candidate_id)): Path<(Uuid, Uuid)>,
) -> crate::error::Result<Response> {
    let candidate = state.drive_service.get_candidate(id, candidate_id).await?;
    Ok(Json(candidate).into_response())
}

#[axum::debug_handler]
pub async fn issue_session(
    State(state): State<AppState>,
    Path((id, candidate_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<IssueSessionPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let session = state
        .session_service
        .issue_session(id, candidate_id, payload.test_round, payload.reissue)
        .await?;
    let response = IssueSessionResponse {
        session_id: session.id,
        test_token: session.test_token,
        status: session.status,
        test_round: session.test_round,
        total_questions: session.total_questions,
    };
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

#[axum::debug_handler]
pub async fn schedule_interviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkCandidatesPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let outcome = state
        .bulk_service
        .bulk_schedule_interviews(id, &payload.candidate_ids)
        .await?;
    Ok(Json(BulkScheduleResponse {
        scheduled: outcome.succeeded,
        skipped: outcome.skipped,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn finalize_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BulkCandidatesPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let outcome = state
        .bulk_service
        .bulk_finalize_selection(id, &payload.candidate_ids)
        .await?;
    Ok(Json(BulkSelectResponse {
        selected: outcome.succeeded,
        skipped: outcome.skipped,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn notify_next_round(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<NotifyNextRoundPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let outcome = state
        .bulk_service
        .send_next_round_emails(id, payload.round, &state.notification_service)
        .await?;
    Ok(Json(NotifyResponse {
        notified: outcome.succeeded,
        failed: outcome.skipped,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn notify_screening(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let outcome = state
        .bulk_service
        .send_screening_emails(id, &state.notification_service)
        .await?;
    Ok(Json(NotifyResponse {
        notified: outcome.succeeded,
        failed: outcome.skipped,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn export_candidates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExportQuery>,
) -> crate::error::Result<Response> {
    let format = match query.format.as_deref() {
        None => ExportFormat::Csv,
        Some(raw) => ExportFormat::parse(raw).ok_or_else(|| {
            crate::error::Error::BadRequest(format!("Unknown export format '{}'", raw))
        })?,
    };

    let drive = state.drive_service.get(id).await?;
    let candidates = state
        .bulk_service
        .filter_candidates(id, &CandidateFilter::default())
        .await?;

    let buffer = match format {
        ExportFormat::Csv => ExportService::generate_candidates_csv(&candidates)?,
        ExportFormat::Xlsx => ExportService::generate_candidates_xlsx(&drive, &candidates)?,
    };

    let filename = format!(
        "drive_{}_{}.{}",
        drive.name.replace(' ', "_"),
        chrono::Utc::now().format("%Y%m%d"),
        format.extension()
    );
    let disposition = format!("attachment; filename=\"{}\"", filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        buffer,
    )
        .into_response())
}

#[axum::debug_handler]
pub async fn create_questions(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionsPayload>,
) -> crate::error::Result<Response> {
    payload.validate()?;
    let inserted = state.question_bank.add_questions(payload.questions).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "inserted": inserted })),
    )
        .into_response())
}
