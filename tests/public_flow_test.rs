use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use drive_backend::dto::operator_dto::{CreateDrivePayload, CreateQuestionPayload};
use drive_backend::models::drive_candidate::DriveCandidate;
use drive_backend::utils::roster::RosterRow;
use drive_backend::AppState;

async fn setup_state() -> AppState {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("NOTIFIER_WEBHOOK_URL", "http://localhost/notify");
    env::set_var("OPERATOR_RPS", "100");
    env::set_var("PUBLIC_RPS", "100");

    let _ = drive_backend::config::init_config();
    let pool = drive_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    AppState::new(pool)
}

fn public_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/public/tests/:token",
            get(drive_backend::routes::public::get_test_by_token),
        )
        .route(
            "/api/public/tests/:token/start",
            post(drive_backend::routes::public::start_test),
        )
        .route(
            "/api/public/tests/:token/answer",
            patch(drive_backend::routes::public::save_answer),
        )
        .route(
            "/api/public/tests/:token/submit",
            post(drive_backend::routes::public::submit_test),
        )
        .route(
            "/api/public/tests/:token/status",
            get(drive_backend::routes::public::get_status),
        )
        .with_state(state)
}

fn roster_row(name: &str, email: &str) -> RosterRow {
    RosterRow {
        name: name.to_string(),
        email: email.to_string(),
        phone: None,
        college: None,
    }
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn candidate_test_flow_end_to_end() {
    let state = setup_state().await;
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    let (drive, outcome) = state
        .drive_service
        .create(CreateDrivePayload {
            name: format!("Campus Drive {}", suffix),
            drive_type: "campus".to_string(),
            job_id: None,
            aptitude_cutoff: 60,
            technical_cutoff: 60,
            test_duration_minutes: 10,
            question_count: 2,
            roster: vec![
                roster_row("Alice", &format!("alice_{}@example.com", suffix)),
                roster_row("Bob", &format!("bob_{}@example.com", suffix)),
            ],
        })
        .await
        .expect("create drive");
    assert_eq!(outcome.imported, 2);
    assert_eq!(drive.status, "registration");

    let questions: Vec<CreateQuestionPayload> = (0..3)
        .map(|i| CreateQuestionPayload {
            drive_session_id: Some(drive.id),
            job_id: None,
            question: format!("Question {}", i),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: 0,
            difficulty: None,
            category: None,
            test_round: 1,
            tags: None,
        })
        .collect();
    state
        .question_bank
        .add_questions(questions)
        .await
        .expect("seed questions");

    let alice = sqlx::query_as::<_, DriveCandidate>(
        "SELECT * FROM drive_candidates WHERE drive_session_id = $1 AND name = 'Alice'",
    )
    .bind(drive.id)
    .fetch_one(&state.pool)
    .await
    .expect("alice");

    let session = state
        .session_service
        .issue_session(drive.id, alice.id, 1, false)
        .await
        .expect("issue session");
    // configured 2, available 3 -> exactly 2 issued
    assert_eq!(session.total_questions, 2);
    let token = session.test_token.clone();

    let app = public_router(state.clone());

    // fetch: questions visible, correct answers not
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/public/tests/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Question"));
    assert!(!text.contains("correct_answer"));

    // start is idempotent
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/public/tests/{}/start", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let first = json_body(resp).await;
    assert_eq!(first["status"], "in_progress");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/public/tests/{}/start", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let second = json_body(resp).await;
    assert_eq!(first["expires_at"], second["expires_at"]);

    // answer one question inline
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/public/tests/{}/answer", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"question_index": 0, "choice": 0}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // out-of-range answers are rejected
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/public/tests/{}/answer", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"question_index": 9, "choice": 0}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // submit the rest batched; both answers correct -> 100, qualified
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/public/tests/{}/submit", token))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"answers": [{"question_index": 1, "choice": 0}]}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let submitted = json_body(resp).await;
    assert_eq!(submitted["score"], 100);
    assert_eq!(submitted["passed"], true);
    assert_eq!(submitted["status"], "completed");

    // double submit collapses to the same authoritative result
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/public/tests/{}/submit", token))
                .header("content-type", "application/json")
                .body(Body::from(json!({"answers": []}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resubmitted = json_body(resp).await;
    assert_eq!(resubmitted["score"], 100);

    // qualification advanced the candidate to round 2
    let alice = sqlx::query_as::<_, DriveCandidate>(
        "SELECT * FROM drive_candidates WHERE id = $1",
    )
    .bind(alice.id)
    .fetch_one(&state.pool)
    .await
    .unwrap();
    assert_eq!(alice.current_round, 2);
    assert_eq!(alice.qualification_status, "qualified");
    assert_eq!(alice.aptitude_score, Some(100));
    assert_eq!(alice.registration_status, "aptitude_completed");

    // counters reflect the recompute
    let drive = state.drive_service.get(drive.id).await.unwrap();
    assert_eq!(drive.aptitude_qualified_count, 1);

    // unknown tokens are a plain 404
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/public/tests/nosuchtoken")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "requires a running Postgres with DATABASE_URL set"]
async fn expired_session_auto_submits_on_access() {
    let state = setup_state().await;
    let suffix = uuid::Uuid::new_v4().simple().to_string();

    let (drive, _) = state
        .drive_service
        .create(CreateDrivePayload {
            name: format!("Expiry Drive {}", suffix),
            drive_type: "walk_in".to_string(),
            job_id: None,
            aptitude_cutoff: 50,
            technical_cutoff: 50,
            test_duration_minutes: 5,
            question_count: 2,
            roster: vec![roster_row("Eve", &format!("eve_{}@example.com", suffix))],
        })
        .await
        .unwrap();

    state
        .question_bank
        .add_questions(
            (0..2)
                .map(|i| CreateQuestionPayload {
                    drive_session_id: Some(drive.id),
                    job_id: None,
                    question: format!("Q{}", i),
                    options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                    correct_answer: 1,
                    difficulty: None,
                    category: None,
                    test_round: 1,
                    tags: None,
                })
                .collect(),
        )
        .await
        .unwrap();

    let eve = sqlx::query_as::<_, DriveCandidate>(
        "SELECT * FROM drive_candidates WHERE drive_session_id = $1",
    )
    .bind(drive.id)
    .fetch_one(&state.pool)
    .await
    .unwrap();

    let session = state
        .session_service
        .issue_session(drive.id, eve.id, 1, false)
        .await
        .unwrap();
    state
        .session_service
        .start_session(&session.test_token)
        .await
        .unwrap();
    state
        .session_service
        .record_answer(&session.test_token, 0, 1)
        .await
        .unwrap();

    // force the deadline into the past
    sqlx::query("UPDATE test_sessions SET expires_at = NOW() - INTERVAL '1 minute' WHERE id = $1")
        .bind(session.id)
        .execute(&state.pool)
        .await
        .unwrap();

    // any access settles the session; the recorded answer still counts
    let resolved = state
        .session_service
        .resolve_by_token(&session.test_token)
        .await
        .unwrap();
    assert_eq!(resolved.status, "completed");
    assert_eq!(resolved.correct_answers, 1);
    assert_eq!(resolved.score, Some(50));

    // answering after completion is rejected without state change
    let err = state
        .session_service
        .record_answer(&session.test_token, 1, 1)
        .await;
    assert!(err.is_err());
    let again = state
        .session_service
        .resolve_by_token(&session.test_token)
        .await
        .unwrap();
    assert_eq!(again.score, Some(50));
}
