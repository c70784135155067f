use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use drive_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    // overdue in-progress sessions are auto-submitted even if nobody
    // touches their token again
    {
        let state = app_state.clone();
        let interval = Duration::from_secs(config.expiry_sweep_interval_seconds);
        tokio::spawn(async move {
            loop {
                match state.session_service.sweep_expired().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(interval).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "expiry sweeper error");
                        tokio::time::sleep(interval).await;
                    }
                }
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let operator_api = Router::new()
        .route(
            "/api/operator/drives",
            get(routes::operator::list_drives).post(routes::operator::create_drive),
        )
        .route(
            "/api/operator/drives/:id",
            get(routes::operator::get_drive).delete(routes::operator::delete_drive),
        )
        .route(
            "/api/operator/drives/:id/advance",
            post(routes::operator::advance_drive),
        )
        .route(
            "/api/operator/drives/:id/cutoffs",
            patch(routes::operator::update_cutoffs),
        )
        .route(
            "/api/operator/drives/:id/roster",
            post(routes::operator::import_roster),
        )
        .route(
            "/api/operator/drives/:id/candidates",
            get(routes::operator::list_candidates),
        )
        .route(
            "/api/operator/drives/:id/candidates/:candidate_id",
            get(routes::operator::get_candidate),
        )
        .route(
            "/api/operator/drives/:id/candidates/:candidate_id/sessions",
            post(routes::operator::issue_session),
        )
        .route(
            "/api/operator/drives/:id/schedule-interviews",
            post(routes::operator::schedule_interviews),
        )
        .route(
            "/api/operator/drives/:id/finalize-selection",
            post(routes::operator::finalize_selection),
        )
        .route(
            "/api/operator/drives/:id/notify/next-round",
            post(routes::operator::notify_next_round),
        )
        .route(
            "/api/operator/drives/:id/notify/screening",
            post(routes::operator::notify_screening),
        )
        .route(
            "/api/operator/drives/:id/export",
            get(routes::operator::export_candidates),
        )
        .route(
            "/api/operator/questions",
            post(routes::operator::create_questions),
        )
        .layer(axum::middleware::from_fn_with_state(
            drive_backend::middleware::rate_limit::new_rps_state(config.operator_rps),
            drive_backend::middleware::rate_limit::rps_middleware,
        ));

    let public_api = Router::new()
        .route(
            "/api/public/tests/:token",
            get(routes::public::get_test_by_token),
        )
        .route(
            "/api/public/tests/:token/start",
            post(routes::public::start_test),
        )
        .route(
            "/api/public/tests/:token/answer",
            patch(routes::public::save_answer),
        )
        .route(
            "/api/public/tests/:token/submit",
            post(routes::public::submit_test),
        )
        .route(
            "/api/public/tests/:token/status",
            get(routes::public::get_status),
        )
        .layer(axum::middleware::from_fn_with_state(
            drive_backend::middleware::rate_limit::new_rps_state(config.public_rps),
            drive_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(operator_api)
        .merge(public_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
