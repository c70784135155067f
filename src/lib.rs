pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::services::{
    bulk_service::BulkService, drive_service::DriveService,
    notification_service::NotificationService, qualification_service::QualificationService,
    question_bank::QuestionBankService, session_service::SessionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub drive_service: DriveService,
    pub session_service: SessionService,
    pub qualification_service: QualificationService,
    pub bulk_service: BulkService,
    pub question_bank: QuestionBankService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let drive_service = DriveService::new(pool.clone());
        let session_service = SessionService::new(pool.clone());
        let qualification_service = QualificationService::new(pool.clone());
        let bulk_service = BulkService::new(pool.clone());
        let question_bank = QuestionBankService::new(pool.clone());
        let notification_service = NotificationService::from_config(pool.clone());

        Self {
            pool,
            drive_service,
            session_service,
            qualification_service,
            bulk_service,
            question_bank,
            notification_service,
        }
    }
}
