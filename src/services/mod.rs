pub mod bulk_service;
pub mod drive_service;
pub mod export_service;
pub mod notification_service;
pub mod qualification_service;
pub mod question_bank;
pub mod scoring;
pub mod session_service;
