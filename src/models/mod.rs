pub mod drive_candidate;
pub mod drive_session;
pub mod notification_log;
pub mod question;
pub mod test_session;
