use chrono::{DateTime, Utc};

/// Server time is the only clock: expiry math never trusts a
/// client-supplied timestamp.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
