use crate::error::Result;
use crate::models::notification_log::NotificationLog;
use reqwest::Client;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Delivery goes to an external notifier over HTTP with a bounded timeout.
/// Every call is logged; a failure is reported to the caller, never
/// retried in-line, and never gates a qualification transition.
#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
    client: Client,
    target_url: String,
}

impl NotificationService {
    pub fn new(pool: PgPool, target_url: String, timeout_seconds: u64) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            pool,
            client,
            target_url,
        }
    }

    pub fn from_config(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        Self::new(
            pool,
            config.notifier_webhook_url.clone(),
            config.notifier_timeout_seconds,
        )
    }

    /// Posts one event to the notifier and records the outcome. Returns
    /// whether delivery succeeded.
    pub async fn deliver(
        &self,
        drive_candidate_id: Option<Uuid>,
        event_type: &str,
        payload: &JsonValue,
    ) -> Result<bool> {
        let result = self
            .client
            .post(&self.target_url)
            .json(&json_event(event_type, payload))
            .send()
            .await;

        let (http_status, delivered) = match &result {
            Ok(resp) => (Some(resp.status().as_u16() as i32), resp.status().is_success()),
            Err(_) => (None, false),
        };

        let log = sqlx::query_as::<_, NotificationLog>(
            r#"
            INSERT INTO notification_logs
                (drive_candidate_id, event_type, payload, target_url, http_status, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(drive_candidate_id)
        .bind(event_type)
        .bind(payload)
        .bind(&self.target_url)
        .bind(http_status)
        .bind(if delivered { "success" } else { "failed" })
        .fetch_one(&self.pool)
        .await?;

        if !delivered {
            tracing::warn!(
                event_type,
                log_id = %log.id,
                candidate_id = ?drive_candidate_id,
                http_status = ?http_status,
                "notification delivery failed"
            );
        }

        Ok(delivered)
    }
}

fn json_event(event_type: &str, payload: &JsonValue) -> JsonValue {
    serde_json::json!({
        "event": event_type,
        "payload": payload,
    })
}
