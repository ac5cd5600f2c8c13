// libs/reminder-cell/src/services/dispatch.rs
use reqwest::Client;
use serde_json::json;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{ReminderError, ReminderMessage};

/// Fire-and-observe client for the outbound notification gateway. The
/// gateway owns message templating; we only supply structured facts.
pub struct NotificationClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl NotificationClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.notify_base_url.clone(),
            api_token: config.notify_api_token.clone(),
        }
    }

    pub async fn send_reminder(&self, message: &ReminderMessage) -> Result<(), ReminderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(
            "Dispatching {} reminder to {} for {}",
            message.lead, message.to_phone, message.scheduled_start
        );

        let body = json!({
            "to": message.to_phone,
            "template": "appointment_reminder",
            "facts": {
                "patient_name": message.patient_name,
                "clinic_id": message.clinic_id,
                "scheduled_start": message.scheduled_start.to_rfc3339(),
                "lead": message.lead,
            },
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReminderError::Dispatch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ReminderError::Dispatch(format!(
                "gateway returned {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
