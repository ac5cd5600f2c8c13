use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_service_key: String,
    pub notify_base_url: String,
    pub notify_api_token: String,
    pub reminder_sweep_minutes: u64,
    pub retention_sweep_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, using empty value");
                    String::new()
                }),
            store_service_key: env::var("STORE_SERVICE_KEY")
                .unwrap_or_else(|_| {
                    warn!("STORE_SERVICE_KEY not set, using empty value");
                    String::new()
                }),
            notify_base_url: env::var("NOTIFY_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("NOTIFY_BASE_URL not set, using empty value");
                    String::new()
                }),
            notify_api_token: env::var("NOTIFY_API_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("NOTIFY_API_TOKEN not set, using empty value");
                    String::new()
                }),
            reminder_sweep_minutes: env::var("REMINDER_SWEEP_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            retention_sweep_hours: env::var("RETENTION_SWEEP_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty() && !self.store_service_key.is_empty()
    }

    pub fn is_notification_configured(&self) -> bool {
        !self.notify_base_url.is_empty() && !self.notify_api_token.is_empty()
    }
}
