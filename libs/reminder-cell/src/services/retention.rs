// libs/reminder-cell/src/services/retention.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Months, Utc};
use tokio::time::interval;
use tracing::{error, info, instrument};

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{ReminderError, RetentionReport};

const RETENTION_MONTHS: u32 = 6;

/// Low-frequency cleanup of records nobody will look at again:
/// cancelled appointments long past their last touch, and pending
/// bookings that were abandoned without approval.
pub struct RetentionService {
    store: Arc<StoreClient>,
}

impl RetentionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
        }
    }

    pub async fn run(self: Arc<Self>, sweep_hours: u64) {
        info!("Retention loop starting (every {} hours)", sweep_hours);
        let mut ticker = interval(StdDuration::from_secs(sweep_hours * 3600));

        loop {
            ticker.tick().await;
            match self.cleanup().await {
                Ok(report) => {
                    if report.cancelled_deleted > 0 || report.stale_deleted > 0 {
                        info!(
                            "Retention: removed {} cancelled and {} abandoned appointments",
                            report.cancelled_deleted, report.stale_deleted
                        );
                    }
                }
                Err(e) => error!("Retention cleanup failed: {}", e),
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn cleanup(&self) -> Result<RetentionReport, ReminderError> {
        let horizon = Utc::now() - Months::new(RETENTION_MONTHS);
        let horizon_param = urlencoding::encode(&horizon.to_rfc3339()).into_owned();

        let cancelled = self
            .store
            .delete(
                "appointments",
                &format!("status=eq.cancelled&updated_at=lt.{}", horizon_param),
            )
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;

        let stale = self
            .store
            .delete(
                "appointments",
                &format!(
                    "status=eq.pending_approval&scheduled_start=lt.{}",
                    horizon_param
                ),
            )
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;

        Ok(RetentionReport {
            cancelled_deleted: cancelled.len(),
            stale_deleted: stale.len(),
        })
    }
}
