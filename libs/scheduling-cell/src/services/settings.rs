// libs/scheduling-cell/src/services/settings.rs
use std::sync::Arc;

use tracing::debug;

use shared_database::StoreClient;

use crate::models::{SchedulingError, SchedulingSettings};

/// Read access to the singleton scheduling settings record.
pub struct SettingsService {
    store: Arc<StoreClient>,
}

impl SettingsService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Returns the stored settings, or hard defaults (simple mode, 10 per
    /// hour) when no record exists. Absence of configuration is a valid
    /// state, so there is no error path for an empty table.
    pub async fn get_settings(&self) -> Result<SchedulingSettings, SchedulingError> {
        let rows: Vec<SchedulingSettings> = self
            .store
            .select("scheduling_settings", "limit=1")
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let settings = rows.into_iter().next().unwrap_or_default();
        debug!(
            "Scheduling settings: mode={}, max_per_hour={}",
            settings.mode, settings.max_per_hour
        );

        Ok(settings)
    }
}
