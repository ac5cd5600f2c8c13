// libs/scheduling-cell/src/services/directory.rs
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use shared_database::StoreClient;

use crate::models::SchedulingError;

/// Existence checks against the clinic/doctor directory tables.
pub struct DirectoryService {
    store: Arc<StoreClient>,
}

impl DirectoryService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn clinic_exists(&self, clinic_id: Uuid) -> Result<bool, SchedulingError> {
        self.exists("clinics", clinic_id).await
    }

    pub async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, SchedulingError> {
        self.exists("doctors", doctor_id).await
    }

    async fn exists(&self, table: &str, id: Uuid) -> Result<bool, SchedulingError> {
        let rows: Vec<Value> = self
            .store
            .select(table, &format!("id=eq.{}&select=id&limit=1", id))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        Ok(!rows.is_empty())
    }
}
