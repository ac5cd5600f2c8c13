// libs/sync-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use scheduling_cell::models::{AppointmentSummary, SchedulingError, SchedulingMode};
use shared_models::AppError;

// ==============================================================================
// RECONCILIATION MODELS
// ==============================================================================

/// One appointment descriptor pushed by the offline scheduling program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncAppointmentItem {
    pub external_id: String,
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub national_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// Clinic the caller is scoped to, if any. When set it is
    /// authoritative: items naming a different clinic are errors.
    pub clinic_id: Option<Uuid>,
    pub appointments: Vec<SyncAppointmentItem>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSuccess {
    pub external_id: String,
    pub appointment_id: Uuid,
    pub action: SyncAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConflict {
    pub external_id: String,
    pub message: String,
    pub conflict: Option<AppointmentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    pub external_id: String,
    pub message: String,
}

/// Three-way partition of a reconciliation batch. Items are processed
/// independently; one failure never aborts the rest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub success: Vec<SyncSuccess>,
    pub conflicts: Vec<SyncConflict>,
    pub errors: Vec<SyncFailure>,
}

// ==============================================================================
// STATUS AND DIAGNOSTICS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatus {
    pub connected: bool,
    pub mode: SchedulingMode,
    pub offline_appointment_count: usize,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// An upcoming operation overlapping a same-doctor consultation,
/// surfaced proactively before either write path trips on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub doctor_id: Uuid,
    pub operation: AppointmentSummary,
    pub consultation: AppointmentSummary,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SyncError {
    #[error("No appointment with external id {0}")]
    ExternalIdNotFound(String),

    #[error("Only appointments sourced from the offline software can be deleted through sync")]
    NotOfflineOrigin,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::ExternalIdNotFound(ext) => {
                AppError::NotFound(format!("No appointment with external id {}", ext))
            }
            SyncError::NotOfflineOrigin => AppError::BadRequest(err.to_string()),
            SyncError::Store(msg) => AppError::Database(msg),
        }
    }
}

impl From<SchedulingError> for SyncError {
    fn from(err: SchedulingError) -> Self {
        SyncError::Store(err.to_string())
    }
}
