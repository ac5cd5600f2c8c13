// libs/reminder-cell/src/models.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::AppError;

/// The two fixed lead-time windows. Each window fires at most once per
/// appointment, tracked by its own persisted flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderWindow {
    DayBefore,
    HalfHour,
}

impl ReminderWindow {
    pub const ALL: [ReminderWindow; 2] = [ReminderWindow::DayBefore, ReminderWindow::HalfHour];

    /// Bounds on `scheduled_start` for an appointment to be due now.
    pub fn due_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match self {
            ReminderWindow::DayBefore => (now + Duration::hours(23), now + Duration::hours(24)),
            ReminderWindow::HalfHour => (now + Duration::minutes(25), now + Duration::minutes(30)),
        }
    }

    pub fn flag_column(&self) -> &'static str {
        match self {
            ReminderWindow::DayBefore => "reminder_24h_sent",
            ReminderWindow::HalfHour => "reminder_30m_sent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReminderWindow::DayBefore => "24h",
            ReminderWindow::HalfHour => "30m",
        }
    }
}

/// Structured facts handed to the notification gateway. Message text is
/// composed downstream, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub to_phone: String,
    pub patient_name: Option<String>,
    pub clinic_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub lead: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SweepReport {
    pub dispatched: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RetentionReport {
    pub cancelled_deleted: usize,
    pub stale_deleted: usize,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReminderError {
    #[error("Reminder dispatch failed: {0}")]
    Dispatch(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("A sweep is already in progress")]
    SweepInProgress,
}

impl From<ReminderError> for AppError {
    fn from(err: ReminderError) -> Self {
        match err {
            ReminderError::Dispatch(msg) => AppError::ExternalService(msg),
            ReminderError::Store(msg) => AppError::Database(msg),
            ReminderError::SweepInProgress => AppError::Conflict(err.to_string()),
        }
    }
}
