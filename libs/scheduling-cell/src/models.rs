// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use shared_models::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    /// Idempotency key supplied by the offline scheduling program.
    /// Unique when present; null for website bookings.
    pub external_id: Option<String>,
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub national_id: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
    pub origin: AppointmentOrigin,
    pub reminder_24h_sent: bool,
    pub reminder_30m_sent: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// End of the appointment's half-open interval `[start, end)`.
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_start + chrono::Duration::minutes(self.duration_minutes as i64)
    }

    /// Active = still occupying its slot (not cancelled).
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::PendingApproval | AppointmentStatus::Confirmed
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    PendingApproval,
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::PendingApproval => write!(f, "pending_approval"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentKind {
    Consultation,
    Operation,
}

impl fmt::Display for AppointmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentKind::Consultation => write!(f, "consultation"),
            AppointmentKind::Operation => write!(f, "operation"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentOrigin {
    Website,
    OfflineSoftware,
}

impl fmt::Display for AppointmentOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentOrigin::Website => write!(f, "website"),
            AppointmentOrigin::OfflineSoftware => write!(f, "offline_software"),
        }
    }
}

// ==============================================================================
// SCHEDULING SETTINGS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    Simple,
    Advanced,
}

impl fmt::Display for SchedulingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulingMode::Simple => write!(f, "simple"),
            SchedulingMode::Advanced => write!(f, "advanced"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingSettings {
    pub mode: SchedulingMode,
    pub max_per_hour: i32,
}

impl Default for SchedulingSettings {
    // Absence of configuration is a valid state, not a failure.
    fn default() -> Self {
        Self {
            mode: SchedulingMode::Simple,
            max_per_hour: 10,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub national_id: Option<String>,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default = "default_kind")]
    pub kind: AppointmentKind,
    pub notes: Option<String>,
}

fn default_kind() -> AppointmentKind {
    AppointmentKind::Consultation
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_start: DateTime<Utc>,
    pub new_duration_minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub clinic_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayScheduleQuery {
    pub clinic_id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub date: NaiveDate,
}

// ==============================================================================
// BOOKING DECISION MODELS
// ==============================================================================

/// Compact view of the appointment blocking a candidate slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentSummary {
    pub id: Uuid,
    pub doctor_id: Option<Uuid>,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: AppointmentKind,
    pub status: AppointmentStatus,
}

impl From<&Appointment> for AppointmentSummary {
    fn from(appointment: &Appointment) -> Self {
        Self {
            id: appointment.id,
            doctor_id: appointment.doctor_id,
            scheduled_start: appointment.scheduled_start,
            scheduled_end: appointment.scheduled_end(),
            duration_minutes: appointment.duration_minutes,
            kind: appointment.kind,
            status: appointment.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub conflict: Option<AppointmentSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityCheck {
    pub available: bool,
    pub current_count: i32,
    pub max_count: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectionReason {
    DoctorBusy,
    ClinicFull,
}

/// Outcome of the single booking gate. A rejection is a normal result,
/// not an error: the caller gets a machine-readable reason plus the
/// conflicting record or counts to render a useful message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDecision {
    pub can_book: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<AppointmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<i32>,
}

impl BookingDecision {
    pub fn accepted() -> Self {
        Self {
            can_book: true,
            reason: None,
            message: None,
            conflict: None,
            current_count: None,
            max_count: None,
        }
    }

    pub fn doctor_busy(conflict: AppointmentSummary) -> Self {
        Self {
            can_book: false,
            reason: Some(RejectionReason::DoctorBusy),
            message: Some("The doctor already has an appointment in this time slot".to_string()),
            conflict: Some(conflict),
            current_count: None,
            max_count: None,
        }
    }

    pub fn clinic_full(current_count: i32, max_count: i32) -> Self {
        Self {
            can_book: false,
            reason: Some(RejectionReason::ClinicFull),
            message: Some(format!(
                "The clinic has reached its hourly capacity ({} of {})",
                current_count, max_count
            )),
            conflict: None,
            current_count: Some(current_count),
            max_count: Some(max_count),
        }
    }
}

/// Result of the website booking path: either a stored appointment or
/// the validator's structured rejection.
#[derive(Debug, Clone)]
pub enum BookingResult {
    Booked(Appointment),
    Rejected(BookingDecision),
}

// ==============================================================================
// SLOT PROJECTION MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccupiedSlot {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub kind: AppointmentKind,
    pub doctor_id: Option<Uuid>,
}

impl From<&Appointment> for OccupiedSlot {
    fn from(appointment: &Appointment) -> Self {
        Self {
            start_time: appointment.scheduled_start,
            end_time: appointment.scheduled_end(),
            duration_minutes: appointment.duration_minutes,
            kind: appointment.kind,
            doctor_id: appointment.doctor_id,
        }
    }
}

/// Per-hour count of unassigned bookings for a clinic day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyLoad {
    pub counts: BTreeMap<u32, i32>,
    pub max_per_hour: i32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
            SchedulingError::ClinicNotFound => AppError::NotFound("Clinic not found".to_string()),
            SchedulingError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
            SchedulingError::InvalidTime(msg) => AppError::ValidationError(msg),
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::InvalidStatusTransition { .. } => AppError::Conflict(err.to_string()),
            SchedulingError::Store(msg) => AppError::Database(msg),
        }
    }
}
