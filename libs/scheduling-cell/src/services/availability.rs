// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::StoreClient;

use crate::models::{Appointment, AvailabilityCheck, SchedulingError};

/// Overlap checking for appointments assigned to a specific doctor.
pub struct AvailabilityService {
    store: Arc<StoreClient>,
}

impl AvailabilityService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Check whether a doctor is free for `[start, start + duration)`.
    ///
    /// Any active appointment whose interval strictly overlaps the
    /// candidate interval is a conflict; the first one found is returned.
    /// Back-to-back appointments do not conflict (half-open intervals).
    pub async fn check_availability(
        &self,
        doctor_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<AvailabilityCheck, SchedulingError> {
        let candidate_end = start + Duration::minutes(duration_minutes as i64);
        debug!(
            "Checking availability for doctor {} from {} to {}",
            doctor_id, start, candidate_end
        );

        let existing = self
            .active_doctor_appointments(doctor_id, exclude_appointment_id)
            .await?;

        for appointment in &existing {
            if Some(appointment.id) == exclude_appointment_id {
                continue;
            }
            if !appointment.is_active() {
                continue;
            }
            if intervals_overlap(
                start,
                candidate_end,
                appointment.scheduled_start,
                appointment.scheduled_end(),
            ) {
                warn!(
                    "Conflict for doctor {}: candidate {}..{} overlaps appointment {}",
                    doctor_id, start, candidate_end, appointment.id
                );
                return Ok(AvailabilityCheck {
                    available: false,
                    conflict: Some(appointment.into()),
                });
            }
        }

        Ok(AvailabilityCheck {
            available: true,
            conflict: None,
        })
    }

    async fn active_doctor_appointments(
        &self,
        doctor_id: Uuid,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let mut filters = vec![
            format!("doctor_id=eq.{}", doctor_id),
            "status=in.(pending_approval,confirmed)".to_string(),
        ];
        if let Some(exclude_id) = exclude_appointment_id {
            filters.push(format!("id=neq.{}", exclude_id));
        }
        filters.push("order=scheduled_start.asc".to_string());

        self.store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))
    }
}

/// Strict overlap of two half-open intervals `[start, end)`.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}
