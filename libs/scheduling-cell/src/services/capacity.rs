// libs/scheduling-cell/src/services/capacity.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::StoreClient;

use crate::models::{Appointment, CapacityCheck, SchedulingError};

/// Hourly capacity checking for bookings with no assigned doctor.
/// Unassigned bookings share undifferentiated clinic capacity, so only
/// the start-hour bucket matters; duration is deliberately ignored.
pub struct CapacityService {
    store: Arc<StoreClient>,
}

impl CapacityService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    pub async fn check_capacity(
        &self,
        clinic_id: Uuid,
        instant: DateTime<Utc>,
        max_per_hour: i32,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<CapacityCheck, SchedulingError> {
        let bucket_start = floor_to_hour(instant);
        let bucket_end = bucket_start + Duration::hours(1);
        debug!(
            "Checking capacity for clinic {} in bucket {}..{}",
            clinic_id, bucket_start, bucket_end
        );

        let appointments = self
            .unassigned_appointments_in_bucket(clinic_id, bucket_start, bucket_end)
            .await?;

        let current_count = appointments
            .iter()
            .filter(|appointment| Some(appointment.id) != exclude_appointment_id)
            .filter(|appointment| appointment.doctor_id.is_none() && appointment.is_active())
            .filter(|appointment| {
                appointment.scheduled_start >= bucket_start
                    && appointment.scheduled_start < bucket_end
            })
            .count() as i32;

        Ok(CapacityCheck {
            available: current_count < max_per_hour,
            current_count,
            max_count: max_per_hour,
        })
    }

    async fn unassigned_appointments_in_bucket(
        &self,
        clinic_id: Uuid,
        bucket_start: DateTime<Utc>,
        bucket_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let filters = vec![
            format!("clinic_id=eq.{}", clinic_id),
            "doctor_id=is.null".to_string(),
            "status=in.(pending_approval,confirmed)".to_string(),
            format!(
                "scheduled_start=gte.{}",
                urlencoding::encode(&bucket_start.to_rfc3339())
            ),
            format!(
                "scheduled_start=lt.{}",
                urlencoding::encode(&bucket_end.to_rfc3339())
            ),
        ];

        self.store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))
    }
}

fn floor_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(instant)
}
