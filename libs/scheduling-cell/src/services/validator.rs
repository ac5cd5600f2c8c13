// libs/scheduling-cell/src/services/validator.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::StoreClient;

use crate::models::{BookingDecision, SchedulingError, SchedulingMode};
use crate::services::availability::AvailabilityService;
use crate::services::capacity::CapacityService;
use crate::services::settings::SettingsService;

/// The single gate every booking path goes through: website bookings,
/// edits, and offline reconciliation. No path may mutate the store
/// without an accepting decision from here.
pub struct BookingValidatorService {
    settings: SettingsService,
    availability: AvailabilityService,
    capacity: CapacityService,
}

impl BookingValidatorService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self {
            settings: SettingsService::new(Arc::clone(&store)),
            availability: AvailabilityService::new(Arc::clone(&store)),
            capacity: CapacityService::new(store),
        }
    }

    pub async fn validate(
        &self,
        clinic_id: Uuid,
        doctor_id: Option<Uuid>,
        start: DateTime<Utc>,
        duration_minutes: i32,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<BookingDecision, SchedulingError> {
        let settings = self.settings.get_settings().await?;

        // Simple mode disables enforcement entirely for low-volume clinics.
        if settings.mode == SchedulingMode::Simple {
            debug!("Simple mode active, accepting booking without checks");
            return Ok(BookingDecision::accepted());
        }

        match doctor_id {
            Some(doctor_id) => {
                let check = self
                    .availability
                    .check_availability(doctor_id, start, duration_minutes, exclude_appointment_id)
                    .await?;
                if let Some(conflict) = check.conflict {
                    info!(
                        "Booking rejected: doctor {} busy at {} (appointment {})",
                        doctor_id, start, conflict.id
                    );
                    return Ok(BookingDecision::doctor_busy(conflict));
                }
            }
            None => {
                let check = self
                    .capacity
                    .check_capacity(
                        clinic_id,
                        start,
                        settings.max_per_hour,
                        exclude_appointment_id,
                    )
                    .await?;
                if !check.available {
                    info!(
                        "Booking rejected: clinic {} at hourly capacity ({}/{})",
                        clinic_id, check.current_count, check.max_count
                    );
                    return Ok(BookingDecision::clinic_full(
                        check.current_count,
                        check.max_count,
                    ));
                }
            }
        }

        Ok(BookingDecision::accepted())
    }
}
