// libs/scheduling-cell/src/services/slots.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_database::StoreClient;

use crate::models::{
    Appointment, AppointmentStatus, HourlyLoad, OccupiedSlot, SchedulingError, SchedulingMode,
    SchedulingSettings,
};

/// Projects which time ranges a caller should render as busy for a
/// clinic day, under the mode-specific visibility rules. Callers fetch
/// the settings once and pass them to each projection.
pub struct SlotProjectionService {
    store: Arc<StoreClient>,
}

impl SlotProjectionService {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self { store }
    }

    /// Simple mode shows only confirmed appointments of a specific doctor
    /// (unassigned bookings never occupy a visible slot); advanced mode
    /// shows every active appointment of the clinic, optionally narrowed
    /// to one doctor.
    pub async fn occupied_slots(
        &self,
        clinic_id: Uuid,
        doctor_id: Option<Uuid>,
        date: NaiveDate,
        settings: &SchedulingSettings,
    ) -> Result<Vec<OccupiedSlot>, SchedulingError> {
        let (day_start, day_end) = day_bounds(date);
        debug!(
            "Projecting occupied slots for clinic {} on {} (mode {})",
            clinic_id, date, settings.mode
        );

        match settings.mode {
            SchedulingMode::Simple => {
                let Some(doctor_id) = doctor_id else {
                    return Ok(vec![]);
                };
                let appointments = self
                    .clinic_day_appointments(clinic_id, day_start, day_end)
                    .await?;
                Ok(appointments
                    .iter()
                    .filter(|a| a.status == AppointmentStatus::Confirmed)
                    .filter(|a| a.doctor_id == Some(doctor_id))
                    .filter(|a| a.scheduled_start >= day_start && a.scheduled_start < day_end)
                    .map(OccupiedSlot::from)
                    .collect())
            }
            SchedulingMode::Advanced => {
                let appointments = self
                    .clinic_day_appointments(clinic_id, day_start, day_end)
                    .await?;
                Ok(appointments
                    .iter()
                    .filter(|a| a.is_active())
                    .filter(|a| doctor_id.is_none() || a.doctor_id == doctor_id)
                    .filter(|a| a.scheduled_start >= day_start && a.scheduled_start < day_end)
                    .map(OccupiedSlot::from)
                    .collect())
            }
        }
    }

    /// Per-hour counts of active unassigned bookings for the day. Empty
    /// in simple mode, where hourly capacity is not enforced.
    pub async fn hourly_unassigned_counts(
        &self,
        clinic_id: Uuid,
        date: NaiveDate,
        settings: &SchedulingSettings,
    ) -> Result<HourlyLoad, SchedulingError> {
        if settings.mode == SchedulingMode::Simple {
            return Ok(HourlyLoad {
                counts: BTreeMap::new(),
                max_per_hour: settings.max_per_hour,
            });
        }

        let (day_start, day_end) = day_bounds(date);
        let appointments = self
            .clinic_day_appointments(clinic_id, day_start, day_end)
            .await?;

        let mut counts: BTreeMap<u32, i32> = BTreeMap::new();
        for appointment in appointments
            .iter()
            .filter(|a| a.is_active() && a.doctor_id.is_none())
            .filter(|a| a.scheduled_start >= day_start && a.scheduled_start < day_end)
        {
            *counts.entry(appointment.scheduled_start.hour()).or_insert(0) += 1;
        }

        Ok(HourlyLoad {
            counts,
            max_per_hour: settings.max_per_hour,
        })
    }

    async fn clinic_day_appointments(
        &self,
        clinic_id: Uuid,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let filters = vec![
            format!("clinic_id=eq.{}", clinic_id),
            "status=in.(pending_approval,confirmed)".to_string(),
            format!(
                "scheduled_start=gte.{}",
                urlencoding::encode(&day_start.to_rfc3339())
            ),
            format!(
                "scheduled_start=lt.{}",
                urlencoding::encode(&day_end.to_rfc3339())
            ),
            "order=scheduled_start.asc".to_string(),
        ];

        self.store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))
    }
}

/// Calendar day as a half-open interval, midnight to midnight.
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let day_start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let day_end = day_start + chrono::Duration::days(1);
    (day_start, day_end)
}
