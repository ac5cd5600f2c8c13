// libs/scheduling-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{
    Appointment, AppointmentOrigin, AppointmentSearchQuery, AppointmentStatus,
    BookAppointmentRequest, BookingResult, RescheduleAppointmentRequest, SchedulingError,
    SchedulingMode,
};
use crate::services::directory::DirectoryService;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::settings::SettingsService;
use crate::services::validator::BookingValidatorService;

/// Website booking path: request validation, directory checks, the
/// validator gate, and status lifecycle operations.
pub struct BookingService {
    store: Arc<StoreClient>,
    validator: BookingValidatorService,
    directory: DirectoryService,
    settings: SettingsService,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(StoreClient::new(config));
        Self {
            validator: BookingValidatorService::new(Arc::clone(&store)),
            directory: DirectoryService::new(Arc::clone(&store)),
            settings: SettingsService::new(Arc::clone(&store)),
            lifecycle: AppointmentLifecycleService::new(),
            store,
        }
    }

    /// Book a new appointment. Advanced mode confirms immediately;
    /// simple mode leaves it pending secretary approval.
    pub async fn book(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<BookingResult, SchedulingError> {
        info!(
            "Booking appointment for clinic {} (doctor {:?}) at {}",
            request.clinic_id, request.doctor_id, request.scheduled_start
        );

        self.validate_booking_request(&request)?;

        if !self.directory.clinic_exists(request.clinic_id).await? {
            return Err(SchedulingError::ClinicNotFound);
        }
        if let Some(doctor_id) = request.doctor_id {
            if !self.directory.doctor_exists(doctor_id).await? {
                return Err(SchedulingError::DoctorNotFound);
            }
        }

        let decision = self
            .validator
            .validate(
                request.clinic_id,
                request.doctor_id,
                request.scheduled_start,
                request.duration_minutes,
                None,
            )
            .await?;

        if !decision.can_book {
            warn!(
                "Booking rejected for clinic {} at {}: {:?}",
                request.clinic_id, request.scheduled_start, decision.reason
            );
            return Ok(BookingResult::Rejected(decision));
        }

        let settings = self.settings.get_settings().await?;
        let status = match settings.mode {
            SchedulingMode::Advanced => AppointmentStatus::Confirmed,
            SchedulingMode::Simple => AppointmentStatus::PendingApproval,
        };

        let now = Utc::now();
        let appointment_data = json!({
            "external_id": Value::Null,
            "clinic_id": request.clinic_id,
            "doctor_id": request.doctor_id,
            "patient_id": request.patient_id,
            "patient_name": request.patient_name,
            "patient_phone": request.patient_phone,
            "national_id": request.national_id,
            "scheduled_start": request.scheduled_start.to_rfc3339(),
            "duration_minutes": request.duration_minutes,
            "kind": request.kind.to_string(),
            "status": status.to_string(),
            "origin": AppointmentOrigin::Website.to_string(),
            "reminder_24h_sent": false,
            "reminder_30m_sent": false,
            "notes": request.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let rows: Vec<Appointment> = self
            .store
            .insert("appointments", appointment_data)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let appointment = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Store("empty insert response".to_string()))?;

        info!(
            "Appointment {} booked with status {}",
            appointment.id, appointment.status
        );
        Ok(BookingResult::Booked(appointment))
    }

    /// Secretary approval: pending -> confirmed.
    pub async fn approve(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Confirmed)?;

        self.update_status(appointment_id, AppointmentStatus::Confirmed)
            .await
    }

    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        let appointment = self.get(appointment_id).await?;
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        self.update_status(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    /// Move an appointment to a new time. Runs the validator excluding
    /// the appointment itself; a start change resets both reminder flags
    /// so reminders re-fire for the new time.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
    ) -> Result<BookingResult, SchedulingError> {
        let appointment = self.get(appointment_id).await?;

        if !appointment.is_active() {
            return Err(SchedulingError::Validation(
                "A cancelled appointment cannot be rescheduled".to_string(),
            ));
        }

        let duration_minutes = request
            .new_duration_minutes
            .unwrap_or(appointment.duration_minutes);
        if duration_minutes <= 0 {
            return Err(SchedulingError::InvalidTime(
                "Appointment duration must be positive".to_string(),
            ));
        }
        if request.new_start <= Utc::now() {
            return Err(SchedulingError::InvalidTime(
                "Rescheduled time must be in the future".to_string(),
            ));
        }

        let decision = self
            .validator
            .validate(
                appointment.clinic_id,
                appointment.doctor_id,
                request.new_start,
                duration_minutes,
                Some(appointment_id),
            )
            .await?;

        if !decision.can_book {
            return Ok(BookingResult::Rejected(decision));
        }

        let mut update_data = serde_json::Map::new();
        update_data.insert(
            "scheduled_start".to_string(),
            json!(request.new_start.to_rfc3339()),
        );
        update_data.insert("duration_minutes".to_string(), json!(duration_minutes));
        if request.new_start != appointment.scheduled_start {
            update_data.insert("reminder_24h_sent".to_string(), json!(false));
            update_data.insert("reminder_30m_sent".to_string(), json!(false));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let updated = self
            .patch_appointment(appointment_id, Value::Object(update_data))
            .await?;

        info!("Appointment {} rescheduled to {}", appointment_id, request.new_start);
        Ok(BookingResult::Booked(updated))
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        debug!("Fetching appointment {}", appointment_id);

        let rows: Vec<Appointment> = self
            .store
            .select("appointments", &format!("id=eq.{}", appointment_id))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        rows.into_iter().next().ok_or(SchedulingError::NotFound)
    }

    pub async fn search(
        &self,
        query: AppointmentSearchQuery,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Searching appointments: {:?}", query);

        let mut filters = Vec::new();
        if let Some(clinic_id) = query.clinic_id {
            filters.push(format!("clinic_id=eq.{}", clinic_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            filters.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(status) = query.status {
            filters.push(format!("status=eq.{}", status));
        }
        if let Some(from_date) = query.from_date {
            filters.push(format!(
                "scheduled_start=gte.{}",
                urlencoding::encode(&from_date.to_rfc3339())
            ));
        }
        if let Some(to_date) = query.to_date {
            filters.push(format!(
                "scheduled_start=lte.{}",
                urlencoding::encode(&to_date.to_rfc3339())
            ));
        }
        filters.push("order=scheduled_start.asc".to_string());
        if let Some(limit) = query.limit {
            filters.push(format!("limit={}", limit));
        }

        self.store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))
    }

    fn validate_booking_request(
        &self,
        request: &BookAppointmentRequest,
    ) -> Result<(), SchedulingError> {
        if request.duration_minutes <= 0 {
            return Err(SchedulingError::InvalidTime(
                "Appointment duration must be positive".to_string(),
            ));
        }
        if request.scheduled_start <= Utc::now() {
            return Err(SchedulingError::InvalidTime(
                "Appointment time must be in the future".to_string(),
            ));
        }
        let has_name = request
            .patient_name
            .as_deref()
            .map(|name| !name.trim().is_empty())
            .unwrap_or(false);
        if request.patient_id.is_none() && !has_name {
            return Err(SchedulingError::Validation(
                "A registered patient or a patient name is required".to_string(),
            ));
        }
        Ok(())
    }

    async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        let update_data = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339(),
        });
        let updated = self.patch_appointment(appointment_id, update_data).await?;

        info!("Appointment {} now {}", appointment_id, status);
        Ok(updated)
    }

    async fn patch_appointment(
        &self,
        appointment_id: Uuid,
        body: Value,
    ) -> Result<Appointment, SchedulingError> {
        let rows: Vec<Appointment> = self
            .store
            .update("appointments", &format!("id=eq.{}", appointment_id), body)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        rows.into_iter().next().ok_or(SchedulingError::NotFound)
    }
}
