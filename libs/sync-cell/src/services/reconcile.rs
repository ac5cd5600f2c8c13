// libs/sync-cell/src/services/reconcile.rs
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentKind, AppointmentOrigin, AppointmentStatus, SchedulingError,
    SchedulingMode, SchedulingSettings,
};
use scheduling_cell::services::availability::{intervals_overlap, AvailabilityService};
use scheduling_cell::services::directory::DirectoryService;
use scheduling_cell::services::settings::SettingsService;
use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{
    ReconcileReport, ReconcileRequest, ScheduleConflict, SyncAction, SyncAppointmentItem,
    SyncConflict, SyncError, SyncFailure, SyncStatus, SyncSuccess,
};

/// Pre-buffer applied in front of operations when scanning for
/// operation/consultation clashes.
const OPERATION_PRE_BUFFER_MINUTES: i64 = 60;

/// How far back the conflict scan fetches. A consultation already
/// underway can still clash with an upcoming operation's widened
/// window, so the fetch must reach behind `now`.
const CONFLICT_SCAN_LOOKBACK_HOURS: i64 = 24;

enum ItemOutcome {
    Upserted(SyncSuccess),
    Conflicting(SyncConflict),
}

/// Idempotently merges appointment batches pushed by the offline
/// scheduling program, keyed by external id.
pub struct ReconciliationService {
    store: Arc<StoreClient>,
    settings: SettingsService,
    availability: AvailabilityService,
    directory: DirectoryService,
}

impl ReconciliationService {
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(StoreClient::new(config));
        Self {
            settings: SettingsService::new(Arc::clone(&store)),
            availability: AvailabilityService::new(Arc::clone(&store)),
            directory: DirectoryService::new(Arc::clone(&store)),
            store,
        }
    }

    /// Process a batch into a three-way partition. Each item runs inside
    /// its own error boundary; nothing rolls back across items.
    pub async fn reconcile(&self, request: ReconcileRequest) -> Result<ReconcileReport, SyncError> {
        info!(
            "Reconciling {} offline appointments (scope clinic {:?})",
            request.appointments.len(),
            request.clinic_id
        );

        let settings = self.settings.get_settings().await?;
        let mut report = ReconcileReport::default();

        for item in request.appointments {
            let external_id = item.external_id.clone();
            match self.process_item(item, request.clinic_id, &settings).await {
                Ok(ItemOutcome::Upserted(success)) => report.success.push(success),
                Ok(ItemOutcome::Conflicting(conflict)) => report.conflicts.push(conflict),
                Err(message) => {
                    warn!("Sync item {} failed: {}", external_id, message);
                    report.errors.push(SyncFailure {
                        external_id,
                        message,
                    });
                }
            }
        }

        info!(
            "Reconciliation done: {} succeeded, {} conflicting, {} errored",
            report.success.len(),
            report.conflicts.len(),
            report.errors.len()
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        item: SyncAppointmentItem,
        scope_clinic_id: Option<Uuid>,
        settings: &SchedulingSettings,
    ) -> Result<ItemOutcome, String> {
        if item.duration_minutes <= 0 {
            return Err("Appointment duration must be positive".to_string());
        }

        // A scoped caller's clinic is authoritative.
        let clinic_id = match scope_clinic_id {
            Some(scope) => {
                if let Some(supplied) = item.clinic_id {
                    if supplied != scope {
                        return Err(format!(
                            "Item clinic {} does not match the caller's clinic {}",
                            supplied, scope
                        ));
                    }
                }
                scope
            }
            None => item
                .clinic_id
                .ok_or_else(|| "Missing clinic reference".to_string())?,
        };

        if !self
            .directory
            .clinic_exists(clinic_id)
            .await
            .map_err(|e| e.to_string())?
        {
            return Err(format!("Unknown clinic {}", clinic_id));
        }
        if let Some(doctor_id) = item.doctor_id {
            if !self
                .directory
                .doctor_exists(doctor_id)
                .await
                .map_err(|e| e.to_string())?
            {
                return Err(format!("Unknown doctor {}", doctor_id));
            }
        }

        let existing = self
            .find_by_external_id(&item.external_id)
            .await
            .map_err(|e| e.to_string())?;

        if settings.mode == SchedulingMode::Advanced {
            if let Some(doctor_id) = item.doctor_id {
                let check = self
                    .availability
                    .check_availability(
                        doctor_id,
                        item.scheduled_start,
                        item.duration_minutes,
                        existing.as_ref().map(|a| a.id),
                    )
                    .await
                    .map_err(|e| e.to_string())?;

                if let Some(conflict) = check.conflict {
                    debug!(
                        "Sync item {} conflicts with appointment {}",
                        item.external_id, conflict.id
                    );
                    return Ok(ItemOutcome::Conflicting(SyncConflict {
                        external_id: item.external_id,
                        message: "The doctor already has an appointment in this time slot"
                            .to_string(),
                        conflict: Some(conflict),
                    }));
                }
            }
        }

        match existing {
            Some(current) => self
                .update_existing(&current, &item, clinic_id)
                .await
                .map_err(|e| e.to_string()),
            None => self
                .create_new(&item, clinic_id)
                .await
                .map_err(|e| e.to_string()),
        }
    }

    async fn update_existing(
        &self,
        current: &Appointment,
        item: &SyncAppointmentItem,
        clinic_id: Uuid,
    ) -> Result<ItemOutcome, SchedulingError> {
        let mut update_data = serde_json::Map::new();
        update_data.insert("clinic_id".to_string(), json!(clinic_id));
        update_data.insert("doctor_id".to_string(), json!(item.doctor_id));
        update_data.insert(
            "scheduled_start".to_string(),
            json!(item.scheduled_start.to_rfc3339()),
        );
        update_data.insert("duration_minutes".to_string(), json!(item.duration_minutes));
        update_data.insert("patient_name".to_string(), json!(item.patient_name));
        update_data.insert("patient_phone".to_string(), json!(item.patient_phone));
        update_data.insert("national_id".to_string(), json!(item.national_id));
        update_data.insert("notes".to_string(), json!(item.notes));
        // A moved appointment must be reminded again for its new time.
        if item.scheduled_start != current.scheduled_start {
            update_data.insert("reminder_24h_sent".to_string(), json!(false));
            update_data.insert("reminder_30m_sent".to_string(), json!(false));
        }
        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let rows: Vec<Appointment> = self
            .store
            .update(
                "appointments",
                &format!("id=eq.{}", current.id),
                Value::Object(update_data),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let updated = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Store("empty update response".to_string()))?;

        Ok(ItemOutcome::Upserted(SyncSuccess {
            external_id: item.external_id.clone(),
            appointment_id: updated.id,
            action: SyncAction::Updated,
        }))
    }

    async fn create_new(
        &self,
        item: &SyncAppointmentItem,
        clinic_id: Uuid,
    ) -> Result<ItemOutcome, SchedulingError> {
        let now = Utc::now();
        let appointment_data = json!({
            "external_id": item.external_id,
            "clinic_id": clinic_id,
            "doctor_id": item.doctor_id,
            "patient_id": Value::Null,
            "patient_name": item.patient_name,
            "patient_phone": item.patient_phone,
            "national_id": item.national_id,
            "scheduled_start": item.scheduled_start.to_rfc3339(),
            "duration_minutes": item.duration_minutes,
            "kind": AppointmentKind::Operation.to_string(),
            "status": AppointmentStatus::Confirmed.to_string(),
            "origin": AppointmentOrigin::OfflineSoftware.to_string(),
            "reminder_24h_sent": false,
            "reminder_30m_sent": false,
            "notes": item.notes,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let rows: Vec<Appointment> = self
            .store
            .insert("appointments", appointment_data)
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        let created = rows
            .into_iter()
            .next()
            .ok_or_else(|| SchedulingError::Store("empty insert response".to_string()))?;

        Ok(ItemOutcome::Upserted(SyncSuccess {
            external_id: item.external_id.clone(),
            appointment_id: created.id,
            action: SyncAction::Created,
        }))
    }

    /// Delete an offline-sourced appointment. Website bookings cannot be
    /// deleted through the sync path.
    pub async fn delete_by_external_id(&self, external_id: &str) -> Result<(), SyncError> {
        let appointment = self
            .find_by_external_id(external_id)
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?
            .ok_or_else(|| SyncError::ExternalIdNotFound(external_id.to_string()))?;

        if appointment.origin != AppointmentOrigin::OfflineSoftware {
            warn!(
                "Refusing sync delete of website appointment {} (external id {})",
                appointment.id, external_id
            );
            return Err(SyncError::NotOfflineOrigin);
        }

        self.store
            .delete("appointments", &format!("id=eq.{}", appointment.id))
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        info!("Deleted synced appointment {} ({})", appointment.id, external_id);
        Ok(())
    }

    /// Connectivity, mode, offline-appointment count, and the most recent
    /// sync write time (derived from offline rows' `updated_at`).
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let settings = self.settings.get_settings().await?;

        let offline: Vec<Appointment> = self
            .store
            .select(
                "appointments",
                "origin=eq.offline_software&order=updated_at.desc",
            )
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        Ok(SyncStatus {
            connected: true,
            mode: settings.mode,
            offline_appointment_count: offline.len(),
            last_sync_time: offline.first().map(|a| a.updated_at),
        })
    }

    /// Scan upcoming operations against same-doctor consultations, with
    /// the operation's window widened by a one-hour pre-buffer. Read-only
    /// diagnostics, independent of any write path.
    pub async fn conflict_report(&self) -> Result<Vec<ScheduleConflict>, SyncError> {
        let now = Utc::now();
        let scan_from = now - Duration::hours(CONFLICT_SCAN_LOOKBACK_HOURS);
        let filters = vec![
            "status=in.(pending_approval,confirmed)".to_string(),
            format!(
                "scheduled_start=gte.{}",
                urlencoding::encode(&scan_from.to_rfc3339())
            ),
            "order=scheduled_start.asc".to_string(),
        ];

        let rows: Vec<Appointment> = self
            .store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| SyncError::Store(e.to_string()))?;

        // Only upcoming operations matter; consultations may already be
        // underway and still clash with the widened window.
        let mut conflicts = Vec::new();
        for operation in rows.iter().filter(|a| {
            a.kind == AppointmentKind::Operation && a.is_active() && a.scheduled_start >= now
        }) {
            let Some(doctor_id) = operation.doctor_id else {
                continue;
            };
            let widened_start =
                operation.scheduled_start - Duration::minutes(OPERATION_PRE_BUFFER_MINUTES);

            for consultation in rows.iter().filter(|a| {
                a.kind == AppointmentKind::Consultation
                    && a.is_active()
                    && a.doctor_id == Some(doctor_id)
            }) {
                if intervals_overlap(
                    widened_start,
                    operation.scheduled_end(),
                    consultation.scheduled_start,
                    consultation.scheduled_end(),
                ) {
                    conflicts.push(ScheduleConflict {
                        doctor_id,
                        operation: operation.into(),
                        consultation: consultation.into(),
                    });
                }
            }
        }

        debug!("Conflict report found {} clashes", conflicts.len());
        Ok(conflicts)
    }

    async fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Appointment>, SchedulingError> {
        let rows: Vec<Appointment> = self
            .store
            .select(
                "appointments",
                &format!("external_id=eq.{}", urlencoding::encode(external_id)),
            )
            .await
            .map_err(|e| SchedulingError::Store(e.to_string()))?;

        Ok(rows.into_iter().next())
    }
}
