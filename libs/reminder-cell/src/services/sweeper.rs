// libs/reminder-cell/src/services/sweeper.rs
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::{interval, timeout};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use scheduling_cell::models::{Appointment, AppointmentStatus};
use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{ReminderError, ReminderMessage, ReminderWindow, SweepReport};
use crate::services::dispatch::NotificationClient;

const DISPATCH_TIMEOUT_SECS: u64 = 10;

/// Periodic sweep over the two reminder windows. The sent flag is
/// persisted only after a successful dispatch, so a failed send stays
/// eligible on the next sweep: at-least-once, never at-most-once.
/// Duplicates across process restarts are accepted; missed reminders
/// are not.
pub struct ReminderSweepService {
    store: Arc<StoreClient>,
    notifier: NotificationClient,
    sweep_guard: Mutex<()>,
    dispatch_timeout: StdDuration,
}

impl ReminderSweepService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: Arc::new(StoreClient::new(config)),
            notifier: NotificationClient::new(config),
            sweep_guard: Mutex::new(()),
            dispatch_timeout: StdDuration::from_secs(DISPATCH_TIMEOUT_SECS),
        }
    }

    /// Fixed wall-clock cadence; ticks are scheduled whether or not the
    /// previous sweep finished, and the single-flight guard drops any
    /// tick that would overlap a running sweep.
    pub async fn run(self: Arc<Self>, sweep_minutes: u64) {
        info!("Reminder sweep loop starting (every {} minutes)", sweep_minutes);
        let mut ticker = interval(StdDuration::from_secs(sweep_minutes * 60));

        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(report) => {
                    if report.dispatched > 0 || report.failed > 0 {
                        info!(
                            "Sweep done: {} dispatched, {} failed",
                            report.dispatched, report.failed
                        );
                    }
                }
                Err(ReminderError::SweepInProgress) => {
                    warn!("Previous sweep still running, skipping this tick");
                }
                Err(e) => error!("Sweep failed: {}", e),
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<SweepReport, ReminderError> {
        let _guard = self
            .sweep_guard
            .try_lock()
            .map_err(|_| ReminderError::SweepInProgress)?;

        let now = Utc::now();
        let mut report = SweepReport::default();

        for window in ReminderWindow::ALL {
            let due = match self.due_appointments(window, now).await {
                Ok(due) => due,
                Err(e) => {
                    // Store trouble on one window must not stop the other.
                    error!("Could not query {} due set: {}", window.label(), e);
                    continue;
                }
            };
            debug!("{} window: {} due appointments", window.label(), due.len());

            for appointment in due {
                self.remind(&appointment, window, &mut report).await;
            }
        }

        Ok(report)
    }

    async fn remind(
        &self,
        appointment: &Appointment,
        window: ReminderWindow,
        report: &mut SweepReport,
    ) {
        let Some(phone) = appointment.patient_phone.clone() else {
            warn!(
                "Appointment {} has no phone on record, cannot remind",
                appointment.id
            );
            report.failed += 1;
            return;
        };

        let message = ReminderMessage {
            to_phone: phone,
            patient_name: appointment.patient_name.clone(),
            clinic_id: appointment.clinic_id,
            scheduled_start: appointment.scheduled_start,
            lead: window.label().to_string(),
        };

        // One slow gateway call must not stall the rest of the sweep.
        match timeout(self.dispatch_timeout, self.notifier.send_reminder(&message)).await {
            Ok(Ok(())) => match self.mark_sent(appointment.id, window).await {
                Ok(()) => report.dispatched += 1,
                Err(e) => {
                    // Flag stays false; the reminder may be sent again.
                    warn!(
                        "Dispatched {} reminder for {} but could not persist the flag: {}",
                        window.label(),
                        appointment.id,
                        e
                    );
                    report.failed += 1;
                }
            },
            Ok(Err(e)) => {
                warn!(
                    "Dispatch of {} reminder for {} failed, will retry next sweep: {}",
                    window.label(),
                    appointment.id,
                    e
                );
                report.failed += 1;
            }
            Err(_) => {
                warn!(
                    "Dispatch of {} reminder for {} timed out, will retry next sweep",
                    window.label(),
                    appointment.id
                );
                report.failed += 1;
            }
        }
    }

    async fn due_appointments(
        &self,
        window: ReminderWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<Appointment>, ReminderError> {
        let (earliest, latest) = window.due_bounds(now);
        let filters = vec![
            "status=eq.confirmed".to_string(),
            format!("{}=is.false", window.flag_column()),
            format!(
                "scheduled_start=gte.{}",
                urlencoding::encode(&earliest.to_rfc3339())
            ),
            format!(
                "scheduled_start=lte.{}",
                urlencoding::encode(&latest.to_rfc3339())
            ),
        ];

        let rows: Vec<Appointment> = self
            .store
            .select("appointments", &filters.join("&"))
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;

        Ok(rows
            .into_iter()
            .filter(|a| a.status == AppointmentStatus::Confirmed)
            .filter(|a| !flag_is_set(a, window))
            .filter(|a| a.scheduled_start >= earliest && a.scheduled_start <= latest)
            .collect())
    }

    async fn mark_sent(
        &self,
        appointment_id: Uuid,
        window: ReminderWindow,
    ) -> Result<(), ReminderError> {
        // Flag flip only. `updated_at` is reserved for booking and
        // reconciliation writes; sync status derives last-sync from it.
        let body = json!({ window.flag_column(): true });

        let _rows: Vec<Appointment> = self
            .store
            .update("appointments", &format!("id=eq.{}", appointment_id), body)
            .await
            .map_err(|e| ReminderError::Store(e.to_string()))?;

        Ok(())
    }
}

fn flag_is_set(appointment: &Appointment, window: ReminderWindow) -> bool {
    match window {
        ReminderWindow::DayBefore => appointment.reminder_24h_sent,
        ReminderWindow::HalfHour => appointment.reminder_30m_sent,
    }
}
