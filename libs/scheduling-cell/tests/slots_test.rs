// libs/scheduling-cell/tests/slots_test.rs
//
// Mode-dependent visibility of the day schedule projection.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::{SchedulingMode, SchedulingSettings};
use scheduling_cell::services::slots::SlotProjectionService;
use shared_config::AppConfig;
use shared_database::StoreClient;

fn test_config(uri: &str) -> AppConfig {
    AppConfig {
        store_url: uri.to_string(),
        store_service_key: "test-key".to_string(),
        notify_base_url: String::new(),
        notify_api_token: String::new(),
        reminder_sweep_minutes: 5,
        retention_sweep_hours: 24,
    }
}

fn service(uri: &str) -> SlotProjectionService {
    SlotProjectionService::new(Arc::new(StoreClient::new(&test_config(uri))))
}

fn settings(mode: SchedulingMode, max_per_hour: i32) -> SchedulingSettings {
    SchedulingSettings { mode, max_per_hour }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2027, 5, 10).unwrap()
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 5, 10, hour, minute, 0).unwrap()
}

fn appointment_json(
    clinic_id: Uuid,
    doctor_id: Option<Uuid>,
    start: DateTime<Utc>,
    status: &str,
) -> serde_json::Value {
    json!({
        "id": Uuid::new_v4(),
        "external_id": null,
        "clinic_id": clinic_id,
        "doctor_id": doctor_id,
        "patient_id": null,
        "patient_name": "Test Patient",
        "patient_phone": null,
        "national_id": null,
        "scheduled_start": start.to_rfc3339(),
        "duration_minutes": 30,
        "kind": "consultation",
        "status": status,
        "origin": "website",
        "reminder_24h_sent": false,
        "reminder_30m_sent": false,
        "notes": null,
        "created_at": start.to_rfc3339(),
        "updated_at": start.to_rfc3339(),
    })
}

/// Projections take the settings as an argument; the settings table
/// belongs to the caller, not to the projector.
async fn mount_settings_guard(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/scheduling_settings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .expect(0)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn simple_mode_without_doctor_shows_nothing() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let slots = service(&mock_server.uri())
        .occupied_slots(
            Uuid::new_v4(),
            None,
            day(),
            &settings(SchedulingMode::Simple, 10),
        )
        .await
        .unwrap();

    assert!(slots.is_empty());
}

#[tokio::test]
async fn simple_mode_shows_only_confirmed_slots_of_the_doctor() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();
    let other_doctor = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_json(clinic_id, Some(doctor_id), at(9, 0), "confirmed"),
            appointment_json(clinic_id, Some(doctor_id), at(10, 0), "pending_approval"),
            appointment_json(clinic_id, Some(other_doctor), at(11, 0), "confirmed"),
        ]))
        .mount(&mock_server)
        .await;

    let slots = service(&mock_server.uri())
        .occupied_slots(
            clinic_id,
            Some(doctor_id),
            day(),
            &settings(SchedulingMode::Simple, 10),
        )
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].start_time, at(9, 0));
    assert_eq!(slots[0].end_time, at(9, 30));
    assert_eq!(slots[0].doctor_id, Some(doctor_id));
}

#[tokio::test]
async fn advanced_mode_shows_all_active_slots() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_json(clinic_id, Some(doctor_id), at(9, 0), "confirmed"),
            appointment_json(clinic_id, None, at(10, 0), "pending_approval"),
            appointment_json(clinic_id, None, at(11, 0), "cancelled"),
        ]))
        .mount(&mock_server)
        .await;

    let slots = service(&mock_server.uri())
        .occupied_slots(clinic_id, None, day(), &settings(SchedulingMode::Advanced, 10))
        .await
        .unwrap();

    // The cancelled booking is not occupying anything.
    assert_eq!(slots.len(), 2);
}

#[tokio::test]
async fn advanced_mode_narrows_to_one_doctor_when_asked() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    let clinic_id = Uuid::new_v4();
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_json(clinic_id, Some(doctor_id), at(9, 0), "confirmed"),
            appointment_json(clinic_id, Some(Uuid::new_v4()), at(10, 0), "confirmed"),
            appointment_json(clinic_id, None, at(11, 0), "confirmed"),
        ]))
        .mount(&mock_server)
        .await;

    let slots = service(&mock_server.uri())
        .occupied_slots(
            clinic_id,
            Some(doctor_id),
            day(),
            &settings(SchedulingMode::Advanced, 10),
        )
        .await
        .unwrap();

    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].doctor_id, Some(doctor_id));
}

#[tokio::test]
async fn hourly_counts_bucket_unassigned_bookings() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_json(clinic_id, None, at(9, 0), "confirmed"),
            appointment_json(clinic_id, None, at(9, 30), "pending_approval"),
            appointment_json(clinic_id, None, at(10, 0), "confirmed"),
            // Assigned to a doctor: not counted against hourly capacity.
            appointment_json(clinic_id, Some(Uuid::new_v4()), at(9, 15), "confirmed"),
        ]))
        .mount(&mock_server)
        .await;

    let load = service(&mock_server.uri())
        .hourly_unassigned_counts(clinic_id, day(), &settings(SchedulingMode::Advanced, 3))
        .await
        .unwrap();

    assert_eq!(load.max_per_hour, 3);
    assert_eq!(load.counts.get(&9), Some(&2));
    assert_eq!(load.counts.get(&10), Some(&1));
    assert_eq!(load.counts.get(&11), None);
}

#[tokio::test]
async fn hourly_counts_are_empty_in_simple_mode() {
    let mock_server = MockServer::start().await;
    mount_settings_guard(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let load = service(&mock_server.uri())
        .hourly_unassigned_counts(Uuid::new_v4(), day(), &settings(SchedulingMode::Simple, 10))
        .await
        .unwrap();

    assert!(load.counts.is_empty());
}
