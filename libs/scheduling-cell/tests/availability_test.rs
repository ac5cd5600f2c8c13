// libs/scheduling-cell/tests/availability_test.rs
//
// Doctor overlap checking against a mocked store.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::services::availability::AvailabilityService;
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

fn service(uri: &str) -> AvailabilityService {
    AvailabilityService::new(Arc::new(StoreClient::new(&test_config(uri))))
}

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 5, 10, hour, minute, 0).unwrap()
}

fn appointment_json(
    id: Uuid,
    doctor_id: Uuid,
    start: DateTime<Utc>,
    duration_minutes: i32,
    status: &str,
) -> serde_json::Value {
    json!({
        "id": id,
        "external_id": null,
        "clinic_id": Uuid::new_v4(),
        "doctor_id": doctor_id,
        "patient_id": null,
        "patient_name": "Test Patient",
        "patient_phone": null,
        "national_id": null,
        "scheduled_start": start.to_rfc3339(),
        "duration_minutes": duration_minutes,
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

#[tokio::test]
async fn overlapping_candidate_is_rejected() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let existing_id = Uuid::new_v4();

    // Existing appointment 10:00..10:10.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            existing_id,
            doctor_id,
            at(10, 0),
            10,
            "confirmed",
        )]))
        .mount(&mock_server)
        .await;

    let check = service(&mock_server.uri())
        .check_availability(doctor_id, at(10, 5), 10, None)
        .await
        .unwrap();

    assert!(!check.available);
    let conflict = check.conflict.unwrap();
    assert_eq!(conflict.id, existing_id);
    assert_eq!(conflict.scheduled_start, at(10, 0));
    assert_eq!(conflict.scheduled_end, at(10, 10));
}

#[tokio::test]
async fn back_to_back_candidate_is_accepted() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            Uuid::new_v4(),
            doctor_id,
            at(10, 0),
            10,
            "confirmed",
        )]))
        .mount(&mock_server)
        .await;

    // Starts exactly where the existing one ends.
    let check = service(&mock_server.uri())
        .check_availability(doctor_id, at(10, 10), 10, None)
        .await
        .unwrap();

    assert!(check.available);
    assert!(check.conflict.is_none());
}

#[tokio::test]
async fn cancelled_appointments_do_not_block() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            Uuid::new_v4(),
            doctor_id,
            at(10, 0),
            60,
            "cancelled",
        )]))
        .mount(&mock_server)
        .await;

    let check = service(&mock_server.uri())
        .check_availability(doctor_id, at(10, 15), 30, None)
        .await
        .unwrap();

    assert!(check.available);
}

#[tokio::test]
async fn excluded_appointment_does_not_conflict_with_itself() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let own_id = Uuid::new_v4();

    // The store query carries id=neq, but a stale response must still
    // be ignored in memory.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            own_id,
            doctor_id,
            at(10, 0),
            30,
            "confirmed",
        )]))
        .mount(&mock_server)
        .await;

    let check = service(&mock_server.uri())
        .check_availability(doctor_id, at(10, 0), 30, Some(own_id))
        .await
        .unwrap();

    assert!(check.available);
}

#[tokio::test]
async fn pending_appointments_block_the_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            Uuid::new_v4(),
            doctor_id,
            at(14, 0),
            30,
            "pending_approval",
        )]))
        .mount(&mock_server)
        .await;

    let check = service(&mock_server.uri())
        .check_availability(doctor_id, at(14, 15), 30, None)
        .await
        .unwrap();

    assert!(!check.available);
}
