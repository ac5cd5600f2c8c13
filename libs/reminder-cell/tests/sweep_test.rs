// libs/reminder-cell/tests/sweep_test.rs
//
// At-least-once reminder dispatch: the sent flag moves only after the
// gateway accepted the message.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reminder_cell::models::ReminderError;
use reminder_cell::services::retention::RetentionService;
use reminder_cell::services::sweeper::ReminderSweepService;
use shared_config::AppConfig;

fn test_config(uri: &str) -> AppConfig {
    AppConfig {
        store_url: uri.to_string(),
        store_service_key: "test-key".to_string(),
        notify_base_url: uri.to_string(),
        notify_api_token: "test-token".to_string(),
        reminder_sweep_minutes: 5,
        retention_sweep_hours: 24,
    }
}

fn appointment_json(
    id: Uuid,
    start: DateTime<Utc>,
    phone: Option<&str>,
    reminder_24h_sent: bool,
) -> serde_json::Value {
    json!({
        "id": id,
        "external_id": null,
        "clinic_id": Uuid::new_v4(),
        "doctor_id": null,
        "patient_id": null,
        "patient_name": "Test Patient",
        "patient_phone": phone,
        "national_id": null,
        "scheduled_start": start.to_rfc3339(),
        "duration_minutes": 30,
        "kind": "consultation",
        "status": "confirmed",
        "origin": "website",
        "reminder_24h_sent": reminder_24h_sent,
        "reminder_30m_sent": false,
        "notes": null,
        "created_at": start.to_rfc3339(),
        "updated_at": start.to_rfc3339(),
    })
}

/// Empty due set for the half-hour window so tests can focus on the
/// day-before window.
async fn mount_empty_30m_window(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_30m_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn due_reminder_is_dispatched_and_flagged() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let start = Utc::now() + Duration::hours(23) + Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({
            "to": "+15550100",
            "template": "appointment_reminder",
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_partial_json(json!({"reminder_24h_sent": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            true,
        )]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn gateway_failure_leaves_the_flag_untouched() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let start = Utc::now() + Duration::hours(23) + Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The appointment stays eligible for the next sweep.
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let report = ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 0);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn already_flagged_and_out_of_window_rows_are_skipped() {
    let mock_server = MockServer::start().await;
    let in_window = Utc::now() + Duration::hours(23) + Duration::minutes(30);
    let far_future = Utc::now() + Duration::days(3);

    // A stale store response must still be filtered in memory.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            appointment_json(Uuid::new_v4(), in_window, Some("+15550100"), true),
            appointment_json(Uuid::new_v4(), far_future, Some("+15550101"), false),
        ]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let report = ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 0);
    assert_eq!(report.failed, 0);
}

#[tokio::test]
async fn missing_phone_counts_as_failure_without_dispatch() {
    let mock_server = MockServer::start().await;
    let start = Utc::now() + Duration::hours(23) + Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            Uuid::new_v4(),
            start,
            None,
            false,
        )]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let report = ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 0);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn half_hour_window_uses_its_own_flag() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let start = Utc::now() + Duration::minutes(27);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Vec::<serde_json::Value>::new()))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_30m_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(body_partial_json(json!({"reminder_30m_sent": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
}

#[tokio::test]
async fn concurrent_sweeps_contend_on_the_single_flight_guard() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let start = Utc::now() + Duration::hours(23) + Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    // A slow gateway keeps the first sweep in flight while the second
    // one tries to start.
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            true,
        )]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = ReminderSweepService::new(&test_config(&mock_server.uri()));
    let (first, second) = tokio::join!(service.sweep_once(), service.sweep_once());

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(ReminderError::SweepInProgress))));

    let report = outcomes.into_iter().find_map(Result::ok).unwrap();
    assert_eq!(report.dispatched, 1);
}

#[tokio::test]
async fn flag_flip_does_not_bump_updated_at() {
    let mock_server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();
    let start = Utc::now() + Duration::hours(23) + Duration::minutes(30);

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("reminder_24h_sent", "is.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            false,
        )]))
        .mount(&mock_server)
        .await;
    mount_empty_30m_window(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![appointment_json(
            appointment_id,
            start,
            Some("+15550100"),
            true,
        )]))
        .expect(1)
        .mount(&mock_server)
        .await;

    ReminderSweepService::new(&test_config(&mock_server.uri()))
        .sweep_once()
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let patch = requests
        .iter()
        .find(|r| r.method.to_string() == "PATCH")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(body.get("reminder_24h_sent"), Some(&json!(true)));
    assert!(body.get("updated_at").is_none());
}

#[tokio::test]
async fn retention_deletes_old_cancelled_and_abandoned_rows() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.cancelled"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![
            json!({"id": Uuid::new_v4()}),
            json!({"id": Uuid::new_v4()}),
        ]))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.pending_approval"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![json!({"id": Uuid::new_v4()})]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = RetentionService::new(&test_config(&mock_server.uri()))
        .cleanup()
        .await
        .unwrap();

    assert_eq!(report.cancelled_deleted, 2);
    assert_eq!(report.stale_deleted, 1);
}
