use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::services::AvailabilityResolverService;
use doctor_cell::models::Shift;
use shared_utils::test_utils::{MockPostgrestRows, TestConfig};

const TOKEN: &str = "test-token";

fn resolver(server: &MockServer) -> AvailabilityResolverService {
    AvailabilityResolverService::new(&TestConfig::with_url(&server.uri()).to_app_config())
}

fn horizon() -> Vec<NaiveDate> {
    (24..31)
        .map(|d| NaiveDate::from_ymd_opt(2025, 9, d).unwrap())
        .collect()
}

async fn mount_calendar(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_ledger(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn morning_only_doctor_with_no_bookings() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let dates = horizon();

    mount_calendar(
        &mock_server,
        json!([MockPostgrestRows::shift_availability_row(
            &doctor_id.to_string(),
            "2025-09-24",
            true,
            false
        )]),
    )
    .await;
    mount_ledger(&mock_server, json!([])).await;

    let grid = resolver(&mock_server)
        .resolve(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    let morning = grid.slot(dates[0], Shift::Morning).unwrap();
    assert!(morning.is_working);
    assert!(!morning.is_booked);
    assert!(morning.is_available);

    let evening = grid.slot(dates[0], Shift::Evening).unwrap();
    assert!(!evening.is_working);
    assert!(!evening.is_available);
}

#[tokio::test]
async fn booked_slot_is_working_but_not_available() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let dates = horizon();

    mount_calendar(
        &mock_server,
        json!([MockPostgrestRows::shift_availability_row(
            &doctor_id.to_string(),
            "2025-09-24",
            true,
            true
        )]),
    )
    .await;
    mount_ledger(
        &mock_server,
        json!([MockPostgrestRows::appointment_row(
            &patient_id.to_string(),
            &doctor_id.to_string(),
            "2025-09-24",
            "08:00:00",
            "booked"
        )]),
    )
    .await;

    let grid = resolver(&mock_server)
        .resolve(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    let morning = grid.slot(dates[0], Shift::Morning).unwrap();
    assert!(morning.is_working);
    assert!(morning.is_booked);
    assert!(!morning.is_available);

    let evening = grid.slot(dates[0], Shift::Evening).unwrap();
    assert!(evening.is_working);
    assert!(!evening.is_booked);
    assert!(evening.is_available);
}

#[tokio::test]
async fn availability_is_always_the_conjunction() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let dates = horizon();

    mount_calendar(
        &mock_server,
        json!([
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-24",
                true,
                false
            ),
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-26",
                true,
                true
            ),
        ]),
    )
    .await;
    mount_ledger(
        &mock_server,
        json!([MockPostgrestRows::appointment_row(
            &patient_id.to_string(),
            &doctor_id.to_string(),
            "2025-09-26",
            "16:00:00",
            "booked"
        )]),
    )
    .await;

    let grid = resolver(&mock_server)
        .resolve(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    assert_eq!(grid.days.len(), 7);
    for day in &grid.days {
        assert_eq!(day.slots.len(), 2);
        for slot in &day.slots {
            assert_eq!(slot.is_available, slot.is_working && !slot.is_booked);
        }
    }
}

#[tokio::test]
async fn off_grid_legacy_booking_blocks_nothing() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let patient_id = Uuid::new_v4();
    let dates = horizon();

    mount_calendar(
        &mock_server,
        json!([MockPostgrestRows::shift_availability_row(
            &doctor_id.to_string(),
            "2025-09-24",
            true,
            true
        )]),
    )
    .await;
    // An old seed row at 08:12 sits on no shift.
    mount_ledger(
        &mock_server,
        json!([MockPostgrestRows::appointment_row(
            &patient_id.to_string(),
            &doctor_id.to_string(),
            "2025-09-24",
            "08:12:00",
            "booked"
        )]),
    )
    .await;

    let grid = resolver(&mock_server)
        .resolve(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    assert!(grid.slot(dates[0], Shift::Morning).unwrap().is_available);
    assert!(grid.slot(dates[0], Shift::Evening).unwrap().is_available);
}

#[tokio::test]
async fn resolver_batches_both_reads() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let dates = horizon();

    // expect(1) on each endpoint: the whole horizon resolves with exactly
    // one calendar read and one ledger read.
    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .and(query_param(
            "date",
            "in.(2025-09-24,2025-09-25,2025-09-26,2025-09-27,2025-09-28,2025-09-29,2025-09-30)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param(
            "date",
            "in.(2025-09-24,2025-09-25,2025-09-26,2025-09-27,2025-09-28,2025-09-29,2025-09-30)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let grid = resolver(&mock_server)
        .resolve(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    // No availability rows at all: everything closed, nothing available.
    for day in &grid.days {
        for slot in &day.slots {
            assert!(!slot.is_working);
            assert!(!slot.is_available);
        }
    }
}
