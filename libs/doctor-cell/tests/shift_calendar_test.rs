use chrono::NaiveDate;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::{SetShiftAvailabilityRequest, Shift};
use doctor_cell::services::ShiftCalendarService;
use shared_utils::test_utils::{MockPostgrestRows, TestConfig};

const TOKEN: &str = "test-token";

fn service(server: &MockServer) -> ShiftCalendarService {
    ShiftCalendarService::new(&TestConfig::with_url(&server.uri()).to_app_config())
}

#[tokio::test]
async fn set_availability_upserts_and_returns_row() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/shift_availability"))
        .and(query_param("on_conflict", "doctor_id,date"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-24",
                true,
                false
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = SetShiftAvailabilityRequest {
        date: NaiveDate::from_ymd_opt(2025, 9, 24).unwrap(),
        morning_open: true,
        evening_open: false,
    };

    let availability = service(&mock_server)
        .set_availability(doctor_id, request, TOKEN)
        .await
        .unwrap();

    assert_eq!(availability.doctor_id, doctor_id);
    assert!(availability.morning_open);
    assert!(!availability.evening_open);
    assert!(availability.is_open(Shift::Morning));
    assert!(!availability.is_open(Shift::Evening));
}

#[tokio::test]
async fn is_working_defaults_to_false_without_record() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let date = NaiveDate::from_ymd_opt(2025, 9, 25).unwrap();
    let working = service(&mock_server)
        .is_working(doctor_id, date, Shift::Morning, TOKEN)
        .await
        .unwrap();

    assert!(!working);
}

#[tokio::test]
async fn is_working_reads_the_matching_shift_flag() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2025-09-24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-24",
                true,
                false
            )
        ])))
        .mount(&mock_server)
        .await;

    let date = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();
    let calendar = service(&mock_server);

    assert!(calendar
        .is_working(doctor_id, date, Shift::Morning, TOKEN)
        .await
        .unwrap());
    assert!(!calendar
        .is_working(doctor_id, date, Shift::Evening, TOKEN)
        .await
        .unwrap());
}

#[tokio::test]
async fn records_in_range_is_one_batched_query() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    // A single request carrying the whole date list; per-day queries would
    // not match and the call would fail.
    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .and(query_param("date", "in.(2025-09-24,2025-09-25,2025-09-26)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-25",
                true,
                true
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dates: Vec<NaiveDate> = (24..27)
        .map(|d| NaiveDate::from_ymd_opt(2025, 9, d).unwrap())
        .collect();

    let records = service(&mock_server)
        .records_in_range(doctor_id, &dates, TOKEN)
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, dates[1]);
}

#[tokio::test]
async fn week_schedule_renders_absent_days_closed() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let start = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/shift_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockPostgrestRows::shift_availability_row(
                &doctor_id.to_string(),
                "2025-09-26",
                false,
                true
            )
        ])))
        .mount(&mock_server)
        .await;

    let schedule = service(&mock_server)
        .week_schedule(doctor_id, start, TOKEN)
        .await
        .unwrap();

    assert_eq!(schedule.len(), 7);
    assert_eq!(schedule[0].date, start);

    // Only 2025-09-26 has a stored row; every other day is closed.
    for day in &schedule {
        if day.date == NaiveDate::from_ymd_opt(2025, 9, 26).unwrap() {
            assert!(!day.morning_open);
            assert!(day.evening_open);
        } else {
            assert!(!day.morning_open);
            assert!(!day.evening_open);
        }
    }
}
