// libs/doctor-cell/src/services/shift_calendar.rs
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DaySchedule, SetShiftAvailabilityRequest, Shift, ShiftAvailability, DoctorError};

/// Length of the rolling editing/booking window exposed to callers, in days.
pub const SCHEDULE_HORIZON_DAYS: i64 = 7;

pub struct ShiftCalendarService {
    supabase: SupabaseClient,
}

impl ShiftCalendarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Upsert the availability row for (doctor, date). Writes are idempotent:
    /// the (doctor_id, date) unique key resolves repeats into an update.
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        request: SetShiftAvailabilityRequest,
        auth_token: &str,
    ) -> Result<ShiftAvailability, DoctorError> {
        debug!(
            "Setting availability for doctor {} on {}: morning={} evening={}",
            doctor_id, request.date, request.morning_open, request.evening_open
        );

        let availability_data = json!({
            "doctor_id": doctor_id,
            "date": request.date,
            "morning_open": request.morning_open,
            "evening_open": request.evening_open,
            "updated_at": Utc::now().to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static(
                "resolution=merge-duplicates,return=representation",
            ),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/shift_availability?on_conflict=doctor_id,date",
                Some(auth_token),
                Some(availability_data),
                Some(headers),
            )
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| DoctorError::Database("Failed to upsert availability".to_string()))?;

        let availability: ShiftAvailability = serde_json::from_value(row)
            .map_err(|e| DoctorError::Database(format!("Failed to parse availability: {}", e)))?;

        Ok(availability)
    }

    /// Stored flag for the matching shift; false when no row exists. A
    /// missing row is the normal "not working" state, not a failure.
    pub async fn is_working(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        shift: Shift,
        auth_token: &str,
    ) -> Result<bool, DoctorError> {
        let path = format!(
            "/rest/v1/shift_availability?doctor_id=eq.{}&date=eq.{}",
            doctor_id, date
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let Some(row) = result.into_iter().next() else {
            return Ok(false);
        };

        let availability: ShiftAvailability = serde_json::from_value(row)
            .map_err(|e| DoctorError::Database(format!("Failed to parse availability: {}", e)))?;

        Ok(availability.is_open(shift))
    }

    /// All availability rows for the given dates in one batched read. The
    /// availability resolver depends on this staying a single query
    /// regardless of horizon length.
    pub async fn records_in_range(
        &self,
        doctor_id: Uuid,
        dates: &[NaiveDate],
        auth_token: &str,
    ) -> Result<Vec<ShiftAvailability>, DoctorError> {
        if dates.is_empty() {
            return Ok(vec![]);
        }

        let date_list = dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let path = format!(
            "/rest/v1/shift_availability?doctor_id=eq.{}&date=in.({})&order=date.asc",
            doctor_id, date_list
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let records: Vec<ShiftAvailability> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<ShiftAvailability>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse availability: {}", e)))?;

        Ok(records)
    }

    /// The rolling schedule a doctor edits against: one entry per day from
    /// `start_date`, absent rows rendered closed.
    pub async fn week_schedule(
        &self,
        doctor_id: Uuid,
        start_date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<DaySchedule>, DoctorError> {
        let dates = rolling_horizon(start_date);
        let records = self.records_in_range(doctor_id, &dates, auth_token).await?;

        let schedule = dates
            .into_iter()
            .map(|date| {
                let record = records.iter().find(|r| r.date == date);
                DaySchedule {
                    date,
                    morning_open: record.map(|r| r.morning_open).unwrap_or(false),
                    evening_open: record.map(|r| r.evening_open).unwrap_or(false),
                }
            })
            .collect();

        Ok(schedule)
    }
}

/// The dates of the rolling window starting at `start_date`.
pub fn rolling_horizon(start_date: NaiveDate) -> Vec<NaiveDate> {
    (0..SCHEDULE_HORIZON_DAYS)
        .map(|offset| start_date + Duration::days(offset))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_is_seven_consecutive_days() {
        let start = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();
        let dates = rolling_horizon(start);

        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], start);
        assert_eq!(dates[6], NaiveDate::from_ymd_opt(2025, 9, 30).unwrap());
    }

    #[test]
    fn shift_start_times_are_fixed() {
        assert_eq!(
            Shift::Morning.start_time(),
            chrono::NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert_eq!(
            Shift::Evening.start_time(),
            chrono::NaiveTime::from_hms_opt(16, 0, 0).unwrap()
        );
    }

    #[test]
    fn off_grid_time_maps_to_no_shift() {
        let off_grid = chrono::NaiveTime::from_hms_opt(8, 12, 0).unwrap();
        assert_eq!(Shift::from_start_time(off_grid), None);
        assert_eq!(
            Shift::from_start_time(Shift::Evening.start_time()),
            Some(Shift::Evening)
        );
    }
}
