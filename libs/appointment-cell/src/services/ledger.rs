// libs/appointment-cell/src/services/ledger.rs
use chrono::{NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::Shift;
use shared_config::AppConfig;
use shared_database::supabase::{DbError, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus, BookingError};

/// The appointment rows themselves: constrained inserts, conflict reads and
/// the filtered listings built on top of them. The storage layer carries a
/// partial unique index on (doctor_id, date, slot_time) scoped to
/// status = 'booked'; that index, not the pre-check read, is what makes the
/// at-most-one-booked invariant hold under concurrency.
pub struct AppointmentLedgerService {
    supabase: SupabaseClient,
}

impl AppointmentLedgerService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Insert a Booked row for the slot. A 409 from the unique index means
    /// another request won the slot first.
    pub async fn insert_booked(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        date: NaiveDate,
        shift: Shift,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let now = Utc::now();

        let appointment_data = json!({
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "date": date,
            "slot_time": shift.start_time().format("%H:%M:%S").to_string(),
            "status": AppointmentStatus::Booked.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339()
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(headers),
            )
            .await
            .map_err(|e| match e {
                DbError::Conflict(_) => BookingError::SlotTaken,
                other => BookingError::Database(other.to_string()),
            })?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Database("Failed to create appointment".to_string()))?;

        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse appointment: {}", e)))?;

        info!(
            "Appointment {} created for doctor {} on {} {}",
            appointment.id, doctor_id, date, shift
        );

        Ok(appointment)
    }

    /// The conflict pre-check read: the Booked row occupying the slot, if
    /// any. Exists to reject politely before attempting the constrained
    /// insert.
    pub async fn find_booked(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        shift: Shift,
        auth_token: &str,
    ) -> Result<Option<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&slot_time=eq.{}&status=eq.{}",
            doctor_id,
            date,
            shift.start_time().format("%H:%M:%S"),
            AppointmentStatus::Booked
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let Some(row) = result.into_iter().next() else {
            return Ok(None);
        };

        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse appointment: {}", e)))?;

        Ok(Some(appointment))
    }

    /// All Booked rows for the doctor across the given dates in one batched
    /// read. The availability resolver depends on this staying a single
    /// query regardless of horizon length.
    pub async fn booked_in_range(
        &self,
        doctor_id: Uuid,
        dates: &[NaiveDate],
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        if dates.is_empty() {
            return Ok(vec![]);
        }

        let date_list = dates
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=in.({})&status=eq.{}&order=date.asc,slot_time.asc",
            doctor_id,
            date_list,
            AppointmentStatus::Booked
        );

        self.fetch_appointments(&path, auth_token).await
    }

    pub async fn get(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let row = result.into_iter().next().ok_or(BookingError::NotFound)?;

        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    pub async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let update_data = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339()
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(update_data),
                Some(headers),
            )
            .await?;

        let row = result.into_iter().next().ok_or(BookingError::NotFound)?;

        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} moved to {}", appointment_id, status);
        Ok(appointment)
    }

    /// Upcoming view: Booked rows from today on, soonest first.
    pub async fn list_upcoming_for_patient(
        &self,
        patient_id: Uuid,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=eq.{}&date=gte.{}&order=date.asc,slot_time.asc",
            patient_id,
            AppointmentStatus::Booked,
            today
        );

        self.fetch_appointments(&path, auth_token).await
    }

    /// History view: closed rows, most recent first.
    pub async fn list_history_for_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&status=in.({},{})&order=date.desc,slot_time.desc",
            patient_id,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled
        );

        self.fetch_appointments(&path, auth_token).await
    }

    /// The doctor's worklist: Booked rows from today on, soonest first.
    pub async fn list_upcoming_for_doctor(
        &self,
        doctor_id: Uuid,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=eq.{}&date=gte.{}&order=date.asc,slot_time.asc",
            doctor_id,
            AppointmentStatus::Booked,
            today
        );

        self.fetch_appointments(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::Database(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }
}
