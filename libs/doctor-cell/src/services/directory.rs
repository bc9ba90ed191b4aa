// libs/doctor-cell/src/services/directory.rs
use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DoctorError, DoctorProfile};

/// Read-only view over the doctor records the identity store maintains.
/// Account creation, edits and blacklist toggles happen elsewhere; this
/// cell only needs profile and blacklist status.
pub struct DoctorDirectoryService {
    supabase: SupabaseClient,
}

impl DoctorDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<DoctorProfile, DoctorError> {
        debug!("Fetching doctor profile: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let row = result.into_iter().next().ok_or(DoctorError::NotFound)?;

        let doctor: DoctorProfile = serde_json::from_value(row)
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    /// Non-blacklisted doctors, optionally narrowed to one department.
    /// Blacklist filtering happens here so browse flows never surface an
    /// unbookable doctor.
    pub async fn list_doctors(
        &self,
        department: Option<&str>,
        auth_token: &str,
    ) -> Result<Vec<DoctorProfile>, DoctorError> {
        let mut path =
            "/rest/v1/doctors?is_blacklisted=eq.false&order=full_name.asc".to_string();
        if let Some(department) = department {
            path.push_str(&format!("&department=eq.{}", urlencoding::encode(department)));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let doctors: Vec<DoctorProfile> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<DoctorProfile>, _>>()
            .map_err(|e| DoctorError::Database(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }
}
