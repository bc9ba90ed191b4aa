// libs/appointment-cell/src/services/treatment.rs
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{BookingError, Treatment, TreatmentPayload};

/// The singleton outcome record per appointment. Upserts key on the
/// appointment_id unique constraint, so re-recording replaces the previous
/// outcome instead of accumulating rows.
pub struct TreatmentService {
    supabase: SupabaseClient,
}

impl TreatmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn record(
        &self,
        appointment_id: Uuid,
        payload: TreatmentPayload,
        auth_token: &str,
    ) -> Result<Treatment, BookingError> {
        debug!("Recording treatment for appointment {}", appointment_id);

        let treatment_data = json!({
            "appointment_id": appointment_id,
            "diagnosis": payload.diagnosis,
            "prescription": payload.prescription,
            "tests_ordered": payload.tests_ordered,
            "medicines": payload.medicines,
            "notes": payload.notes,
            "updated_at": chrono::Utc::now().to_rfc3339()
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
                "/rest/v1/treatments?on_conflict=appointment_id",
                Some(auth_token),
                Some(treatment_data),
                Some(headers),
            )
            .await?;

        let row = result
            .into_iter()
            .next()
            .ok_or_else(|| BookingError::Database("Failed to record treatment".to_string()))?;

        let treatment: Treatment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse treatment: {}", e)))?;

        info!("Treatment recorded for appointment {}", appointment_id);
        Ok(treatment)
    }

    pub async fn get_for_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Treatment>, BookingError> {
        let path = format!(
            "/rest/v1/treatments?appointment_id=eq.{}",
            appointment_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        let Some(row) = result.into_iter().next() else {
            return Ok(None);
        };

        let treatment: Treatment = serde_json::from_value(row)
            .map_err(|e| BookingError::Database(format!("Failed to parse treatment: {}", e)))?;

        Ok(Some(treatment))
    }
}
