// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, SetShiftAvailabilityRequest};
use crate::services::{DoctorDirectoryService, ShiftCalendarService};

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub department: Option<String>,
}

fn map_doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

/// Only the owning doctor may edit their own shift calendar.
fn require_self(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    let is_doctor = user.role.as_deref() == Some("doctor");
    let is_self = user.id == doctor_id.to_string();

    if !is_doctor || !is_self {
        return Err(AppError::Forbidden(
            "Only the doctor may manage this shift calendar".to_string(),
        ));
    }
    Ok(())
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);

    let doctors = directory
        .list_doctors(query.department.as_deref(), auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);

    let doctor = directory
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(map_doctor_error)?;

    if !doctor.is_bookable() {
        return Err(AppError::NotFound("Doctor is no longer available".to_string()));
    }

    Ok(Json(json!(doctor)))
}

#[axum::debug_handler]
pub async fn set_shift_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetShiftAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, doctor_id)?;

    let calendar = ShiftCalendarService::new(&state);

    let availability = calendar
        .set_availability(doctor_id, request, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "availability": availability
    })))
}

#[axum::debug_handler]
pub async fn get_shift_calendar(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_self(&user, doctor_id)?;

    let calendar = ShiftCalendarService::new(&state);
    let today = Utc::now().date_naive();

    let schedule = calendar
        .week_schedule(doctor_id, today, auth.token())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "schedule": schedule
    })))
}
