// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use chrono::Utc;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::services::shift_calendar::rolling_horizon;
use doctor_cell::services::DoctorDirectoryService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, BookSlotRequest, BookingError, CompleteAppointmentRequest, Principal,
};
use crate::services::{
    AppointmentLedgerService, AppointmentLifecycleService, AvailabilityResolverService,
    SlotBookingService, TreatmentService,
};

/// Single place where core errors become HTTP responses.
fn map_booking_error(err: BookingError) -> AppError {
    match err {
        BookingError::MalformedSlot => {
            AppError::BadRequest("Invalid slot identifier".to_string())
        }
        BookingError::DoctorUnavailable => {
            AppError::NotFound("Doctor not available for the requested slot".to_string())
        }
        BookingError::SlotTaken => {
            AppError::Conflict("This slot has just been booked".to_string())
        }
        BookingError::Forbidden => {
            AppError::Forbidden("Not authorized to modify this appointment".to_string())
        }
        BookingError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        BookingError::AlreadyClosed(status) => {
            AppError::Conflict(format!("Appointment is already {}", status))
        }
        BookingError::Database(msg) => AppError::Database(msg),
    }
}

fn principal_from(user: &User) -> Result<Principal, AppError> {
    Principal::from_user(user)
        .ok_or_else(|| AppError::Auth("Principal has no recognized role".to_string()))
}

/// Appointment reads are restricted to the two parties on the row.
fn authorize_view(appointment: &Appointment, principal: Principal) -> Result<(), AppError> {
    let allowed = match principal {
        Principal::Patient { id } => id == appointment.patient_id,
        Principal::Doctor { id } => id == appointment.doctor_id,
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }
    Ok(())
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;

    // Patients book for themselves only.
    match principal {
        Principal::Patient { id } if id == request.patient_id => {}
        _ => {
            return Err(AppError::Forbidden(
                "Not authorized to book appointment for this patient".to_string(),
            ))
        }
    }

    let booking_service = SlotBookingService::new(&state);

    let appointment = booking_service
        .book_slot(request.patient_id, request.doctor_id, &request.slot, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

/// The bookable-slot grid for a doctor over the rolling horizon. The
/// eligibility gate lives here: a blacklisted doctor never reaches the
/// resolver.
#[axum::debug_handler]
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let doctor = directory
        .get_doctor(doctor_id, auth.token())
        .await
        .map_err(|_| AppError::NotFound("Doctor not found".to_string()))?;

    if !doctor.is_bookable() {
        return Err(AppError::NotFound(
            "Doctor is no longer available for booking".to_string(),
        ));
    }

    let resolver = AvailabilityResolverService::new(&state);
    let horizon = rolling_horizon(Utc::now().date_naive());

    let grid = resolver
        .resolve(doctor_id, &horizon, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!(grid)))
}

// ==============================================================================
// LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let lifecycle = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle
        .cancel(appointment_id, principal, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment has been cancelled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CompleteAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let lifecycle = AppointmentLifecycleService::new(&state);

    let appointment = lifecycle
        .complete(appointment_id, principal, request.treatment, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

// ==============================================================================
// READ HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let ledger = AppointmentLedgerService::new(&state);

    let appointment = ledger
        .get(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_view(&appointment, principal)?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_treatment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let ledger = AppointmentLedgerService::new(&state);

    let appointment = ledger
        .get(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?;

    authorize_view(&appointment, principal)?;

    let treatments = TreatmentService::new(&state);
    let treatment = treatments
        .get_for_appointment(appointment_id, auth.token())
        .await
        .map_err(map_booking_error)?
        .ok_or_else(|| AppError::NotFound("No treatment recorded".to_string()))?;

    Ok(Json(json!(treatment)))
}

#[axum::debug_handler]
pub async fn get_upcoming_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let Principal::Patient { id } = principal else {
        return Err(AppError::Forbidden("Patient view only".to_string()));
    };

    let ledger = AppointmentLedgerService::new(&state);
    let appointments = ledger
        .list_upcoming_for_patient(id, Utc::now().date_naive(), auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let Principal::Patient { id } = principal else {
        return Err(AppError::Forbidden("Patient view only".to_string()));
    };

    let ledger = AppointmentLedgerService::new(&state);
    let appointments = ledger
        .list_history_for_patient(id, auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_schedule(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let principal = principal_from(&user)?;
    let Principal::Doctor { id } = principal else {
        return Err(AppError::Forbidden("Doctor view only".to_string()));
    };

    let ledger = AppointmentLedgerService::new(&state);
    let appointments = ledger
        .list_upcoming_for_doctor(id, Utc::now().date_naive(), auth.token())
        .await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
