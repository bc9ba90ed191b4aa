// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use doctor_cell::models::Shift;
use shared_database::DbError;
use shared_models::auth::User;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The shift this appointment occupies, if its time sits on the shift
    /// grid. Historical rows may carry off-grid times; those map to `None`
    /// and never block a grid slot.
    pub fn shift(&self) -> Option<Shift> {
        Shift::from_start_time(self.slot_time)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    /// Cancelled and Completed are terminal; nothing returns to Booked.
    pub fn is_closed(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Booked => write!(f, "booked"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

// ==============================================================================
// TREATMENT MODELS
// ==============================================================================

/// Outcome record, at most one per appointment. Created the moment a doctor
/// records outcome data; the owning appointment cascades its deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub tests_ordered: Option<String>,
    pub medicines: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPayload {
    pub diagnosis: String,
    pub prescription: Option<String>,
    pub tests_ordered: Option<String>,
    pub medicines: Option<String>,
    pub notes: Option<String>,
}

// ==============================================================================
// ACTING PRINCIPAL
// ==============================================================================

/// The authenticated identity an operation acts as. Every core operation
/// takes this explicitly; there is no ambient "current user" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
    Patient { id: Uuid },
    Doctor { id: Uuid },
}

impl Principal {
    pub fn from_user(user: &User) -> Option<Principal> {
        let id = Uuid::parse_str(&user.id).ok()?;
        match user.role.as_deref() {
            Some("patient") => Some(Principal::Patient { id }),
            Some("doctor") => Some(Principal::Doctor { id }),
            _ => None,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Principal::Patient { id } | Principal::Doctor { id } => *id,
        }
    }
}

// ==============================================================================
// SLOT IDENTIFIER
// ==============================================================================

/// A submitted slot reference, wire format `YYYY-MM-DD_HH:MM:SS`. Parsing
/// only succeeds when the encoded time is exactly a shift start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId {
    pub date: NaiveDate,
    pub shift: Shift,
}

impl FromStr for SlotId {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (date_part, time_part) = s.split_once('_').ok_or(BookingError::MalformedSlot)?;

        let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|_| BookingError::MalformedSlot)?;
        let time = NaiveTime::parse_from_str(time_part, "%H:%M:%S")
            .map_err(|_| BookingError::MalformedSlot)?;
        let shift = Shift::from_start_time(time).ok_or(BookingError::MalformedSlot)?;

        Ok(SlotId { date, shift })
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}",
            self.date.format("%Y-%m-%d"),
            self.shift.start_time().format("%H:%M:%S")
        )
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    /// Slot identifier in `YYYY-MM-DD_HH:MM:SS` form.
    pub slot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompleteAppointmentRequest {
    pub treatment: Option<TreatmentPayload>,
}

// ==============================================================================
// AVAILABILITY GRID MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotStatus {
    pub shift: Shift,
    pub start_time: NaiveTime,
    pub is_working: bool,
    pub is_booked: bool,
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySlots {
    pub date: NaiveDate,
    pub slots: Vec<SlotStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityGrid {
    pub doctor_id: Uuid,
    pub days: Vec<DaySlots>,
}

impl AvailabilityGrid {
    pub fn slot(&self, date: NaiveDate, shift: Shift) -> Option<&SlotStatus> {
        self.days
            .iter()
            .find(|day| day.date == date)
            .and_then(|day| day.slots.iter().find(|slot| slot.shift == shift))
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum BookingError {
    #[error("Slot identifier is malformed or off the shift grid")]
    MalformedSlot,

    #[error("Doctor is not available for this slot")]
    DoctorUnavailable,

    #[error("Slot already has an active booking")]
    SlotTaken,

    #[error("Acting principal may not perform this operation")]
    Forbidden,

    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment is already {0}")]
    AlreadyClosed(AppointmentStatus),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DbError> for BookingError {
    fn from(err: DbError) -> Self {
        match err {
            // The only 409 source is the booked-slot unique index.
            DbError::Conflict(_) => BookingError::SlotTaken,
            DbError::NotFound(_) => BookingError::NotFound,
            other => BookingError::Database(other.to_string()),
        }
    }
}
