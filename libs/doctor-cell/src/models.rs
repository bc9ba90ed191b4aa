// libs/doctor-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_database::DbError;

// ==============================================================================
// SHIFT MODEL
// ==============================================================================

/// The two bookable shifts of a clinic day. Each shift is a single bookable
/// start instant per day, not a time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
}

impl Shift {
    pub const ALL: [Shift; 2] = [Shift::Morning, Shift::Evening];

    pub fn start_time(&self) -> NaiveTime {
        match self {
            Shift::Morning => NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            Shift::Evening => NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
        }
    }

    /// Exact match only: a time that is not a shift start belongs to no shift.
    pub fn from_start_time(time: NaiveTime) -> Option<Shift> {
        Shift::ALL.into_iter().find(|shift| shift.start_time() == time)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shift::Morning => write!(f, "morning"),
            Shift::Evening => write!(f, "evening"),
        }
    }
}

// ==============================================================================
// SHIFT AVAILABILITY MODELS
// ==============================================================================

/// Per-doctor, per-date declaration of which shifts are worked. At most one
/// row per (doctor_id, date); a missing row means the doctor is not working
/// that day at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftAvailability {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub morning_open: bool,
    pub evening_open: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShiftAvailability {
    pub fn is_open(&self, shift: Shift) -> bool {
        match shift {
            Shift::Morning => self.morning_open,
            Shift::Evening => self.evening_open,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetShiftAvailabilityRequest {
    pub date: NaiveDate,
    pub morning_open: bool,
    pub evening_open: bool,
}

/// One day of the editable rolling schedule. Dates with no stored row are
/// rendered with both shifts closed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub morning_open: bool,
    pub evening_open: bool,
}

// ==============================================================================
// DOCTOR DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorProfile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub specialization: Option<String>,
    pub department: Option<String>,
    pub experience_years: Option<i32>,
    pub is_blacklisted: bool,
}

impl DoctorProfile {
    /// Blacklisted doctors are hidden from browse flows and rejected at
    /// booking time.
    pub fn is_bookable(&self) -> bool {
        !self.is_blacklisted
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<DbError> for DoctorError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => DoctorError::NotFound,
            other => DoctorError::Database(other.to_string()),
        }
    }
}
