// libs/appointment-cell/src/services/booking.rs
use tracing::{info, warn};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::{DoctorDirectoryService, ShiftCalendarService};
use shared_config::AppConfig;

use crate::models::{Appointment, BookingError, SlotId};
use crate::services::ledger::AppointmentLedgerService;

/// The booking transaction: validates one patient's request against the
/// shift calendar and the booking ledger, then commits through the
/// ledger's constrained insert. Validation reads only produce friendly
/// rejections; the storage uniqueness constraint is what decides races.
pub struct SlotBookingService {
    directory: DoctorDirectoryService,
    calendar: ShiftCalendarService,
    ledger: AppointmentLedgerService,
}

impl SlotBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            directory: DoctorDirectoryService::new(config),
            calendar: ShiftCalendarService::new(config),
            ledger: AppointmentLedgerService::new(config),
        }
    }

    /// Book the slot named by `slot` for the patient. Outcomes:
    /// `MalformedSlot` for an unparseable or off-grid identifier,
    /// `DoctorUnavailable` when the doctor is blacklisted, missing, or not
    /// working the shift, `SlotTaken` when the slot is (or just became)
    /// occupied. The caller recovers by re-resolving availability and
    /// picking another slot.
    pub async fn book_slot(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        slot: &str,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let slot_id: SlotId = slot.parse()?;

        info!(
            "Booking request: patient {} -> doctor {} at {}",
            patient_id, doctor_id, slot_id
        );

        // A blacklisted doctor is rejected here regardless of what the
        // availability view showed the caller.
        let doctor = self
            .directory
            .get_doctor(doctor_id, auth_token)
            .await
            .map_err(doctor_unavailable)?;
        if !doctor.is_bookable() {
            warn!("Booking rejected: doctor {} is blacklisted", doctor_id);
            return Err(BookingError::DoctorUnavailable);
        }

        let working = self
            .calendar
            .is_working(doctor_id, slot_id.date, slot_id.shift, auth_token)
            .await
            .map_err(doctor_unavailable)?;
        if !working {
            return Err(BookingError::DoctorUnavailable);
        }

        // Friendly pre-check; the unique index behind insert_booked is the
        // actual arbiter when requests race.
        if self
            .ledger
            .find_booked(doctor_id, slot_id.date, slot_id.shift, auth_token)
            .await?
            .is_some()
        {
            return Err(BookingError::SlotTaken);
        }

        self.ledger
            .insert_booked(patient_id, doctor_id, slot_id.date, slot_id.shift, auth_token)
            .await
    }
}

/// A doctor the directory cannot produce is simply not bookable; callers
/// see the same outcome as for a blacklisted or off-shift doctor.
fn doctor_unavailable(err: DoctorError) -> BookingError {
    match err {
        DoctorError::NotFound => BookingError::DoctorUnavailable,
        DoctorError::Database(msg) => BookingError::Database(msg),
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{BookingError, SlotId};
    use doctor_cell::models::Shift;

    #[test]
    fn slot_id_parses_shift_grid_times() {
        let slot: SlotId = "2025-09-24_08:00:00".parse().unwrap();
        assert_eq!(slot.shift, Shift::Morning);
        assert_eq!(slot.date, chrono::NaiveDate::from_ymd_opt(2025, 9, 24).unwrap());

        let slot: SlotId = "2025-09-24_16:00:00".parse().unwrap();
        assert_eq!(slot.shift, Shift::Evening);
    }

    #[test]
    fn slot_id_rejects_off_grid_time() {
        let result = "2025-09-24_09:30:00".parse::<SlotId>();
        assert!(matches!(result, Err(BookingError::MalformedSlot)));
    }

    #[test]
    fn slot_id_rejects_garbage() {
        for input in ["", "garbage", "2025-09-24", "2025-09-24_", "_08:00:00",
                      "24-09-2025_08:00:00", "2025-09-24_8am"] {
            let result = input.parse::<SlotId>();
            assert!(
                matches!(result, Err(BookingError::MalformedSlot)),
                "expected MalformedSlot for {:?}",
                input
            );
        }
    }

    #[test]
    fn slot_id_roundtrips_through_display() {
        let slot: SlotId = "2025-09-24_16:00:00".parse().unwrap();
        assert_eq!(slot.to_string(), "2025-09-24_16:00:00");
    }
}
