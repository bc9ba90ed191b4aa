// libs/appointment-cell/src/services/availability.rs
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::{Shift, ShiftAvailability};
use doctor_cell::services::ShiftCalendarService;
use shared_config::AppConfig;

use crate::models::{AvailabilityGrid, BookingError, DaySlots, SlotStatus};
use crate::services::ledger::AppointmentLedgerService;

/// Derives the bookable-slot grid for a doctor over an explicit horizon of
/// dates: shift calendar and booking ledger are each read ONCE for the whole
/// horizon, then the grid is a pure in-memory cross product. Doctor
/// eligibility (blacklist) is the caller's concern; this service never
/// looks at it.
pub struct AvailabilityResolverService {
    calendar: ShiftCalendarService,
    ledger: AppointmentLedgerService,
}

impl AvailabilityResolverService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            calendar: ShiftCalendarService::new(config),
            ledger: AppointmentLedgerService::new(config),
        }
    }

    pub async fn resolve(
        &self,
        doctor_id: Uuid,
        dates: &[NaiveDate],
        auth_token: &str,
    ) -> Result<AvailabilityGrid, BookingError> {
        debug!(
            "Resolving availability for doctor {} over {} dates",
            doctor_id,
            dates.len()
        );

        // Two batched reads; must not become per-day queries as the
        // horizon grows.
        let records = self
            .calendar
            .records_in_range(doctor_id, dates, auth_token)
            .await
            .map_err(|e| BookingError::Database(e.to_string()))?;
        let booked = self
            .ledger
            .booked_in_range(doctor_id, dates, auth_token)
            .await?;

        let record_by_date: HashMap<NaiveDate, &ShiftAvailability> =
            records.iter().map(|r| (r.date, r)).collect();

        // Off-grid slot_time values (legacy rows) map to no shift and are
        // dropped here.
        let booked_slots: HashSet<(NaiveDate, Shift)> = booked
            .iter()
            .filter_map(|appt| appt.shift().map(|shift| (appt.date, shift)))
            .collect();

        let days = dates
            .iter()
            .map(|&date| {
                let slots = Shift::ALL
                    .into_iter()
                    .map(|shift| {
                        let is_working = record_by_date
                            .get(&date)
                            .map(|r| r.is_open(shift))
                            .unwrap_or(false);
                        let is_booked = booked_slots.contains(&(date, shift));

                        SlotStatus {
                            shift,
                            start_time: shift.start_time(),
                            is_working,
                            is_booked,
                            is_available: is_working && !is_booked,
                        }
                    })
                    .collect();

                DaySlots { date, slots }
            })
            .collect();

        Ok(AvailabilityGrid { doctor_id, days })
    }
}
