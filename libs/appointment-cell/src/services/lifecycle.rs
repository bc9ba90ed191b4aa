// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentStatus, BookingError, Principal, TreatmentPayload,
};
use crate::services::ledger::AppointmentLedgerService;
use crate::services::treatment::TreatmentService;

/// Moves appointments through their one-directional state machine and
/// records treatment outcomes. Authorization is decided here, from the
/// explicit acting principal, never from ambient request state.
pub struct AppointmentLifecycleService {
    ledger: AppointmentLedgerService,
    treatments: TreatmentService,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            ledger: AppointmentLedgerService::new(config),
            treatments: TreatmentService::new(config),
        }
    }

    /// All valid next statuses for a given current status. Cancelled and
    /// Completed are terminal.
    pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Booked => {
                vec![AppointmentStatus::Cancelled, AppointmentStatus::Completed]
            }
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }

    /// Repeating the transition an appointment already took is a no-op;
    /// any other move out of a closed status is rejected.
    fn validate_transition(
        current: AppointmentStatus,
        target: AppointmentStatus,
    ) -> Result<Transition, BookingError> {
        if current == target {
            return Ok(Transition::NoOp);
        }
        if Self::valid_transitions(current).contains(&target) {
            return Ok(Transition::Advance);
        }

        warn!("Rejected status transition {} -> {}", current, target);
        Err(BookingError::AlreadyClosed(current))
    }

    /// Cancel, on behalf of the owning patient or the owning doctor.
    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        principal: Principal,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.ledger.get(appointment_id, auth_token).await?;

        authorize_cancel(&appointment, principal)?;

        match Self::validate_transition(appointment.status, AppointmentStatus::Cancelled)? {
            Transition::NoOp => {
                debug!("Appointment {} already cancelled", appointment_id);
                Ok(appointment)
            }
            Transition::Advance => {
                let cancelled = self
                    .ledger
                    .set_status(appointment_id, AppointmentStatus::Cancelled, auth_token)
                    .await?;
                info!("Appointment {} cancelled by {:?}", appointment_id, principal);
                Ok(cancelled)
            }
        }
    }

    /// Complete, on behalf of the owning doctor, optionally recording the
    /// treatment outcome in the same operation. Recording a treatment on a
    /// Booked appointment is what closes it: outcome data and completion
    /// are one step.
    pub async fn complete(
        &self,
        appointment_id: Uuid,
        principal: Principal,
        treatment: Option<TreatmentPayload>,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.ledger.get(appointment_id, auth_token).await?;

        authorize_complete(&appointment, principal)?;

        let transition =
            Self::validate_transition(appointment.status, AppointmentStatus::Completed)?;

        if let Some(payload) = treatment {
            self.treatments
                .record(appointment_id, payload, auth_token)
                .await?;
        }

        match transition {
            Transition::NoOp => {
                debug!("Appointment {} already completed", appointment_id);
                Ok(appointment)
            }
            Transition::Advance => {
                let completed = self
                    .ledger
                    .set_status(appointment_id, AppointmentStatus::Completed, auth_token)
                    .await?;
                info!("Appointment {} completed by doctor {}", appointment_id, principal.id());
                Ok(completed)
            }
        }
    }
}

enum Transition {
    Advance,
    NoOp,
}

/// Patients may cancel their own appointments; doctors theirs. Everyone
/// else is rejected without touching the row.
fn authorize_cancel(appointment: &Appointment, principal: Principal) -> Result<(), BookingError> {
    match principal {
        Principal::Patient { id } if id == appointment.patient_id => Ok(()),
        Principal::Doctor { id } if id == appointment.doctor_id => Ok(()),
        Principal::Patient { .. } | Principal::Doctor { .. } => Err(BookingError::Forbidden),
    }
}

/// Only the owning doctor completes an appointment; a patient principal is
/// always rejected.
fn authorize_complete(appointment: &Appointment, principal: Principal) -> Result<(), BookingError> {
    match principal {
        Principal::Doctor { id } if id == appointment.doctor_id => Ok(()),
        Principal::Doctor { .. } | Principal::Patient { .. } => Err(BookingError::Forbidden),
    }
}
