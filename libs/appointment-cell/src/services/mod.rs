pub mod availability;
pub mod booking;
pub mod ledger;
pub mod lifecycle;
pub mod treatment;

pub use availability::AvailabilityResolverService;
pub use booking::SlotBookingService;
pub use ledger::AppointmentLedgerService;
pub use lifecycle::AppointmentLifecycleService;
pub use treatment::TreatmentService;
