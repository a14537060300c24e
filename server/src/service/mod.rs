mod booking;
mod patient;

pub use booking::ProcedureBookingService;
pub use patient::PatientService;
