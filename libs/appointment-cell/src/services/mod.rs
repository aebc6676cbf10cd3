pub mod booking;
pub mod lifecycle;
pub mod slots;

pub use booking::AppointmentBookingService;
pub use lifecycle::AppointmentLifecycleService;
pub use slots::{generate_time_slots, resolve_available_slots, SLOT_DURATION_MINUTES};
