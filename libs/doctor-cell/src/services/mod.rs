pub mod availability;
pub mod doctor;
pub mod schedule;
pub mod slots;

pub use availability::AvailabilityService;
pub use doctor::DoctorService;
pub use schedule::ScheduleService;
