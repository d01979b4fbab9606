pub mod ledger;
pub mod lifecycle;
pub mod locks;
pub mod validator;

pub use ledger::{AppointmentFilter, AppointmentLedger, SortOrder};
pub use lifecycle::AppointmentLifecycle;
pub use locks::SlotLocks;
pub use validator::{validate_booking, EligibleBooking, ProposedSlot};
