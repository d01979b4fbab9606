pub mod handlers;
pub mod router;
pub mod services;

pub use router::*;
pub use services::*;
