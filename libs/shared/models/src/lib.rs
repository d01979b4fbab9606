pub mod auth;
pub mod appointment;
pub mod error;
pub mod ids;
