pub mod identity;
pub mod password;

pub use identity::IdentityService;
