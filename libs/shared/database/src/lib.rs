pub mod directory;
pub mod rows;
pub mod supabase;

pub use directory::NameDirectory;
pub use rows::decode_rows;
pub use supabase::{SupabaseClient, SupabaseError};
