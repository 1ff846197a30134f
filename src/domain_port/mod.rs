mod session_registry;
mod user_repo;

pub use session_registry::*;
pub use user_repo::*;
