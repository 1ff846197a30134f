mod session_registry_redis;

pub use session_registry_redis::*;
