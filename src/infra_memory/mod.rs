//! In-process adapters. The default backend for local runs and the one the
//! test-suite drives.

mod session_registry_memory;
mod user_repo_memory;

pub use session_registry_memory::*;
pub use user_repo_memory::*;
