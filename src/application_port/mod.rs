mod auth_service;
mod clock;
mod error;

pub use auth_service::*;
pub use clock::*;
pub use error::*;
