//! HTTP surface under `/users/api/v1`.

mod error;
mod handler;
mod router;

pub use error::recover_error;
pub use handler::resolve_client_ip;
pub use router::routes;
