mod clock;
mod jwt_codec;
mod password_hasher;
mod session_service;

pub use clock::*;
pub use jwt_codec::*;
pub use password_hasher::*;
pub use session_service::*;
