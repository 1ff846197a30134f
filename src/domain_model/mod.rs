mod currency;
mod session;
mod token;
mod user;

pub use currency::*;
pub use session::*;
pub use token::*;
pub use user::*;
