//! MySQL adapters. Schema lives in `sql/mysql_schema.sql`.

mod session_registry_mysql;
mod user_repo_mysql;

pub use session_registry_mysql::*;
pub use user_repo_mysql::*;

mod util;
