use chrono::{DateTime, Utc};

/// Wall-clock source. Callers read it once per operation and reuse the value.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
