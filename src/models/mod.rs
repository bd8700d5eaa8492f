pub mod article;
pub mod engagement;
pub mod query;
pub mod user;

pub use article::*;
pub use engagement::*;
pub use query::*;
pub use user::*;

/// Current time as Unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Renders a stored millisecond timestamp as RFC 3339
pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
