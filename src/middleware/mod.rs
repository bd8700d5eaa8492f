pub mod auth;
pub mod security_headers;

pub use auth::{Access, AccessPolicy, AuthUser, Viewer};
pub use security_headers::SecurityHeaders;
