// Utility functions
pub mod error;
pub mod key_lock;
pub mod validation;

pub use error::*;
pub use key_lock::*;
