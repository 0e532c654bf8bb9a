pub(crate) mod error;
pub(crate) mod search;

pub use error::{ApiError, ApiJson, ApiPath, ErrorCode};
