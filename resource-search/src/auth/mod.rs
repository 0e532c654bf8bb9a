//! Requester identity forwarded by the surrounding auth layer.

mod extractor;

pub use extractor::{Requester, BRANCH_HEADER, ROLE_HEADER, SEMESTER_HEADER};
