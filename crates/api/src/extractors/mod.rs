//! Custom Axum extractors.

pub mod caller;

pub use caller::{Caller, USER_ID_HEADER, USER_NAME_HEADER};
