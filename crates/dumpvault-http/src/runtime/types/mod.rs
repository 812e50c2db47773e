//! Type definitions for the HTTP runtime

pub mod responses;

pub use responses::*;
