//! Serialization of output records.

mod json;

pub use json::{to_json, JsonFormat};
