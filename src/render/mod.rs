//! Rendering module for serializing records to output formats.

mod json;

pub use json::{to_json, to_json_value, JsonFormat};
