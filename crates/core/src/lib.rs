//! Pure domain logic for the lookbook backend.
//!
//! Nothing in this crate performs I/O: schema role detection, record
//! extraction, Notion property payloads and the image-generation request /
//! response rules all operate on plain values so they can be tested in
//! isolation.

pub mod error;
pub mod generation;
pub mod properties;
pub mod records;
pub mod schema;
pub mod task_response;
