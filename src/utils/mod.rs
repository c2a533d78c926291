//! Shared utility functions.

pub mod mime;

pub use mime::{input_kind, verify_mime, InputKind};
