//! Shared helpers for the dev server.

pub mod mime;
pub mod path;
