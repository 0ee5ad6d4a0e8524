//! Async file and directory helpers

pub mod dir;
pub mod file;
