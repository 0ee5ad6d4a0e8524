//! Cloud Console Library
//!
//! Session, model cache, task tracking and local API for a Cloud Director console.

pub mod app;
pub mod builder;
pub mod cache;
pub mod errors;
pub mod events;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod search;
pub mod server;
pub mod session;
pub mod status;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod workers;
