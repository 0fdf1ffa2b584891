#![forbid(unsafe_code)]

//! Config-driven bandwidth limiter.
//!
//! Drives an external privileged traffic-control agent over a line protocol
//! on its stdio and re-applies the limit configuration whenever the file
//! changes.

pub mod agent;
pub mod app;
pub mod config;
pub mod config_watcher;
pub mod discovery;
pub mod driver;
pub mod errors;
pub mod models;
pub mod reconciler;
pub mod scheduler;

pub use config::Configuration;
pub use errors::{AppError, Result};
