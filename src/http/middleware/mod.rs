//! Middleware wrapped around the mapper route.

pub mod failure_log;

pub use failure_log::log_failures;
