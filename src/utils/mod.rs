//! Shared utilities for logging and progress reporting

pub mod logging;
