//! Logging utilities for output and progress tracking
//!
//! This module provides utilities for consistent log lines and progress bars.

pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use self::log::{TableIo, log_row_count_mismatch, log_table_done, log_table_opened};
pub use progress::{create_main_progress_bar, finish_progress_bar};
