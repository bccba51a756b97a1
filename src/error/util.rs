//! Utility functions for error handling
//!
//! File-system helpers that attach the path and the purpose of an access to
//! any I/O failure, so a fatal error names the file that caused it.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Safely read a file to string with rich error information
///
/// # Arguments
/// * `path` - The path to the file to read
/// * `purpose` - Why the file is being read (for error context)
///
/// # Returns
/// * `Result<String>` - The file content or a detailed error
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::io_with_context(
            format!("File not found: {} (needed for: {purpose})", path.display()),
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }

    if !path.is_file() {
        return Err(PipelineError::io_with_context(
            format!("Path is not a file: {} (expected a file for: {purpose})", path.display()),
            io::Error::from(io::ErrorKind::InvalidInput),
        ));
    }

    fs::read_to_string(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => {
                format!("Permission denied reading {}", path.display())
            }
            io::ErrorKind::InvalidData => format!(
                "File {} contains invalid UTF-8 data - cannot read as text",
                path.display()
            ),
            _ => format!("Failed to read {} for: {purpose}", path.display()),
        };
        PipelineError::io_with_context(context, e)
    })
}

/// Safely write a string to a file, naming the file on failure
pub fn safe_write(path: &Path, content: &str, purpose: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| {
        PipelineError::io_with_context(
            format!("Failed to write {} for: {purpose}", path.display()),
            e,
        )
    })
}

/// Check if a directory exists and is readable, with rich error information
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.exists() {
        return Err(PipelineError::io_with_context(
            format!("Directory not found: {} (needed for: {purpose})", path.display()),
            io::Error::from(io::ErrorKind::NotFound),
        ));
    }

    if !path.is_dir() {
        return Err(PipelineError::io_with_context(
            format!("Path is not a directory: {} (expected a directory for: {purpose})", path.display()),
            io::Error::from(io::ErrorKind::InvalidInput),
        ));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| {
        PipelineError::io_with_context(
            format!("Failed to access directory {} for: {purpose}", path.display()),
            e,
        )
    })
}

/// Create a directory (and its parents) if it does not exist yet
///
/// # Returns
/// `true` if the directory was created by this call
pub fn ensure_directory(path: &Path) -> Result<bool> {
    if path.is_dir() {
        return Ok(false);
    }
    fs::create_dir_all(path).map_err(|e| {
        PipelineError::io_with_context(format!("Failed to create directory {}", path.display()), e)
    })?;
    Ok(true)
}
