//! Log lines for the tables a run reads and writes
//!
//! Reading a table is announced when it starts; every read or write is
//! reported once it is done, with its row count and elapsed time.

use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Direction of a table transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableIo {
    /// Table loaded from disk
    Read,
    /// Table written to disk
    Write,
}

impl fmt::Display for TableIo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("Read"),
            Self::Write => f.write_str("Wrote"),
        }
    }
}

fn table_line(io: TableIo, path: &Path, rows: usize, elapsed: Duration) -> String {
    let preposition = match io {
        TableIo::Read => "from",
        TableIo::Write => "to",
    };
    format!(
        "{io} {rows} row(s) {preposition} {} in {elapsed:.2?}",
        path.display()
    )
}

/// Announce that a table is being read
///
/// # Arguments
/// * `kind` - What the table holds, e.g. "survey table"
/// * `path` - File being read
pub fn log_table_opened(kind: &str, path: &Path) {
    log::info!("Reading {kind} {}", path.display());
}

/// Report a finished table read or write
pub fn log_table_done(io: TableIo, path: &Path, rows: usize, elapsed: Duration) {
    log::info!("{}", table_line(io, path, rows, elapsed));
}

/// Warn that a table holds a different number of usable rows than configured
pub fn log_row_count_mismatch(path: &Path, found: usize, limit: usize) {
    log::warn!(
        "{found} usable row(s) in {} but the configured limit is {limit}",
        path.display()
    );
}
