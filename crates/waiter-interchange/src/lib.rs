//! Tabular order interchange: CSV rows in, CSV export out.

mod export;
mod import;

pub use export::{write_orders, EXPORT_HEADER};
pub use import::read_orders;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterchangeError {
    /// A row that cannot become an argument sequence. Nothing from the file is loaded.
    #[error("malformed order at line {line}: {reason}")]
    Malformed { line: u64, reason: String },
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("encode arguments: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
