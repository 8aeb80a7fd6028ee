//! Reelscout Export - output sinks for scraped records.
//!
//! Records are written either as a JSON array (unknown counts as `null`) or
//! as CSV with a fixed header (unknown values as empty cells). [`save`]
//! picks a timestamped file name inside the configured output directory.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod error;
mod file;
mod json;
mod table;

pub use error::{ExportError, Result};
pub use file::{output_file_name, save, write_records};
pub use json::write_json;
pub use table::{write_csv, CSV_HEADER};
