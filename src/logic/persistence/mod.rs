//! Persistence - CSV mirror of the history log

pub mod mirror;

pub use mirror::{to_csv_string, CsvMirror, CSV_HEADER};
