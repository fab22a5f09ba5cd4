//! Severity table loading from tabular data.

pub mod csv_table;

pub use csv_table::{
    load_or_fallback, load_severity_table, read_condition_rows, read_severity_entries,
};
