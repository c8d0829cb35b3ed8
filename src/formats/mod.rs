//! Output encodings for decoded sample history and statistics.

pub mod csv;
pub mod json;
pub mod parquet;
pub mod text;
