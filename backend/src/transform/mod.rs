//! Transformation module.
//!
//! Report grid to Business and Media tables:
//! - Header: forward-filled group labels and field names
//! - Classifier / Category: column roles, media categories and metrics
//! - Dedup / Builder: unique column names, table assembly
//! - Normalize: dates and numbers
//! - Reshape: the pure engine tying the steps together
//! - Pipeline: loading plus progress logging

pub mod builder;
pub mod category;
pub mod classifier;
pub mod dedup;
pub mod header;
pub mod normalize;
pub mod pipeline;
pub mod reshape;

pub use builder::{ColumnLayout, DATE_COLUMN, MEDIA_COLUMN, PRODUCT_COLUMN};
pub use category::{extract_media_column, normalize_metric, order_categories};
pub use classifier::{classify_column, classify_columns};
pub use dedup::dedup_names;
pub use header::{forward_fill, resolve_header, ResolvedHeader};
pub use normalize::{
    excel_serial_to_datetime, normalize_table, parse_date, parse_number, InvalidNumber,
};
pub use pipeline::{convert_bytes, convert_file, Conversion, ConvertOptions};
pub use reshape::{reshape, ReshapeOutput};
