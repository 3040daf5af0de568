//! The reshape engine: grid in, Business and Media tables out.
//!
//! Pure and synchronous: no I/O, no shared state. Only a grid that lacks the
//! header layout fails; every per-cell problem becomes a [`Warning`].

use serde::Serialize;

use super::builder::{build_business, build_media, ColumnLayout};
use super::header::resolve_header;
use super::normalize::normalize_table;
use crate::config::ReshapeConfig;
use crate::error::GridResult;
use crate::models::{ColumnInfo, Grid, OutputTable, TableKind, Warning};

/// Both output tables plus what was learned on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReshapeOutput {
    pub business: OutputTable,
    pub media: OutputTable,
    /// Media categories in row-block order.
    pub categories: Vec<String>,
    /// Per-column classification.
    pub columns: Vec<ColumnInfo>,
    /// Number of data rows in the source grid.
    pub data_rows: usize,
    pub warnings: Vec<Warning>,
}

impl ReshapeOutput {
    pub fn table(&self, kind: TableKind) -> &OutputTable {
        match kind {
            TableKind::Business => &self.business,
            TableKind::Media => &self.media,
        }
    }
}

/// Split a report grid into its Business and Media tables.
pub fn reshape(grid: &Grid, config: &ReshapeConfig) -> GridResult<ReshapeOutput> {
    let header = resolve_header(grid)?;
    let (layout, mut warnings) = ColumnLayout::analyze(&header, config);

    let business_raw = build_business(grid, &header, &layout);
    let media_raw = build_media(grid, &header, &layout, &config.product_label);

    let (business, business_warnings) = normalize_table(business_raw, TableKind::Business, config);
    let (media, media_warnings) = normalize_table(media_raw, TableKind::Media, config);
    warnings.extend(business_warnings);
    warnings.extend(media_warnings);

    Ok(ReshapeOutput {
        business,
        media,
        categories: layout.categories,
        columns: layout.columns,
        data_rows: header.data_row_count(),
        warnings,
    })
}
