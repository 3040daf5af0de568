//! Table assembly: the wide Business table and the tidy Media table.
//!
//! # Media pivot
//!
//! ```text
//! Date  | fb_imp | fb_click | tv_spend          Date  | Media | Product | Impressions | Clicks | Spend
//! ------+--------+----------+---------    →     ------+-------+---------+-------------+--------+------
//! d1    | 100    | 5        | 30                d1    | FB    | ALL     | 100         | 5      |
//! d2    | 200    | 7        | 40                d2    | FB    | ALL     | 200         | 7      |
//!                                               d1    | TV    | ALL     |             |        | 30
//!                                               d2    | TV    | ALL     |             |        | 40
//! ```
//!
//! Each category is built as its own block with deduplicated metric names;
//! blocks are stacked in category order and aligned on the union of their
//! column names. Cells a block does not have stay blank.

use std::collections::HashMap;

use super::category::{extract_media_column, order_categories};
use super::classifier::classify_column;
use super::dedup::dedup_names;
use super::header::ResolvedHeader;
use crate::config::ReshapeConfig;
use crate::models::{Cell, ColumnInfo, ColumnRole, Grid, MediaColumn, RawTable, TableKind, Warning};

/// Name of the date key column in both tables.
pub const DATE_COLUMN: &str = "Date";

/// Name of the category column in the Media table.
pub const MEDIA_COLUMN: &str = "Media";

/// Name of the product column in the Media table.
pub const PRODUCT_COLUMN: &str = "Product";

/// Per-column analysis of a report plus the Media category order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnLayout {
    pub columns: Vec<ColumnInfo>,
    pub categories: Vec<String>,
}

impl ColumnLayout {
    /// Classify every column and derive Media categories.
    ///
    /// Business and Media columns without a field name are kept under
    /// [`unnamed_column`] and reported with a [`Warning::BlankFieldName`].
    pub fn analyze(header: &ResolvedHeader, config: &ReshapeConfig) -> (Self, Vec<Warning>) {
        let mut warnings = Vec::new();
        let mut columns = Vec::with_capacity(header.width());

        for (index, (group, field)) in header.groups.iter().zip(&header.fields).enumerate() {
            let role = classify_column(index, group);
            let unnamed = field.is_empty()
                && matches!(role, ColumnRole::Business | ColumnRole::Media);
            if unnamed {
                warnings.push(Warning::BlankFieldName { column: index, role });
            }

            let media = (role == ColumnRole::Media).then(|| {
                let mut column = extract_media_column(index, group, field, config);
                if unnamed {
                    column.metric = unnamed_column(index);
                }
                column
            });

            columns.push(ColumnInfo {
                index,
                group_label: group.clone(),
                field_name: field.clone(),
                role,
                media,
            });
        }

        let media_columns: Vec<MediaColumn> =
            columns.iter().filter_map(|c| c.media.clone()).collect();
        let categories = order_categories(&media_columns);

        let layout = Self { columns, categories };
        if layout.business_columns().next().is_none() {
            warnings.push(Warning::NoMatchingColumns {
                table: TableKind::Business,
            });
        }
        if layout.categories.is_empty() {
            warnings.push(Warning::NoMatchingColumns {
                table: TableKind::Media,
            });
        }

        (layout, warnings)
    }

    /// Business columns in source order.
    pub fn business_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| c.role == ColumnRole::Business)
    }

    /// Media columns of one category, in source order.
    pub fn category_columns<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a MediaColumn> + 'a {
        self.columns
            .iter()
            .filter_map(|c| c.media.as_ref())
            .filter(move |m| m.category == category)
    }
}

/// Output name of a classified column whose field name is blank.
pub fn unnamed_column(index: usize) -> String {
    format!("Unnamed_{}", index)
}

/// Build the Business table: `Date` plus every KPI column, one row per data row.
pub fn build_business(grid: &Grid, header: &ResolvedHeader, layout: &ColumnLayout) -> RawTable {
    let business: Vec<&ColumnInfo> = layout.business_columns().collect();

    let labels: Vec<String> = business
        .iter()
        .map(|c| match c.field_name.as_str() {
            "" => unnamed_column(c.index),
            name => name.to_string(),
        })
        .collect();
    let names: Vec<&str> = std::iter::once(DATE_COLUMN)
        .chain(labels.iter().map(String::as_str))
        .collect();
    let mut table = RawTable::new(dedup_names(&names));

    for r in header.data_rows.clone() {
        let row = std::iter::once(grid.cell(r, 0).clone())
            .chain(business.iter().map(|c| grid.cell(r, c.index).clone()))
            .collect();
        table.push_row(row);
    }

    table
}

/// One category's slice of the Media table.
struct CategoryBlock<'a> {
    category: &'a str,
    /// Deduplicated metric names, aligned with `sources`.
    metrics: Vec<String>,
    /// Source column index of each metric.
    sources: Vec<usize>,
}

/// Build the Media table: one block per category, stacked in category order.
pub fn build_media(
    grid: &Grid,
    header: &ResolvedHeader,
    layout: &ColumnLayout,
    product_label: &str,
) -> RawTable {
    let fixed = [DATE_COLUMN, MEDIA_COLUMN, PRODUCT_COLUMN];

    let blocks: Vec<CategoryBlock<'_>> = layout
        .categories
        .iter()
        .map(|category| {
            let columns: Vec<&MediaColumn> = layout.category_columns(category).collect();
            let names: Vec<&str> = fixed
                .iter()
                .copied()
                .chain(columns.iter().map(|m| m.metric.as_str()))
                .collect();
            let metrics = dedup_names(&names).split_off(fixed.len());
            CategoryBlock {
                category,
                metrics,
                sources: columns.iter().map(|m| m.index).collect(),
            }
        })
        .collect();

    // union of block columns, first-seen order
    let mut union: Vec<String> = fixed.iter().map(|s| s.to_string()).collect();
    let mut position: HashMap<String, usize> = union
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();
    for block in &blocks {
        for name in &block.metrics {
            if !position.contains_key(name) {
                position.insert(name.clone(), union.len());
                union.push(name.clone());
            }
        }
    }

    let width = union.len();
    let mut table = RawTable::new(union);
    let product = Cell::Text(product_label.to_string());

    for block in &blocks {
        let slots: Vec<(usize, usize)> = block
            .metrics
            .iter()
            .zip(&block.sources)
            .map(|(name, &src)| (position[name], src))
            .collect();
        let media = Cell::Text(block.category.to_string());

        for r in header.data_rows.clone() {
            let mut row = vec![Cell::Empty; width];
            row[0] = grid.cell(r, 0).clone();
            row[1] = media.clone();
            row[2] = product.clone();
            for &(slot, src) in &slots {
                row[slot] = grid.cell(r, src).clone();
            }
            table.push_row(row);
        }
    }

    table
}
