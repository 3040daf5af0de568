//! Header resolution: group labels, field names and the data body.
//!
//! The group row is a visually merged header: a label is written once in the
//! leftmost cell of its span and the remaining cells are blank.
//!
//! ```text
//! row 1:  |      | KPI     |         | MEDIA  |          |          |
//! row 3:  | Date | Revenue | Orders  | fb_imp | fb_click | tv_spend |
//!             ↓ forward-fill
//! groups: | ""   | KPI     | KPI     | MEDIA  | MEDIA    | MEDIA    |
//! ```

use crate::error::{GridError, GridResult};
use crate::models::{Cell, Grid, DATA_START_ROW, FIELD_ROW, GROUP_ROW, MIN_COLUMNS, MIN_ROWS};

/// Resolved header rows plus the range of data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedHeader {
    /// Forward-filled group label per column.
    pub groups: Vec<String>,
    /// Trimmed field name per column; blank cells give an empty string.
    pub fields: Vec<String>,
    /// Absolute grid indices of the data rows.
    pub data_rows: std::ops::Range<usize>,
}

impl ResolvedHeader {
    pub fn width(&self) -> usize {
        self.groups.len()
    }

    pub fn data_row_count(&self) -> usize {
        self.data_rows.len()
    }
}

/// Check the grid shape and resolve its header rows.
pub fn resolve_header(grid: &Grid) -> GridResult<ResolvedHeader> {
    if grid.row_count() < MIN_ROWS {
        return Err(GridError::TooFewRows {
            required: MIN_ROWS,
            found: grid.row_count(),
        });
    }
    let width = grid.width();
    if width < MIN_COLUMNS {
        return Err(GridError::TooFewColumns {
            required: MIN_COLUMNS,
            found: width,
        });
    }

    let group_cells: Vec<&Cell> = (0..width).map(|c| grid.cell(GROUP_ROW, c)).collect();
    let groups = forward_fill(&group_cells);
    let fields = (0..width).map(|c| grid.cell(FIELD_ROW, c).to_text()).collect();

    Ok(ResolvedHeader {
        groups,
        fields,
        data_rows: DATA_START_ROW..grid.row_count(),
    })
}

/// Carry the last non-blank label rightwards over blank cells.
///
/// Cells before the first non-blank label stay blank.
pub fn forward_fill(cells: &[&Cell]) -> Vec<String> {
    cells
        .iter()
        .scan(String::new(), |last, cell| {
            if !cell.is_blank() {
                *last = cell.to_text();
            }
            Some(last.clone())
        })
        .collect()
}
