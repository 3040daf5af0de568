//! Column classification from forward-filled group labels.

use crate::models::ColumnRole;

/// Keyword marking a Business (KPI) column.
const KPI_KEYWORD: &str = "KPI";

/// Keyword marking a Media column.
const MEDIA_KEYWORD: &str = "MEDIA";

/// Media groups that must stay out of the Media table.
const NON_MEDIA_KEYWORD: &str = "NON MEDIA";

/// Classify one column from its group label.
///
/// Column 0 is always the date key. For the other columns the first matching
/// rule wins: KPI, then MEDIA without NON MEDIA, otherwise excluded. Labels
/// that match neither keyword are excluded, never Media by default.
pub fn classify_column(index: usize, group_label: &str) -> ColumnRole {
    if index == 0 {
        return ColumnRole::Date;
    }

    let label = group_label.to_uppercase();
    if label.contains(KPI_KEYWORD) {
        ColumnRole::Business
    } else if label.contains(MEDIA_KEYWORD) && !label.contains(NON_MEDIA_KEYWORD) {
        ColumnRole::Media
    } else {
        ColumnRole::Excluded
    }
}

/// Classify every column of a resolved group row.
pub fn classify_columns(groups: &[String]) -> Vec<ColumnRole> {
    groups
        .iter()
        .enumerate()
        .map(|(i, label)| classify_column(i, label))
        .collect()
}
