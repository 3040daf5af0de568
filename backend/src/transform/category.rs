//! Media category extraction.
//!
//! Media field names come in two upstream conventions:
//!
//! | Convention | Field name                     | Category             | Metric        |
//! |------------|--------------------------------|----------------------|---------------|
//! | Ordinary   | `FACEBOOK_AWARENESS_IMP`       | `FACEBOOK_AWARENESS` | `Impressions` |
//! | Special    | `PR_MENTIONS` (Earned Media)   | `PR`                 | `Mentions`    |
//!
//! Special applies to columns under the configured owned/shared/earned groups.

use crate::config::ReshapeConfig;
use crate::models::{MediaColumn, MediaConvention};

impl MediaConvention {
    /// Convention implied by a column's group label.
    pub fn for_group(group_label: &str, config: &ReshapeConfig) -> Self {
        if config.is_special_group(&group_label.to_uppercase()) {
            MediaConvention::Special
        } else {
            MediaConvention::Ordinary
        }
    }

    /// Split a field name into (category, raw metric token).
    pub fn split<'a>(&self, field: &'a str) -> (String, &'a str) {
        match self {
            MediaConvention::Ordinary => split_ordinary(field),
            MediaConvention::Special => split_special(field),
        }
    }
}

/// Everything before the last underscore is the category.
fn split_ordinary(field: &str) -> (String, &str) {
    match field.rsplit_once('_') {
        Some((category, metric)) => (category.to_uppercase(), metric),
        None => (field.to_uppercase(), field),
    }
}

/// Only the first segment is the category.
fn split_special(field: &str) -> (String, &str) {
    match (field.split_once('_'), field.rsplit_once('_')) {
        (Some((category, _)), Some((_, metric))) => (category.to_uppercase(), metric),
        _ => (field.to_uppercase(), field),
    }
}

/// Canonical metric name: the rename table, else the token capitalized.
pub fn normalize_metric(raw: &str, config: &ReshapeConfig) -> String {
    match config.rename_metric(raw) {
        Some(name) => name.to_string(),
        None => capitalize(raw),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Derive category and metric for a Media column.
pub fn extract_media_column(
    index: usize,
    group_label: &str,
    field_name: &str,
    config: &ReshapeConfig,
) -> MediaColumn {
    let convention = MediaConvention::for_group(group_label, config);
    let (category, raw_metric) = convention.split(field_name);
    MediaColumn {
        index,
        category,
        metric: normalize_metric(raw_metric, config),
        convention,
    }
}

/// Ordinary categories in first-seen order, then special ones not seen yet.
pub fn order_categories(columns: &[MediaColumn]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::new();

    for convention in [MediaConvention::Ordinary, MediaConvention::Special] {
        for column in columns.iter().filter(|c| c.convention == convention) {
            if !ordered.contains(&column.category) {
                ordered.push(column.category.clone());
            }
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ReshapeConfig {
        ReshapeConfig::default()
    }

    #[test]
    fn test_ordinary_rule() {
        let col = extract_media_column(3, "MEDIA", "FACEBOOK_AWARENESS_IMP", &config());
        assert_eq!(col.category, "FACEBOOK_AWARENESS");
        assert_eq!(col.metric, "Impressions");
        assert_eq!(col.convention, MediaConvention::Ordinary);
        assert_eq!(col.index, 3);
    }

    #[test]
    fn test_special_rule_capitalized_fallback() {
        let col = extract_media_column(7, "EARNED MEDIA", "PR_MENTIONS", &config());
        assert_eq!(col.category, "PR");
        assert_eq!(col.metric, "Mentions");
        assert_eq!(col.convention, MediaConvention::Special);
    }

    #[test]
    fn test_special_rule_uses_first_segment_only() {
        let col = extract_media_column(1, "Owned Media", "line_oa_click", &config());
        assert_eq!(col.category, "LINE");
        assert_eq!(col.metric, "Clicks");

        let ordinary = extract_media_column(1, "Paid Media", "line_oa_click", &config());
        assert_eq!(ordinary.category, "LINE_OA");
    }

    #[test]
    fn test_field_without_underscore() {
        let col = extract_media_column(1, "MEDIA", "spend", &config());
        assert_eq!(col.category, "SPEND");
        assert_eq!(col.metric, "Spend");

        let special = extract_media_column(1, "SHARED MEDIA", "blog", &config());
        assert_eq!(special.category, "BLOG");
        assert_eq!(special.metric, "Blog");
    }

    #[test]
    fn test_blank_field_does_not_panic() {
        let col = extract_media_column(1, "MEDIA", "", &config());
        assert_eq!(col.category, "");
        assert_eq!(col.metric, "");
    }

    #[test]
    fn test_rename_table() {
        let c = config();
        assert_eq!(normalize_metric("imp", &c), "Impressions");
        assert_eq!(normalize_metric("VIEW", &c), "Views");
        assert_eq!(normalize_metric("Click", &c), "Clicks");
        assert_eq!(normalize_metric("spent", &c), "Spend");
        assert_eq!(normalize_metric("grp", &c), "GRP");
        assert_eq!(normalize_metric("REACH", &c), "Reach");
        assert_eq!(normalize_metric("cpm", &c), "Cpm");
    }

    #[test]
    fn test_category_order_puts_ordinary_first() {
        let c = config();
        let columns = vec![
            extract_media_column(1, "EARNED MEDIA", "pr_mentions", &c),
            extract_media_column(2, "MEDIA", "tv_spend", &c),
            extract_media_column(3, "OWNED MEDIA", "web_visit", &c),
            extract_media_column(4, "MEDIA", "fb_imp", &c),
            extract_media_column(5, "MEDIA", "tv_grp", &c),
        ];
        assert_eq!(order_categories(&columns), vec!["TV", "FB", "PR", "WEB"]);
    }

    #[test]
    fn test_special_category_already_ordinary() {
        let c = config();
        let columns = vec![
            extract_media_column(1, "OWNED MEDIA", "fb_post", &c),
            extract_media_column(2, "MEDIA", "fb_imp", &c),
        ];
        assert_eq!(order_categories(&columns), vec!["FB"]);
    }
}
