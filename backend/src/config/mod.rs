//! Reshape configuration.
//!
//! The configuration carries the vocabulary that the Media table shares with
//! downstream modeling tools: the metric rename table, the group names that
//! switch a column to the special naming convention, and the literal used for
//! the `Product` column. It is a versioned JSON document so the vocabulary can
//! be extended without touching the extraction logic.
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "metric_renames": { "imp": "Impressions", "spend": "Spend" },
//!   "special_groups": ["OWNED MEDIA", "SHARED MEDIA", "EARNED MEDIA"],
//!   "product_label": "ALL",
//!   "undated_rows": "keep"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable holding the path of a config JSON file.
pub const CONFIG_ENV_VAR: &str = "ROISPLIT_CONFIG";

/// Environment variable holding the HTTP server port.
pub const PORT_ENV_VAR: &str = "ROISPLIT_PORT";

/// Port used when neither the CLI nor the environment names one.
pub const DEFAULT_PORT: u16 = 3000;

/// Everything the reshape engine needs besides the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReshapeConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Raw metric token (case-insensitive) -> canonical metric name
    #[serde(default = "default_metric_renames")]
    pub metric_renames: BTreeMap<String, String>,

    /// Group labels whose columns use the `<channel>_<metric>` convention
    #[serde(default = "default_special_groups")]
    pub special_groups: Vec<String>,

    /// Literal written to the `Product` column of every Media row
    #[serde(default = "default_product_label")]
    pub product_label: String,

    /// chrono formats tried, in order, on textual dates
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// What to do with rows whose date is missing or unparseable
    #[serde(default)]
    pub undated_rows: UndatedRows,
}

/// Policy for rows whose date cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndatedRows {
    /// Keep the row with a blank date.
    #[default]
    Keep,
    /// Remove the row from the output table.
    Drop,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_metric_renames() -> BTreeMap<String, String> {
    [
        ("imp", "Impressions"),
        ("view", "Views"),
        ("click", "Clicks"),
        ("spend", "Spend"),
        ("spent", "Spend"),
        ("grp", "GRP"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_special_groups() -> Vec<String> {
    vec![
        "OWNED MEDIA".to_string(),
        "SHARED MEDIA".to_string(),
        "EARNED MEDIA".to_string(),
    ]
}

fn default_product_label() -> String {
    "ALL".to_string()
}

fn default_date_formats() -> Vec<String> {
    [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%Y.%m.%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%d.%m.%Y",
        "%d %b %Y",
        "%b %d, %Y",
        "%Y年%m月%d日",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ReshapeConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            description: "Built-in ROI report vocabulary".to_string(),
            metric_renames: default_metric_renames(),
            special_groups: default_special_groups(),
            product_label: default_product_label(),
            date_formats: default_date_formats(),
            undated_rows: UndatedRows::default(),
        }
    }
}

impl ReshapeConfig {
    /// Parse a config from a JSON string
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Explicit path first, then `ROISPLIT_CONFIG`, then the built-in default.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }
        match env::var(CONFIG_ENV_VAR) {
            Ok(p) if !p.trim().is_empty() => Self::from_file(p.trim()),
            _ => Ok(Self::default()),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> ConfigResult<()> {
        if let Some((raw, _)) = self.metric_renames.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "metric '{}' is renamed to an empty name",
                raw
            )));
        }
        if self.special_groups.iter().any(|g| g.trim().is_empty()) {
            return Err(ConfigError::Invalid("empty special group name".to_string()));
        }
        Ok(())
    }

    /// Canonical name for a raw metric token, if the rename table knows it.
    pub fn rename_metric(&self, raw: &str) -> Option<&str> {
        let key = raw.to_lowercase();
        self.metric_renames
            .get(&key)
            .or_else(|| {
                self.metric_renames
                    .iter()
                    .find(|(k, _)| k.to_lowercase() == key)
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Whether an upper-cased group label names a special media group.
    pub fn is_special_group(&self, label_upper: &str) -> bool {
        self.special_groups
            .iter()
            .any(|g| label_upper.contains(&g.to_uppercase()))
    }
}

/// Server port from `ROISPLIT_PORT`, falling back to [`DEFAULT_PORT`].
pub fn port_from_env() -> u16 {
    env::var(PORT_ENV_VAR)
        .ok()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary() {
        let config = ReshapeConfig::default();
        assert_eq!(config.rename_metric("imp"), Some("Impressions"));
        assert_eq!(config.rename_metric("IMP"), Some("Impressions"));
        assert_eq!(config.rename_metric("spent"), Some("Spend"));
        assert_eq!(config.rename_metric("grp"), Some("GRP"));
        assert_eq!(config.rename_metric("mentions"), None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = ReshapeConfig::from_json(r#"{ "product_label": "Shoes" }"#).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.product_label, "Shoes");
        assert_eq!(config.rename_metric("click"), Some("Clicks"));
        assert_eq!(config.undated_rows, UndatedRows::Keep);
    }

    #[test]
    fn test_mixed_case_rename_keys() {
        let config = ReshapeConfig::from_json(
            r#"{ "metric_renames": { "Reach": "Reach", "CTR": "CTR" } }"#,
        )
        .unwrap();
        assert_eq!(config.rename_metric("ctr"), Some("CTR"));
        assert_eq!(config.rename_metric("reach"), Some("Reach"));
        // replacing the table drops the built-in entries
        assert_eq!(config.rename_metric("imp"), None);
    }

    #[test]
    fn test_special_groups() {
        let config = ReshapeConfig::default();
        assert!(config.is_special_group("EARNED MEDIA"));
        assert!(config.is_special_group("2024 OWNED MEDIA (ORGANIC)"));
        assert!(!config.is_special_group("PAID MEDIA"));
    }

    #[test]
    fn test_drop_policy_round_trip() {
        let config = ReshapeConfig::from_json(r#"{ "undated_rows": "drop" }"#).unwrap();
        assert_eq!(config.undated_rows, UndatedRows::Drop);
        let json = config.to_json().unwrap();
        assert!(json.contains("\"drop\""));
    }

    #[test]
    fn test_invalid_config() {
        let err = ReshapeConfig::from_json(r#"{ "metric_renames": { "imp": " " } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(ReshapeConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "special_groups": ["PR MEDIA"] }"#).unwrap();
        let config = ReshapeConfig::load(Some(&path)).unwrap();
        assert!(config.is_special_group("PR MEDIA"));
        assert!(!config.is_special_group("EARNED MEDIA"));
    }
}
