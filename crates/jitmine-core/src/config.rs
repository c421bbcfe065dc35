use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::JitError;

/// Top-level configuration loaded from `.jitmine.toml`.
///
/// Every field has a default, so an empty file is a valid configuration.
/// CLI flags take precedence over values loaded here.
///
/// # Examples
///
/// ```
/// use jitmine_core::JitConfig;
///
/// let config = JitConfig::default();
/// assert_eq!(config.extract.surrounding_lines, 3);
/// assert!(config.extract.languages.is_empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JitConfig {
    /// Per-commit extraction settings.
    #[serde(default)]
    pub extract: ExtractConfig,
    /// Commit enumeration settings.
    #[serde(default)]
    pub mining: MiningConfig,
}

impl JitConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::FileNotFound`] if `path` does not exist,
    /// [`JitError::Io`] if it cannot be read, or [`JitError::Toml`] if the
    /// content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use jitmine_core::JitConfig;
    /// use std::path::Path;
    ///
    /// let config = JitConfig::from_file(Path::new(".jitmine.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, JitError> {
        if !path.exists() {
            return Err(JitError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`JitError::Toml`] if parsing fails, or [`JitError::Config`]
    /// if `batch_size` is zero or `since` is later than `until`.
    ///
    /// # Examples
    ///
    /// ```
    /// use jitmine_core::JitConfig;
    ///
    /// let toml = r#"
    /// [extract]
    /// languages = ["Rust"]
    /// "#;
    /// let config = JitConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.extract.languages, vec!["Rust"]);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, JitError> {
        let config: Self = toml::from_str(content)?;
        if config.extract.batch_size == 0 {
            return Err(JitError::Config(
                "extract.batch_size must be at least 1".into(),
            ));
        }
        if let (Some(since), Some(until)) = (config.mining.since, config.mining.until) {
            if since > until {
                return Err(JitError::Config(format!(
                    "mining.since ({since}) is after mining.until ({until})"
                )));
            }
        }
        Ok(config)
    }
}

/// Settings that control how a single commit is turned into change records.
///
/// # Examples
///
/// ```
/// use jitmine_core::ExtractConfig;
///
/// let config = ExtractConfig::default();
/// assert_eq!(config.surrounding_lines, 3);
/// assert!(config.skip_patterns.is_empty());
/// assert_eq!(config.batch_size, 100);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Language allow-list by display name (e.g. `"Rust"`). Empty keeps all files.
    #[serde(default)]
    pub languages: Vec<String>,
    /// Context lines kept around each change group when hunks are regrouped (default: 3).
    #[serde(default = "default_surrounding_lines")]
    pub surrounding_lines: usize,
    /// Additional glob patterns of paths to exclude from every commit.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// Extracted commits between history checkpoints (default: 100).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_surrounding_lines() -> usize {
    3
}

fn default_batch_size() -> usize {
    100
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            languages: Vec::new(),
            surrounding_lines: default_surrounding_lines(),
            skip_patterns: Vec::new(),
            batch_size: default_batch_size(),
        }
    }
}

/// Which commits to enumerate from the repository.
///
/// # Examples
///
/// ```
/// use jitmine_core::MiningConfig;
///
/// let config = MiningConfig::default();
/// assert!(config.branch.is_none());
/// assert!(config.since.is_none() && config.until.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Branch to walk (default: HEAD).
    pub branch: Option<String>,
    /// Only include commits on or after this date.
    pub since: Option<NaiveDate>,
    /// Only include commits on or before this date.
    pub until: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_by_path() {
        let err = JitConfig::from_file(Path::new("/nonexistent/.jitmine.toml")).unwrap_err();
        assert!(matches!(err, JitError::FileNotFound(ref p) if p.ends_with(".jitmine.toml")));
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = JitConfig::default();
        assert_eq!(config.extract.surrounding_lines, 3);
        assert!(config.extract.languages.is_empty());
        assert!(config.extract.skip_patterns.is_empty());
        assert_eq!(config.extract.batch_size, 100);
        assert!(config.mining.branch.is_none());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[extract]
languages = ["Python", "Java"]
surrounding_lines = 5
skip_patterns = ["docs/**"]
batch_size = 25

[mining]
branch = "main"
since = "2020-01-01"
until = "2021-06-30"
"#;
        let config = JitConfig::from_toml(toml).unwrap();
        assert_eq!(config.extract.languages, vec!["Python", "Java"]);
        assert_eq!(config.extract.surrounding_lines, 5);
        assert_eq!(config.extract.skip_patterns, vec!["docs/**"]);
        assert_eq!(config.extract.batch_size, 25);
        assert_eq!(config.mining.branch.as_deref(), Some("main"));
        assert_eq!(
            config.mining.since,
            Some(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap())
        );
        assert_eq!(
            config.mining.until,
            Some(NaiveDate::from_ymd_opt(2021, 6, 30).unwrap())
        );
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = JitConfig::from_toml("").unwrap();
        assert_eq!(config.extract.surrounding_lines, 3);
        assert!(config.mining.since.is_none());
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(JitConfig::from_toml("{{invalid}}").is_err());
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let toml = r#"
[mining]
since = "2022-01-01"
until = "2021-01-01"
"#;
        let err = JitConfig::from_toml(toml).unwrap_err();
        assert!(matches!(err, JitError::Config(_)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = JitConfig::from_toml("[extract]\nbatch_size = 0\n").unwrap_err();
        assert!(matches!(err, JitError::Config(ref msg) if msg.contains("batch_size")));
    }
}
