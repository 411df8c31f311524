//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use harvester_core::{CollectionStatus, ReconcilePolicy};

/// Name of the per-user config folder.
const CONFIG_DIR_NAME: &str = "resume-harvester";

/// TOML-backed file configuration for harvester defaults.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// Root folder for collection folders.
    pub output_dir: Option<PathBuf>,
    /// Folder holding the global checkpoint.
    pub log_dir: Option<PathBuf>,
    /// Seconds to wait for each artifact (1..=3600).
    pub verify_timeout_secs: Option<u64>,
    /// Smallest accepted artifact in bytes.
    pub min_artifact_bytes: Option<u64>,
    /// Delay between page fetches in milliseconds (0..=60000).
    pub page_delay_ms: Option<u64>,
    /// Delay between item downloads in milliseconds (0..=60000).
    pub item_delay_ms: Option<u64>,
    /// Per-run download attempt cap.
    pub max_items: Option<u64>,
    /// Treatment of collections already on disk.
    pub policy: Option<ReconcilePolicy>,
    /// Collection statuses to list.
    pub statuses: Option<Vec<CollectionStatus>>,
    /// Item categories to include.
    pub categories: Option<Vec<String>>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(secs) = self.verify_timeout_secs
            && !(1..=3600).contains(&secs)
        {
            bail!("Invalid config value for `verify_timeout_secs`: {secs}. Expected range: 1..=3600");
        }
        validate_delay_ms("page_delay_ms", self.page_delay_ms)?;
        validate_delay_ms("item_delay_ms", self.item_delay_ms)?;
        if self.max_items == Some(0) {
            bail!("Invalid config value for `max_items`: 0. Expected at least 1");
        }
        if self.statuses.as_ref().is_some_and(Vec::is_empty) {
            bail!("Invalid config value for `statuses`: expected at least one status");
        }
        Ok(())
    }
}

fn validate_delay_ms(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if value > 60_000 {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 0..=60000");
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log level implied by the setting.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Config path that was consulted, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/resume-harvester/config.toml`
/// 2. `$HOME/.config/resume-harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the explicit config file, or the default one if present.
///
/// An explicit path must exist; a missing default file is not an error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path) if path.exists() => Some(load_file_config(path)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let line_no = line_index + 1;
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "log_dir" => {
                cfg.log_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(invalid)?,
                ));
            }
            "verify_timeout_secs" => {
                cfg.verify_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "min_artifact_bytes" => {
                cfg.min_artifact_bytes = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "page_delay_ms" => {
                cfg.page_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "item_delay_ms" => {
                cfg.item_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "max_items" => {
                cfg.max_items = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "policy" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let policy = parsed
                    .parse::<ReconcilePolicy>()
                    .map_err(anyhow::Error::msg)
                    .with_context(invalid)?;
                cfg.policy = Some(policy);
            }
            "statuses" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                let statuses = split_list(&parsed)
                    .map(|s| s.parse::<CollectionStatus>().map_err(anyhow::Error::msg))
                    .collect::<Result<Vec<_>>>()
                    .with_context(invalid)?;
                cfg.statuses = Some(statuses);
            }
            "categories" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.categories = Some(split_list(&parsed).map(str::to_string).collect());
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
verify_timeout_secs = 45
verbosity = "verbose"
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.verify_timeout_secs, Some(45));
        assert_eq!(cfg.verbosity, Some(VerbositySetting::Verbose));
        assert!(cfg.output_dir.is_none());
    }

    #[test]
    fn test_parse_config_all_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/data/cvs"
log_dir = "/data/logs"
min_artifact_bytes = 2048
page_delay_ms = 0
item_delay_ms = 250
max_items = 500
policy = "redo"
statuses = "active, paused"
categories = "NEW,REVIEWED"
"#,
        )
        .expect("full config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/data/cvs")));
        assert_eq!(cfg.log_dir, Some(PathBuf::from("/data/logs")));
        assert_eq!(cfg.min_artifact_bytes, Some(2048));
        assert_eq!(cfg.page_delay_ms, Some(0));
        assert_eq!(cfg.item_delay_ms, Some(250));
        assert_eq!(cfg.max_items, Some(500));
        assert_eq!(cfg.policy, Some(ReconcilePolicy::RedoAll));
        assert_eq!(
            cfg.statuses,
            Some(vec![CollectionStatus::Active, CollectionStatus::Paused])
        );
        assert_eq!(
            cfg.categories,
            Some(vec!["NEW".to_string(), "REVIEWED".to_string()])
        );
    }

    #[test]
    fn test_parse_config_rejects_invalid_timeout() {
        let err = parse_config_str("verify_timeout_secs = 0").expect_err("invalid timeout expected");
        assert!(err.to_string().contains("verify_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_large_delay() {
        let err = parse_config_str("page_delay_ms = 60001").expect_err("invalid delay expected");
        assert!(err.to_string().contains("page_delay_ms"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_policy() {
        let err = parse_config_str(r#"policy = "maybe""#).expect_err("invalid policy expected");
        assert!(err.to_string().contains("policy"));
    }

    #[test]
    fn test_parse_config_rejects_unknown_key() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key expected");
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_numeric_values_with_trailing_tokens() {
        let err = parse_config_str("max_items = 4 trailing").expect_err("expected trailing token error");
        assert!(err.to_string().contains("max_items"));
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
item_delay_ms = 100 # be gentle
output_dir = "out#1" # hash inside string
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.item_delay_ms, Some(100));
        assert_eq!(cfg.output_dir, Some(PathBuf::from("out#1")));
    }

    #[test]
    fn test_verbosity_log_level() {
        assert_eq!(VerbositySetting::Default.log_level(), "info");
        assert_eq!(VerbositySetting::Quiet.log_level(), "error");
        assert_eq!(VerbositySetting::Debug.log_level(), "trace");
    }

    #[test]
    fn test_load_config_explicit_missing_file_errors() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml")))
            .expect_err("missing explicit config should fail");
        assert!(err.to_string().contains("here.toml"));
    }
}
