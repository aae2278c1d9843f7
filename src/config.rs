//! File configuration and CLI precedence.
//!
//! The config file is a flat list of `key = value` lines (TOML-compatible);
//! strings are double-quoted, `#` starts a comment. A CLI flag always wins
//! over the file, and the file wins over built-in defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use albumdl_core::download::constants::{
    CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_DELAY, DEFAULT_SPEED_LIMIT_BYTES, READ_TIMEOUT_SECS,
};
use albumdl_core::download::{ClientSettings, DEFAULT_MAX_ATTEMPTS};
use albumdl_core::scheduler::{MAX_CONCURRENCY, MIN_CONCURRENCY, default_concurrency};
use anyhow::{Context, Result, bail};

use crate::cli::Args;

/// Output directory when neither the CLI nor the config file names one.
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Values read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Base directory for album folders.
    pub output_dir: Option<PathBuf>,
    /// Files downloaded in parallel within an album.
    pub concurrency: Option<usize>,
    /// Attempts per file.
    pub max_retries: Option<u32>,
    /// Per-file speed limit in KiB/s; 0 disables.
    pub speed_limit_kb: Option<u64>,
    /// Minimum delay between requests to one host, in milliseconds.
    pub request_delay_ms: Option<u64>,
    /// HTTP proxy URL.
    pub proxy: Option<String>,
    /// Extract downloaded zip files.
    pub extract_archives: Option<bool>,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Read timeout between body chunks in seconds.
    pub read_timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Validates config values against the CLI ranges.
    pub fn validate(&self) -> Result<()> {
        if let Some(concurrency) = self.concurrency
            && !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency)
        {
            bail!(
                "Invalid config value for `concurrency`: {concurrency}. Expected range: {MIN_CONCURRENCY}..={MAX_CONCURRENCY}"
            );
        }
        if let Some(max_retries) = self.max_retries
            && !(1..=10).contains(&max_retries)
        {
            bail!("Invalid config value for `max_retries`: {max_retries}. Expected range: 1..=10");
        }
        if let Some(delay) = self.request_delay_ms
            && delay > 60_000
        {
            bail!("Invalid config value for `request_delay_ms`: {delay}. Expected range: 0..=60000");
        }
        if let Some(speed) = self.speed_limit_kb
            && speed.checked_mul(1024).is_none()
        {
            bail!("Invalid config value for `speed_limit_kb`: {speed} is too large");
        }
        validate_timeout_secs("connect_timeout_secs", self.connect_timeout_secs)?;
        validate_timeout_secs("read_timeout_secs", self.read_timeout_secs)?;
        Ok(())
    }
}

fn validate_timeout_secs(field: &str, value: Option<u64>) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !(1..=3600).contains(&value) {
        bail!("Invalid config value for `{field}`: {value}. Expected range: 1..=3600");
    }
    Ok(())
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/albumdl/config.toml`
/// 2. `$HOME/.config/albumdl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("albumdl")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("albumdl")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default location is optional.
pub fn load_file_config(explicit: Option<&Path>) -> Result<Option<FileConfig>> {
    if let Some(path) = explicit {
        return read_file_config(path).map(Some);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_file_config(&path).map(Some),
        _ => Ok(None),
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
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
        let line_no = line_index + 1;

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(
                    parse_string_literal(value).with_context(context)?,
                ));
            }
            "concurrency" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.concurrency = Some(usize::try_from(parsed).with_context(context)?);
            }
            "max_retries" => {
                let parsed = parse_integer_u64(value).with_context(context)?;
                cfg.max_retries = Some(u32::try_from(parsed).with_context(context)?);
            }
            "speed_limit_kb" => {
                cfg.speed_limit_kb = Some(parse_integer_u64(value).with_context(context)?);
            }
            "request_delay_ms" => {
                cfg.request_delay_ms = Some(parse_integer_u64(value).with_context(context)?);
            }
            "proxy" => {
                cfg.proxy = Some(parse_string_literal(value).with_context(context)?);
            }
            "extract_archives" => {
                cfg.extract_archives = Some(parse_boolean(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
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

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

/// Effective settings for one run after applying precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub concurrency: usize,
    pub max_attempts: u32,
    pub speed_limit_bytes: u64,
    pub request_delay: Duration,
    pub extract_archives: bool,
    pub client: ClientSettings,
}

impl RunSettings {
    /// CLI flag, then config file, then built-in default.
    #[must_use]
    pub fn resolve(args: &Args, file: Option<&FileConfig>) -> Self {
        let file = file.cloned().unwrap_or_default();

        let speed_limit_bytes = args
            .speed_limit_kb
            .or(file.speed_limit_kb)
            .map_or(DEFAULT_SPEED_LIMIT_BYTES, |kb| kb.saturating_mul(1024));
        let request_delay = args
            .request_delay_ms
            .or(file.request_delay_ms)
            .map_or(DEFAULT_REQUEST_DELAY, Duration::from_millis);

        Self {
            output_dir: args
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            concurrency: args
                .concurrency
                .map(usize::from)
                .or(file.concurrency)
                .unwrap_or_else(default_concurrency),
            max_attempts: args
                .max_retries
                .map(u32::from)
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            speed_limit_bytes,
            request_delay,
            extract_archives: args.extract || file.extract_archives.unwrap_or(false),
            client: ClientSettings {
                connect_timeout: Duration::from_secs(
                    file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
                ),
                read_timeout: Duration::from_secs(
                    file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
                ),
                proxy: args.proxy.clone().or(file.proxy),
            },
        }
    }
}
