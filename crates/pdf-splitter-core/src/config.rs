use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// One mebibyte, the unit the upload limits are expressed in.
pub const MIB: u64 = 1024 * 1024;

/// Merged files above this size are split (20 MB upload limit).
pub const DEFAULT_MERGE_LIMIT_BYTES: u64 = 20 * MIB;

/// Target size of every split part (18 MB leaves headroom under the limit).
pub const DEFAULT_PART_SIZE_BYTES: u64 = 18 * MIB;

/// Environment variable prefix for configuration overrides.
///
/// Nested keys use `__`, e.g. `PDF_SPLITTER__LIMITS__PART_SIZE_BYTES`.
pub const ENV_PREFIX: &str = "PDF_SPLITTER";

/// How page subsets are serialized when measuring and writing parts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Save streams as they are
    #[default]
    Off,
    /// Always compress streams before saving
    Always,
    /// Compress only when the plain output would exceed the split ceiling
    Fallback,
}

/// Size limits that drive the merge/split decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitLimits {
    /// Merged documents larger than this are split
    #[serde(default = "default_merge_limit_bytes")]
    pub merge_limit_bytes: u64,

    /// Nominal maximum size of each part
    #[serde(default = "default_part_size_bytes")]
    pub part_size_bytes: u64,

    /// Percentage of `part_size_bytes` actually handed to the splitter (1-100)
    #[serde(default = "default_safety_margin_percent")]
    pub safety_margin_percent: u8,

    /// Serializer compression behaviour
    #[serde(default)]
    pub compression: CompressionMode,

    /// Abort planning after this many seconds (0 = no timeout)
    #[serde(default)]
    pub timeout_seconds: u64,
}

const fn default_merge_limit_bytes() -> u64 {
    DEFAULT_MERGE_LIMIT_BYTES
}

const fn default_part_size_bytes() -> u64 {
    DEFAULT_PART_SIZE_BYTES
}

const fn default_safety_margin_percent() -> u8 {
    100
}

impl SplitLimits {
    /// Ceiling passed to the splitter: the part size shrunk by the safety margin.
    ///
    /// The splitter itself always compares against the literal ceiling.
    #[allow(clippy::cast_possible_truncation)]
    pub fn effective_ceiling(&self) -> u64 {
        let scaled =
            u128::from(self.part_size_bytes) * u128::from(self.safety_margin_percent) / 100;
        // scaled <= part_size_bytes because the margin is capped at 100
        scaled.min(u128::from(self.part_size_bytes)) as u64
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    pub fn validate(&self) -> Result<()> {
        if self.merge_limit_bytes == 0 {
            return Err(invalid("limits.merge_limit_bytes", "must be greater than zero"));
        }
        if self.part_size_bytes == 0 {
            return Err(invalid("limits.part_size_bytes", "must be greater than zero"));
        }
        if !(1..=100).contains(&self.safety_margin_percent) {
            return Err(invalid(
                "limits.safety_margin_percent",
                "must be between 1 and 100",
            ));
        }
        if self.effective_ceiling() == 0 {
            return Err(invalid(
                "limits.safety_margin_percent",
                "leaves a zero-byte ceiling",
            ));
        }
        Ok(())
    }
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self {
            merge_limit_bytes: default_merge_limit_bytes(),
            part_size_bytes: default_part_size_bytes(),
            safety_margin_percent: default_safety_margin_percent(),
            compression: CompressionMode::default(),
            timeout_seconds: 0,
        }
    }
}

/// Measurement cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memoize size measurements in memory
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached measurements
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,

    /// Entry TTL in seconds (0 = no expiry)
    #[serde(default)]
    pub ttl_seconds: u64,
}

const fn default_true() -> bool {
    true
}

const fn default_max_entries() -> u64 {
    10_000
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            ttl_seconds: 0,
        }
    }
}

/// Output file naming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// File name of the merged document
    #[serde(default = "default_merged_file_name")]
    pub merged_file_name: String,

    /// Prefix of split part files (`<prefix><index>.pdf`)
    #[serde(default = "default_part_prefix")]
    pub part_prefix: String,
}

fn default_merged_file_name() -> String {
    "merged.pdf".to_string()
}

fn default_part_prefix() -> String {
    "part_".to_string()
}

impl OutputConfig {
    pub fn part_file_name(&self, index: usize) -> String {
        format!("{}{index}.pdf", self.part_prefix)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            merged_file_name: default_merged_file_name(),
            part_prefix: default_part_prefix(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Merge and split size limits
    #[serde(default)]
    pub limits: SplitLimits,

    /// Measurement cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Output naming
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::ConfigLoad(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations, layered lowest to highest priority:
    /// `~/.config/pdf-splitter/config.toml`, `./config.toml`, then
    /// `PDF_SPLITTER__*` environment variables.
    pub fn load() -> Self {
        match Self::load_layered() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    fn load_layered() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(config_dir) = crate::util::config_dir() {
            let user_config = config_dir.join("pdf-splitter").join("config.toml");
            tracing::debug!("Looking for config at {}", user_config.display());
            builder = builder.add_source(config::File::from(user_config).required(false));
        }

        builder = builder
            .add_source(config::File::from(Path::new("config.toml")).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder
            .build()
            .and_then(|settings| settings.try_deserialize::<Self>())
            .map_err(|e| Error::ConfigLoad(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.validate()?;
        if self.output.merged_file_name.trim().is_empty() {
            return Err(invalid("output.merged_file_name", "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> Error {
    Error::ConfigInvalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
