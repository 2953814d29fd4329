//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.aethalometer.toml` files.

use crate::cli::Frequency;
use crate::schema::{InstrumentModel, DEFAULT_CHANNEL};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".aethalometer.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Averaging settings.
    #[serde(default)]
    pub averaging: AveragingConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory searched for the newest data file.
    #[serde(default = "default_data_path")]
    pub data_path: String,

    /// Suffix of data files in `data_path`.
    #[serde(default = "default_file_ext")]
    pub file_ext: String,

    /// Instrument model of the data files.
    #[serde(default)]
    pub model: InstrumentModel,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            file_ext: default_file_ext(),
            model: InstrumentModel::default(),
            verbose: false,
        }
    }
}

fn default_data_path() -> String {
    ".".to_string()
}

fn default_file_ext() -> String {
    ".dat".to_string()
}

/// Averaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AveragingConfig {
    /// Averaging frequency, or `raw` for no averaging.
    #[serde(default = "default_freq")]
    pub freq: Frequency,

    /// Stride in cadence units. Defaults per cadence when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,

    /// Fractional digits kept in averages.
    #[serde(default)]
    pub decimals: u32,

    /// Channel summarised after averaging.
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            freq: default_freq(),
            interval: None,
            decimals: 0,
            channel: default_channel(),
        }
    }
}

fn default_freq() -> Frequency {
    Frequency::Hourly
}

fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

impl AveragingConfig {
    /// Stride to use: the configured interval or the cadence default.
    pub fn effective_interval(&self) -> u32 {
        match (self.interval, self.freq.cadence()) {
            (Some(n), _) if n > 0 => n,
            (_, Some(cadence)) => cadence.default_step(),
            (_, None) => 1,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values the user actually passed override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(model) = args.model {
            self.general.model = model;
        }

        if let Some(freq) = args.freq {
            self.averaging.freq = freq;
        }
        if let Some(ilength) = args.ilength {
            self.averaging.interval = Some(ilength);
        }
        if let Some(decimals) = args.decimals {
            self.averaging.decimals = decimals;
        }
        if let Some(ref channel) = args.bckey {
            self.averaging.channel = channel.clone();
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Args, OutputFormat};

    fn make_args() -> Args {
        Args {
            files: Vec::new(),
            config: None,
            model: None,
            freq: None,
            ilength: None,
            intervals: None,
            bckey: None,
            decimals: None,
            format: OutputFormat::Csv,
            output: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.model, InstrumentModel::Ae33);
        assert_eq!(config.general.file_ext, ".dat");
        assert_eq!(config.averaging.freq, Frequency::Hourly);
        assert_eq!(config.averaging.channel, "BC6");
        assert_eq!(config.averaging.effective_interval(), 1);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
data_path = "/data/aeth"
file_ext = ".csv"
model = "AE31"

[averaging]
freq = "secondly"
decimals = 2
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.data_path, "/data/aeth");
        assert_eq!(config.general.file_ext, ".csv");
        assert_eq!(config.general.model, InstrumentModel::Ae31);
        assert_eq!(config.averaging.freq, Frequency::Secondly);
        assert_eq!(config.averaging.decimals, 2);
        // Unset interval falls back to the cadence default.
        assert_eq!(config.averaging.effective_interval(), 10);
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let toml_content = "[general]\nmodel = \"AE52\"\n";
        assert!(toml::from_str::<Config>(toml_content).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config::default();
        config.averaging.interval = Some(3);

        let mut args = make_args();
        config.merge_with_args(&args);
        assert_eq!(config.averaging.effective_interval(), 3);
        assert_eq!(config.averaging.freq, Frequency::Hourly);

        args.model = Some(InstrumentModel::Ae31);
        args.freq = Some(Frequency::Raw);
        args.ilength = Some(4);
        args.bckey = Some("bb".to_string());
        config.merge_with_args(&args);

        assert_eq!(config.general.model, InstrumentModel::Ae31);
        assert_eq!(config.averaging.freq, Frequency::Raw);
        assert_eq!(config.averaging.effective_interval(), 4);
        assert_eq!(config.averaging.channel, "bb");
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let config: Config = toml::from_str("[general]\nverbose = true\n").unwrap();
        let mut args = make_args();
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[averaging]"));
        assert!(toml_str.contains("model = \"AE33\""));

        let round: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(round.averaging.freq, Frequency::Hourly);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[averaging]\ninterval = 4\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.averaging.interval, Some(4));
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }
}
