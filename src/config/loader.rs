//! Configuration loading and management

use crate::constants::{
    CONFIG_FILENAMES, DEFAULT_CACHE_TTL_SECS, DEFAULT_SECTION_SEPARATOR,
    DEFAULT_TEMPLATE_GLOBS,
};
use crate::error::{Error, Result};
use crate::request::Strictness;
use log::debug;
use serde::Deserialize;
use std::path::Path;

/// Longest accepted cache TTL: one week.
const MAX_CACHE_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Engine settings read from the template root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "get_default_template_globs")]
    pub template_globs: Vec<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default = "get_default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default)]
    pub default_strictness: Strictness,
    #[serde(default)]
    pub degraded_fallback: bool,
    #[serde(default = "get_default_section_separator")]
    pub section_separator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_globs: get_default_template_globs(),
            ignore: Vec::new(),
            cache_ttl_secs: get_default_cache_ttl_secs(),
            default_strictness: Strictness::default(),
            degraded_fallback: false,
            section_separator: get_default_section_separator(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.template_globs.is_empty() {
            return Err(Error::ConfigValidation("template_globs must not be empty".into()));
        }
        if self.cache_ttl_secs == 0 {
            return Err(Error::ConfigValidation(
                "cache_ttl_secs must be greater than zero".into(),
            ));
        }
        if self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(Error::ConfigValidation(format!(
                "cache_ttl_secs must not exceed {MAX_CACHE_TTL_SECS}"
            )));
        }
        Ok(())
    }

    /// Loads and validates the config at `template_root`, or returns defaults.
    pub fn load<P: AsRef<Path>>(template_root: P) -> Result<Self> {
        let config = match Config::load_config(template_root)? {
            Some(Config::V1(config)) => config,
            None => {
                debug!("No engine configuration file found, using defaults.");
                EngineConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "schemaVersion")]
pub enum Config {
    #[serde(rename = "v1")]
    V1(EngineConfig),
}

impl Config {
    pub fn load_config<P: AsRef<Path>>(template_root: P) -> Result<Option<Self>> {
        let template_root = template_root.as_ref();

        for config_file_name in CONFIG_FILENAMES.iter() {
            let config_file_path = template_root.join(config_file_name);

            if config_file_path.is_file() {
                debug!("Loading engine configuration from {}", config_file_path.display());
                let content = std::fs::read_to_string(&config_file_path)?;
                let config: Config = if config_file_name.ends_with(".json") {
                    serde_json::from_str(&content).map_err(|e| Error::ParseError {
                        file: config_file_path.clone(),
                        line: e.line().max(1),
                        message: e.to_string(),
                    })?
                } else {
                    serde_yaml::from_str(&content).map_err(|e| Error::ParseError {
                        file: config_file_path.clone(),
                        line: e.location().map(|l| l.line()).unwrap_or(1),
                        message: e.to_string(),
                    })?
                };

                return Ok(Some(config));
            }
        }

        Ok(None)
    }
}

fn get_default_template_globs() -> Vec<String> {
    DEFAULT_TEMPLATE_GLOBS.iter().map(|g| g.to_string()).collect()
}

fn get_default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn get_default_section_separator() -> String {
    DEFAULT_SECTION_SEPARATOR.to_string()
}
