use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::output::is_valid_list_name;
use crate::pipeline::ConversionOptions;

pub const CONFIG_FILE_NAME: &str = "asciivid.json";

/// Configuration preset defining output size and frame thinning
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Preset {
    pub width: u32,
    #[serde(default = "default_skip")]
    pub skip: usize,
}

fn default_skip() -> usize {
    1
}

fn default_list_name() -> String {
    "frames".to_string()
}

/// Application configuration with presets
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub presets: HashMap<String, Preset>,
    pub default_preset: String,
    /// Array name used when none is given on the command line
    #[serde(default = "default_list_name")]
    pub list_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let presets = [
            ("small", Preset { width: 60, skip: 2 }),
            ("default", Preset { width: 100, skip: 1 }),
            ("large", Preset { width: 200, skip: 1 }),
        ];
        Self {
            presets: presets.into_iter().map(|(name, preset)| (name.to_string(), preset)).collect(),
            default_preset: "default".to_string(),
            list_name: default_list_name(),
        }
    }
}

impl AppConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let cfg: AppConfig = serde_json::from_str(text).context("parsing config json")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in config file {}", path.display()))
    }

    /// Where a config file is looked for, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut tried = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push("asciivid");
            d.push(CONFIG_FILE_NAME);
            tried.push(d);
        }
        tried.push(PathBuf::from(CONFIG_FILE_NAME));
        tried
    }

    /// Load the first config file that exists, falling back to built-in defaults.
    pub fn load() -> Result<Self> {
        for p in Self::search_paths() {
            if p.exists() {
                log::info!("using config {}", p.display());
                return Self::from_file(&p);
            }
        }
        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if !self.presets.contains_key(&self.default_preset) {
            bail!("default_preset '{}' is not one of the configured presets", self.default_preset);
        }
        for (name, preset) in &self.presets {
            if preset.width == 0 || preset.skip == 0 {
                bail!("preset '{}' needs a width and skip of at least 1", name);
            }
        }
        if !is_valid_list_name(&self.list_name) {
            bail!("list_name '{}' is not a valid JavaScript identifier", self.list_name);
        }
        Ok(())
    }

    pub fn preset(&self, name: &str) -> Result<&Preset> {
        self.presets.get(name).ok_or_else(|| anyhow!("Missing preset '{}' in config", name))
    }

    /// Conversion options seeded from a preset.
    pub fn options_from_preset(&self, name: &str) -> Result<ConversionOptions> {
        let preset = self.preset(name)?;
        Ok(ConversionOptions::default().with_width(preset.width).with_skip(preset.skip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_defaults_match_cli_defaults() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        let opts = cfg.options_from_preset(&cfg.default_preset).unwrap();
        assert_eq!(opts, ConversionOptions::default());
        assert_eq!(cfg.list_name, "frames");
    }

    #[test]
    fn json_fills_in_optional_fields() {
        let cfg = AppConfig::from_json(r#"{"presets":{"tiny":{"width":20}},"default_preset":"tiny"}"#).unwrap();
        assert_eq!(cfg.preset("tiny").unwrap(), &Preset { width: 20, skip: 1 });
        assert_eq!(cfg.list_name, "frames");
        assert!(cfg.preset("huge").is_err());
    }

    #[test]
    fn inconsistent_configs_are_rejected() {
        assert!(AppConfig::from_json(r#"{"presets":{"a":{"width":20}},"default_preset":"b"}"#).is_err());
        assert!(AppConfig::from_json(r#"{"presets":{"a":{"width":0}},"default_preset":"a"}"#).is_err());
        assert!(AppConfig::from_json(r#"{"presets":{"a":{"width":5,"skip":0}},"default_preset":"a"}"#).is_err());
        assert!(AppConfig::from_json(r#"{"presets":{"a":{"width":5}},"default_preset":"a","list_name":"1x"}"#).is_err());
    }

    #[test]
    fn reads_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"presets":{{"wide":{{"width":240,"skip":3}}}},"default_preset":"wide","list_name":"clip"}}"#).unwrap();
        let cfg = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.list_name, "clip");
        let opts = cfg.options_from_preset("wide").unwrap();
        assert_eq!((opts.width, opts.skip, opts.num_frames), (240, 3, None));
    }
}
