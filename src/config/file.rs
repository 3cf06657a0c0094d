use serde::Deserialize;
use std::path::{Path, PathBuf};

use mt_hid::calibration::DEFAULT_REMOVAL_PERCENTAGE;
use mt_hid::usage::DEVICE_MODE_MULTI_INPUT;

const DEFAULT_DEVICE_NAME: &str = "mt-hid digitizer";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub descriptor: Option<PathBuf>,
    #[serde(default = "default_removal_percentage")]
    pub removal_percentage: u8,
    #[serde(default = "default_input_mode")]
    pub input_mode: i32,
    #[serde(default)]
    pub uinput: bool,
    #[serde(default)]
    pub quiet: bool,
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            descriptor: None,
            removal_percentage: DEFAULT_REMOVAL_PERCENTAGE,
            input_mode: DEVICE_MODE_MULTI_INPUT,
            uinput: false,
            quiet: false,
            device_name: DEFAULT_DEVICE_NAME.into(),
        }
    }
}

fn default_removal_percentage() -> u8 {
    DEFAULT_REMOVAL_PERCENTAGE
}

fn default_input_mode() -> i32 {
    DEVICE_MODE_MULTI_INPUT
}

fn default_device_name() -> String {
    DEFAULT_DEVICE_NAME.into()
}

pub fn parse(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_from_path(path: &Path) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse(&content) {
        Ok(config) => {
            log::debug!("Loaded config from {}", path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("Failed to parse {}: {}", path.display(), e);
            None
        }
    }
}

pub fn load_from_default_paths() -> Option<FileConfig> {
    for path in default_config_paths() {
        if path.exists() {
            if let Some(config) = load_from_path(&path) {
                return Some(config);
            }
        }
    }
    None
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("mt-hid.toml"));

    if let Ok(home) = std::env::var("HOME") {
        paths.push(PathBuf::from(home).join(".config").join("mt-hid.toml"));
    }

    paths
}
