mod cli;
mod file;

pub use cli::{Cli, Command};

use std::path::PathBuf;

use file::FileConfig;

/// Merged configuration from CLI args and TOML file.
#[derive(Debug, Clone)]
pub struct Config {
    pub descriptor: Option<PathBuf>,
    pub removal_percentage: u8,
    pub input_mode: i32,
    pub uinput: bool,
    pub quiet: bool,
    pub device_name: String,
}

impl Config {
    /// Load configuration by merging TOML file with CLI overrides.
    pub fn load(cli: &Cli) -> Self {
        let file_config = cli
            .config
            .as_ref()
            .and_then(|p| file::load_from_path(p))
            .or_else(file::load_from_default_paths)
            .unwrap_or_default();
        Self::merge(cli, file_config)
    }

    fn merge(cli: &Cli, file_config: FileConfig) -> Self {
        Self {
            descriptor: cli.descriptor.clone().or(file_config.descriptor),
            removal_percentage: cli.removal_percentage.unwrap_or(file_config.removal_percentage),
            input_mode: cli.input_mode.unwrap_or(file_config.input_mode),
            uinput: cli.uinput || file_config.uinput,
            quiet: cli.quiet || file_config.quiet,
            device_name: cli.device_name.clone().unwrap_or(file_config.device_name),
        }
    }

    /// Check the merged settings for `command`. Output settings only matter
    /// to `replay`.
    pub fn validate(&self, command: &Command) -> Result<(), &'static str> {
        if self.descriptor.is_none() {
            return Err("No descriptor given (--descriptor, MTHID_DESCRIPTOR or config file)");
        }
        if self.removal_percentage > 100 {
            return Err("removal_percentage must be between 0 and 100");
        }
        if matches!(command, Command::Replay { .. }) && self.quiet && !self.uinput {
            return Err("--quiet without --uinput leaves nowhere to send events");
        }
        Ok(())
    }
}
