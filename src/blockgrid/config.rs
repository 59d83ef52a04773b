use crate::error::{BlockError, Result};
use crate::model::{BlockDefaults, DEFAULT_STATUS, DEFAULT_TITLE};
use crate::persist::DEFAULT_SLOT_KEY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

const CONFIG_FILENAME: &str = "config.json";

pub const CONFIG_KEYS: [&str; 4] = ["slot_key", "default_title", "default_status", "pretty_export"];

/// Configuration for blockgrid, stored in `<data dir>/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockgridConfig {
    /// Name of the slot holding the collection (`<data dir>/<slot_key>.json`)
    #[serde(default = "default_slot_key")]
    pub slot_key: String,

    #[serde(default = "default_title")]
    pub default_title: String,

    #[serde(default = "default_status")]
    pub default_status: String,

    /// Indent exported documents
    #[serde(default = "default_pretty_export")]
    pub pretty_export: bool,
}

fn default_slot_key() -> String {
    DEFAULT_SLOT_KEY.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_status() -> String {
    DEFAULT_STATUS.to_string()
}

fn default_pretty_export() -> bool {
    true
}

impl Default for BlockgridConfig {
    fn default() -> Self {
        Self {
            slot_key: default_slot_key(),
            default_title: default_title(),
            default_status: default_status(),
            pretty_export: default_pretty_export(),
        }
    }
}

impl BlockgridConfig {
    /// Reads `<dir>/config.json`, falling back to defaults when there is none.
    /// A file that does not parse or holds an invalid value is a
    /// [`BlockError::Config`]; the slot key in particular names a file inside
    /// the data directory and must not be able to point outside it.
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);
        let content = match fs::read_to_string(&config_path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(BlockError::Io(e)),
        };

        let config: BlockgridConfig = serde_json::from_str(&content)
            .map_err(|e| BlockError::Config(format!("{} ({})", config_path.display(), e)))?;
        config
            .validate()
            .map_err(|e| BlockError::Config(format!("{} ({})", config_path.display(), e)))?;
        Ok(config)
    }

    /// Writes `<dir>/config.json`, creating the directory on first use.
    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir).map_err(BlockError::Io)?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content).map_err(BlockError::Io)?;
        Ok(())
    }

    fn validate(&self) -> std::result::Result<(), String> {
        check_slot_key(&self.slot_key)?;
        check_title(&self.default_title)
    }

    pub fn block_defaults(&self) -> BlockDefaults {
        BlockDefaults {
            title: self.default_title.clone(),
            status: self.default_status.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "slot_key" => Some(self.slot_key.clone()),
            "default_title" => Some(self.default_title.clone()),
            "default_status" => Some(self.default_status.clone()),
            "pretty_export" => Some(self.pretty_export.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "slot_key" => {
                check_slot_key(value)?;
                self.slot_key = value.to_string();
            }
            "default_title" => {
                check_title(value)?;
                self.default_title = value.to_string();
            }
            "default_status" => self.default_status = value.to_string(),
            "pretty_export" => {
                self.pretty_export = match value.to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => true,
                    "false" | "no" | "off" | "0" => false,
                    _ => return Err(format!("Invalid boolean '{}'", value)),
                }
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}

fn check_slot_key(value: &str) -> std::result::Result<(), String> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(format!(
            "Invalid slot key '{}': use letters, digits, '_' or '-'",
            value
        ))
    }
}

fn check_title(value: &str) -> std::result::Result<(), String> {
    if value.is_empty() {
        Err("default_title cannot be empty".to_string())
    } else {
        Ok(())
    }
}
