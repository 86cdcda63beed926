use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ebp_script::disasm::{CommandDictionary, DictionaryFile};
use ebp_script::ContainerLayout;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Settings read from `--config`; every key is optional.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PatcherConfig {
    pub log_level: LevelFilter,
    /// Command dictionary used when importing objects.
    pub dictionary: Option<PathBuf>,
    /// Copy the container to `<file>.bak` before growing it.
    pub backup: bool,
    pub layout: ContainerLayout,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            dictionary: None,
            backup: true,
            layout: ContainerLayout::default(),
        }
    }
}

impl PatcherConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let config = toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Loads the YAML dictionary at `path`, or an empty one.
pub fn load_dictionary(path: Option<&Path>) -> Result<CommandDictionary> {
    let Some(path) = path else {
        return Ok(CommandDictionary::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("reading dictionary {}", path.display()))?;
    let file: DictionaryFile =
        serde_yaml::from_str(&text).with_context(|| format!("parsing dictionary {}", path.display()))?;
    let dictionary = CommandDictionary::from(file);
    log::info!("loaded {} command pattern(s) from {}", dictionary.len(), path.display());
    Ok(dictionary)
}
