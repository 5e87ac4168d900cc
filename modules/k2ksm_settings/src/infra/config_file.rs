//! INI configuration file reader
//!
//! Sections name modules and keys name settings:
//!
//! ```ini
//! [K2KSM]
//! TestMode=true
//!
//! [TOTP]
//! Window.Size=3
//! ```
//!
//! Keys outside of any section belong to no module and are skipped with a
//! warning.

use crate::contract::{RegistryError, RegistryResult};
use crate::domain::staging::RawSetting;
use ini::Ini;
use std::path::Path;

/// Read every `module.setting = value` entry of an INI file, in file order
pub fn read_config_file(path: &Path) -> RegistryResult<Vec<RawSetting>> {
    let conf = Ini::load_from_file(path).map_err(|source| RegistryError::ConfigFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(entries(&conf))
}

/// Same as [`read_config_file`] for an in-memory document
pub fn parse_config_str(text: &str) -> Result<Vec<RawSetting>, ini::Error> {
    let conf = Ini::load_from_str(text).map_err(ini::Error::Parse)?;
    Ok(entries(&conf))
}

fn entries(conf: &Ini) -> Vec<RawSetting> {
    let mut entries = Vec::new();
    for (section, properties) in conf.iter() {
        let Some(module) = section else {
            for (key, _) in properties.iter() {
                tracing::warn!(setting = key, "Ignoring configuration entry outside of a module section");
            }
            continue;
        };

        for (setting, value) in properties.iter() {
            entries.push(RawSetting {
                module: module.to_string(),
                setting: setting.to_string(),
                value: value.to_string(),
            });
        }
    }
    entries
}
