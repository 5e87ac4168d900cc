//! Settings storage for one module in one scope

use crate::contract::{ModuleSchema, RegistryError, RegistryResult, SettingsSnapshot};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Registry state a write is checked against
#[derive(Debug, Clone, Copy)]
pub struct WriteContext<'a> {
    /// Registry has been finalized; only mutable settings may change
    pub finalized: bool,
    /// Effective server-wide settings, for contextual validators
    pub snapshot: &'a SettingsSnapshot,
}

impl<'a> WriteContext<'a> {
    /// Context for writes made before the registry is finalized
    pub fn startup(snapshot: &'a SettingsSnapshot) -> Self {
        Self {
            finalized: false,
            snapshot,
        }
    }
}

/// Typed settings of one module in one scope
///
/// Only values that differ from the schema default are stored; defaults are
/// computed on read.
#[derive(Clone)]
pub struct SettingsStore {
    schema: Arc<dyn ModuleSchema>,
    overrides: BTreeMap<String, Value>,
}

impl SettingsStore {
    pub fn new(schema: Arc<dyn ModuleSchema>) -> Self {
        Self {
            schema,
            overrides: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<dyn ModuleSchema> {
        &self.schema
    }

    pub fn module(&self) -> &str {
        self.schema.name()
    }

    /// Stored override, or the schema default
    pub fn get(&self, setting: &str) -> RegistryResult<Option<Value>> {
        let spec = self.schema.lookup(setting)?;
        Ok(self
            .overrides
            .get(setting)
            .or(spec.default.as_ref())
            .cloned())
    }

    /// Change a setting. A value equal to the default clears the override.
    pub fn set(&mut self, setting: &str, value: Value, ctx: WriteContext<'_>) -> RegistryResult<()> {
        let spec = self.schema.lookup(setting)?;
        if ctx.finalized && !spec.mutable {
            return Err(RegistryError::ImmutableSetting {
                module: self.module().to_string(),
                setting: setting.to_string(),
            });
        }
        if !self.schema.setting_valid(setting, &value, ctx.snapshot)? {
            return Err(RegistryError::invalid_value(self.module(), setting, &value));
        }

        if spec.default.as_ref() == Some(&value) {
            self.overrides.remove(setting);
        } else {
            self.overrides.insert(setting.to_string(), value);
        }
        Ok(())
    }

    /// Return a setting to its default
    pub fn unset(&mut self, setting: &str, ctx: WriteContext<'_>) -> RegistryResult<()> {
        let spec = self.schema.lookup(setting)?;
        if ctx.finalized && !spec.mutable {
            return Err(RegistryError::ImmutableSetting {
                module: self.module().to_string(),
                setting: setting.to_string(),
            });
        }
        if spec.required {
            return Err(RegistryError::RequiredSetting {
                module: self.module().to_string(),
                setting: setting.to_string(),
            });
        }

        self.overrides.remove(setting);
        Ok(())
    }

    /// Number of settings holding a non-default value
    pub fn count(&self) -> usize {
        self.overrides.len()
    }

    /// Whether a setting holds a non-default value
    pub fn is_overridden(&self, setting: &str) -> bool {
        self.overrides.contains_key(setting)
    }

    pub fn overrides(&self) -> &BTreeMap<String, Value> {
        &self.overrides
    }

    /// Every setting that currently has a value, override or default
    pub fn effective(&self) -> BTreeMap<String, Value> {
        let mut values = BTreeMap::new();
        for setting in self.schema.settings_list() {
            if let Ok(Some(value)) = self.get(setting) {
                values.insert(setting.to_string(), value);
            }
        }
        values
    }

    /// Required settings with no value
    pub fn missing_required(&self) -> Vec<String> {
        self.schema
            .settings_list()
            .into_iter()
            .filter(|setting| {
                self.schema.required(setting).unwrap_or(false) && !self.is_overridden(setting)
            })
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("module", &self.module())
            .field("overrides", &self.overrides)
            .finish()
    }
}
