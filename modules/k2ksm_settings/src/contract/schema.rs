//! Module schema capability
//!
//! Each module describes the settings it recognizes by implementing
//! [`ModuleSchema`]. Only `name`, `settings_list` and `spec` are required;
//! everything else is answered from the [`SettingSpec`] of the setting.
//! [`DeclaredSchema`] is the table-driven implementation most modules use.

use super::error::{RegistryError, RegistryResult};
use super::model::{SettingSpec, SettingsSnapshot};
use serde_json::Value;
use std::collections::BTreeMap;

/// Setting shape of one module
pub trait ModuleSchema: Send + Sync {
    /// Unique, human-readable module ID such as "K2KSM" or "TOTP"
    fn name(&self) -> &str;

    /// Names of every setting this module recognizes
    fn settings_list(&self) -> Vec<&str>;

    /// Declaration of a setting, if recognized
    fn spec(&self, setting: &str) -> Option<&SettingSpec>;

    fn lookup(&self, setting: &str) -> RegistryResult<&SettingSpec> {
        self.spec(setting)
            .ok_or_else(|| RegistryError::unknown_setting(self.name(), setting))
    }

    fn name_valid(&self, setting: &str) -> bool {
        self.spec(setting).is_some()
    }

    fn description(&self, setting: &str) -> RegistryResult<&str> {
        Ok(self.lookup(setting)?.description.as_str())
    }

    fn per_session(&self, setting: &str) -> RegistryResult<bool> {
        Ok(self.lookup(setting)?.per_session)
    }

    fn mutable(&self, setting: &str) -> RegistryResult<bool> {
        Ok(self.lookup(setting)?.mutable)
    }

    fn required(&self, setting: &str) -> RegistryResult<bool> {
        Ok(self.lookup(setting)?.required)
    }

    fn default(&self, setting: &str) -> RegistryResult<Option<Value>> {
        Ok(self.lookup(setting)?.default.clone())
    }

    /// Whether `value` is acceptable for `setting` given the current
    /// server-wide settings of all modules
    fn setting_valid(
        &self,
        setting: &str,
        value: &Value,
        context: &SettingsSnapshot,
    ) -> RegistryResult<bool> {
        let spec = self.lookup(setting)?;
        Ok(spec.kind.matches(value) && spec.validator.check(value, context))
    }

    /// Turn a raw string from arguments or a config file into a typed value
    fn parse_raw(&self, setting: &str, raw: &str) -> RegistryResult<Value> {
        self.lookup(setting)?
            .kind
            .parse(raw)
            .ok_or_else(|| RegistryError::invalid_value(self.name(), setting, raw))
    }
}

/// Schema backed by a table of [`SettingSpec`]s
#[derive(Debug, Clone)]
pub struct DeclaredSchema {
    name: String,
    settings: BTreeMap<String, SettingSpec>,
}

impl DeclaredSchema {
    pub fn builder(name: impl Into<String>) -> DeclaredSchemaBuilder {
        DeclaredSchemaBuilder {
            name: name.into(),
            settings: Vec::new(),
        }
    }
}

impl ModuleSchema for DeclaredSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn settings_list(&self) -> Vec<&str> {
        self.settings.keys().map(String::as_str).collect()
    }

    fn spec(&self, setting: &str) -> Option<&SettingSpec> {
        self.settings.get(setting)
    }
}

/// Collects setting declarations and checks them on [`build`](Self::build)
#[derive(Debug)]
pub struct DeclaredSchemaBuilder {
    name: String,
    settings: Vec<(String, SettingSpec)>,
}

impl DeclaredSchemaBuilder {
    pub fn setting(mut self, name: impl Into<String>, spec: SettingSpec) -> Self {
        self.settings.push((name.into(), spec));
        self
    }

    pub fn build(self) -> RegistryResult<DeclaredSchema> {
        let invalid = |details: String| RegistryError::InvalidSchema {
            module: self.name.clone(),
            details,
        };

        if self.name.is_empty() || self.name.contains('.') {
            return Err(invalid(format!(
                "module name '{}' must be non-empty and must not contain '.'",
                self.name
            )));
        }

        let mut settings = BTreeMap::new();
        for (name, spec) in &self.settings {
            if name.is_empty() {
                return Err(invalid("setting names must be non-empty".to_string()));
            }
            if spec.required && spec.default.is_some() {
                return Err(invalid(format!(
                    "required setting {} must not declare a default",
                    name
                )));
            }
            if let Some(default) = &spec.default {
                if !spec.kind.matches(default) {
                    return Err(invalid(format!(
                        "default {} of {} is not a {} value",
                        default, name, spec.kind
                    )));
                }
            }
            if settings.insert(name.clone(), spec.clone()).is_some() {
                return Err(invalid(format!("setting {} declared twice", name)));
            }
        }

        Ok(DeclaredSchema {
            name: self.name,
            settings,
        })
    }
}
