//! Consumer-facing settings access
//!
//! Modules receive a `dyn SettingsAccess` once the server is running, so they
//! can read and adjust their own settings without holding the whole registry.

use super::error::RegistryResult;
use super::model::{Scope, SettingsSnapshot};
use serde_json::Value;

/// Settings access for modules
pub trait SettingsAccess: Send + Sync {
    /// Effective value of a setting in a scope; `None` when unset without default
    fn get(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<Option<Value>>;

    /// Change a setting in a scope
    fn set(&self, module: &str, scope: Scope, setting: &str, value: Value) -> RegistryResult<()>;

    /// Return a setting to its default in a scope
    fn unset(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<()>;

    /// Effective server-wide settings of every registered module
    fn snapshot(&self) -> SettingsSnapshot;
}
