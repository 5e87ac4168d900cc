//! K2KSM Settings Registry
//!
//! Modules of the K2KSM authentication server declare typed, validated,
//! optionally session-scoped settings through a [`ModuleSchema`]. Raw values
//! from the command line and the configuration file are staged until the
//! owning module registers, then claimed into that module's store. After
//! [`SettingsRegistry::finalize`] only mutable settings can change.

// Public exports
pub mod contract;
pub use contract::{
    DeclaredSchema, ModuleSchema, RegistryError, RegistryResult, Scope, SessionId,
    SettingSpec, SettingsAccess, SettingsSnapshot, Validator, ValueKind, SERVER_SESSION,
};

pub mod domain;
pub use domain::{SettingsRegistry, SettingsStore};

pub mod config;
pub use config::{Config, LogConfig, DEFAULT_CONFIG_PATH};

pub mod infra;
pub use infra::Diagnostics;

pub mod schemas;
