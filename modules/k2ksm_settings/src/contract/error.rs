//! Contract error types for the settings registry
//!
//! Every precondition violation of a registry, store or schema operation is
//! reported through [`RegistryError`]; nothing is silently ignored.

use super::model::SessionId;
use std::path::PathBuf;

/// Convenience alias used throughout the crate
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Settings registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Operation needs the registry to still be open
    #[error("Can not {operation}, settings finalized")]
    Finalized {
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Argument list is not made of `lvalue value` pairs
    #[error("Arguments must have an even number of items, got {count}")]
    OddArgumentCount { count: usize },

    /// Argument lvalue is not of the form `module.setting`
    #[error("Argument '{lvalue}' is not of the form module.setting")]
    MalformedArgument { lvalue: String },

    #[error("Module {module} already registered")]
    AlreadyRegistered { module: String },

    /// Registered schema or pre-built store does not fit the module
    #[error("Schema mismatch for module {module}: {details}")]
    SchemaMismatch { module: String, details: String },

    /// Schema declaration is internally inconsistent
    #[error("Invalid schema for module {module}: {details}")]
    InvalidSchema { module: String, details: String },

    #[error("Module {module} is not registered")]
    UnknownModule { module: String },

    #[error("Setting {module}.{setting} is not recognized")]
    UnknownSetting { module: String, setting: String },

    #[error("Value {value} is invalid for setting {module}.{setting}")]
    InvalidValue {
        module: String,
        setting: String,
        value: String,
    },

    #[error("Setting {module}.{setting} can not be changed after finalize")]
    ImmutableSetting { module: String, setting: String },

    #[error("Setting {module}.{setting} is required and can not be reset")]
    RequiredSetting { module: String, setting: String },

    #[error("Setting {module}.{setting} is server-wide and can not be set per session")]
    NotPerSession { module: String, setting: String },

    /// Required settings still unset when finalizing
    #[error("Required settings missing: {}", missing.join(", "))]
    MissingRequired {
        /// `module.setting` names
        missing: Vec<String>,
    },

    #[error("Session ID {0} already exists")]
    DuplicateSession(SessionId),

    #[error("Session ID 0 is reserved for server-wide settings")]
    ReservedSession,

    #[error("Session ID {0} does not exist")]
    UnknownSession(SessionId),

    #[error("Can not read configuration file {}: {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },
}

impl RegistryError {
    pub(crate) fn unknown_setting(module: &str, setting: &str) -> Self {
        Self::UnknownSetting {
            module: module.to_string(),
            setting: setting.to_string(),
        }
    }

    pub(crate) fn invalid_value(module: &str, setting: &str, value: impl ToString) -> Self {
        Self::InvalidValue {
            module: module.to_string(),
            setting: setting.to_string(),
            value: value.to_string(),
        }
    }
}
