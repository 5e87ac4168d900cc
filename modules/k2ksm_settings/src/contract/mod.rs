//! Contract layer - public types shared by the registry and its modules
//!
//! Models here carry no registry state; they describe settings, scopes and
//! errors.

pub mod client;
pub mod error;
pub mod model;
pub mod schema;

pub use client::SettingsAccess;
pub use error::{RegistryError, RegistryResult};
pub use model::{
    ContextCheck, PlainCheck, Scope, SessionId, SettingSpec, SettingsSnapshot, Validator,
    ValueKind, SERVER_SESSION,
};
pub use schema::{DeclaredSchema, DeclaredSchemaBuilder, ModuleSchema};
