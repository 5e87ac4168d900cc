//! Domain layer - settings storage and the registry lifecycle

pub mod registry;
pub mod staging;
pub mod store;
pub mod validation;

pub use registry::SettingsRegistry;
pub use staging::{RawSetting, Unclaimed};
pub use store::{SettingsStore, WriteContext};
