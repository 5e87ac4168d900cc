//! Settings of the K2KSM server itself

use crate::contract::{DeclaredSchema, RegistryResult, SettingSpec, ValueKind};
use crate::domain::validation::{iso8601_datetime, non_negative, requires_flag};

/// Module ID of the K2KSM server
pub const MODULE: &str = "K2KSM";

pub const TEST_MODE: &str = "TestMode";
pub const SERVER_PRIVATE: &str = "ServerPrivate";
pub const OVERRIDE_COUNTER: &str = "OverrideCounter";
pub const OVERRIDE_TIMER: &str = "OverrideTimer";

/// K2KSM server schema
///
/// `TestMode` and `ServerPrivate` must be chosen at startup. The override
/// settings are only accepted while `TestMode` is on.
pub fn core_schema() -> RegistryResult<DeclaredSchema> {
    DeclaredSchema::builder(MODULE)
        .setting(
            TEST_MODE,
            SettingSpec::new(
                ValueKind::Bool,
                "If true, this server is running in test mode, and the Override* \
                 settings can be set. Never run test mode in production.",
            )
            .required(),
        )
        .setting(
            SERVER_PRIVATE,
            SettingSpec::new(
                ValueKind::Bool,
                "If true, this is the private side of the server. Otherwise, this \
                 is the public-facing server.",
            )
            .required(),
        )
        .setting(
            OVERRIDE_COUNTER,
            SettingSpec::new(
                ValueKind::Integer,
                "Used by authentication modules that require a counter. If set, the \
                 value is used as is and does not auto-increment. Only settable in \
                 test mode.",
            )
            .mutable()
            .validator(requires_flag(MODULE, TEST_MODE, non_negative())),
        )
        .setting(
            OVERRIDE_TIMER,
            SettingSpec::new(
                ValueKind::Text,
                "Used by authentication modules that require a time. If set, the \
                 value is used as is and does not advance. ISO 8601 combined format, \
                 for example 2014-05-15T20:00:00Z. Only settable in test mode.",
            )
            .mutable()
            .validator(requires_flag(MODULE, TEST_MODE, iso8601_datetime())),
        )
        .build()
}
