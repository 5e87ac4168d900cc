//! Reusable setting validators

use crate::contract::{SettingsSnapshot, Validator};
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value;

/// Whether a boolean setting is on in the snapshot. Missing counts as off.
pub fn flag_enabled(snapshot: &SettingsSnapshot, module: &str, setting: &str) -> bool {
    snapshot
        .get(module)
        .and_then(|settings| settings.get(setting))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Integers within `min..=max`
pub fn integer_range(min: i64, max: i64) -> Validator {
    Validator::plain(move |value| value.as_i64().is_some_and(|n| (min..=max).contains(&n)))
}

/// Integers zero or above
pub fn non_negative() -> Validator {
    integer_range(0, i64::MAX)
}

/// Non-empty text
pub fn non_empty_text() -> Validator {
    Validator::plain(|value| value.as_str().is_some_and(|s| !s.trim().is_empty()))
}

/// ISO 8601 combined date and time, such as `2014-05-15T20:00:00Z`
///
/// The UTC offset may be left out.
pub fn iso8601_datetime() -> Validator {
    Validator::plain(|value| value.as_str().is_some_and(is_datetime))
}

fn is_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Accept a value only while another module's boolean setting is on, then
/// apply `inner` to the value itself
pub fn requires_flag(module: &'static str, setting: &'static str, inner: Validator) -> Validator {
    Validator::contextual(move |value, snapshot| {
        flag_enabled(snapshot, module, setting) && inner.check(value, snapshot)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot_with(module: &str, setting: &str, value: Value) -> SettingsSnapshot {
        let mut snapshot = SettingsSnapshot::new();
        snapshot
            .entry(module.to_string())
            .or_default()
            .insert(setting.to_string(), value);
        snapshot
    }

    #[test]
    fn test_integer_range() {
        let validator = integer_range(1, 10);
        let ctx = SettingsSnapshot::new();
        assert!(validator.check(&json!(1), &ctx));
        assert!(validator.check(&json!(10), &ctx));
        assert!(!validator.check(&json!(0), &ctx));
        assert!(!validator.check(&json!(11), &ctx));
        assert!(!validator.check(&json!("5"), &ctx));
    }

    #[test]
    fn test_non_empty_text() {
        let validator = non_empty_text();
        let ctx = SettingsSnapshot::new();
        assert!(validator.check(&json!("x"), &ctx));
        assert!(!validator.check(&json!("  "), &ctx));
        assert!(!validator.check(&json!(1), &ctx));
    }

    #[test]
    fn test_iso8601_datetime() {
        let validator = iso8601_datetime();
        let ctx = SettingsSnapshot::new();
        for text in [
            "2014-05-15T20:00:00Z",
            "2014-05-15T20:00:00+02:00",
            "2014-05-15T20:00:00",
            "2014-05-15T20:00:00.250",
        ] {
            assert!(validator.check(&json!(text), &ctx), "{text}");
        }
        for text in ["yesterday", "2014-13-01T00:00:00Z", "2014-05-15", ""] {
            assert!(!validator.check(&json!(text), &ctx), "{text}");
        }
        assert!(!validator.check(&json!(1_400_000_000), &ctx));
    }

    #[test]
    fn test_flag_enabled() {
        let snapshot = snapshot_with("K2KSM", "TestMode", json!(true));
        assert!(flag_enabled(&snapshot, "K2KSM", "TestMode"));
        assert!(!flag_enabled(&snapshot, "K2KSM", "Other"));
        assert!(!flag_enabled(&snapshot, "TOTP", "TestMode"));

        let snapshot = snapshot_with("K2KSM", "TestMode", json!("true"));
        assert!(!flag_enabled(&snapshot, "K2KSM", "TestMode"));
    }

    #[test]
    fn test_requires_flag() {
        let validator = requires_flag("K2KSM", "TestMode", non_negative());

        let off = snapshot_with("K2KSM", "TestMode", json!(false));
        assert!(!validator.check(&json!(5), &off));

        let on = snapshot_with("K2KSM", "TestMode", json!(true));
        assert!(validator.check(&json!(5), &on));
        assert!(!validator.check(&json!(-5), &on));
    }
}
