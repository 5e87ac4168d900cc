//! Contract models for the settings registry
//!
//! Setting values are carried as [`serde_json::Value`]; each declared setting
//! names the [`ValueKind`] its values must have.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Session identifier. `0` is reserved for server-wide scope.
pub type SessionId = u64;

/// Session ID that stands for the server-wide scope
pub const SERVER_SESSION: SessionId = 0;

/// Read-only view of effective server-wide settings: module -> setting -> value
pub type SettingsSnapshot = BTreeMap<String, BTreeMap<String, Value>>;

/// Where a setting value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// Server-wide settings (session ID 0)
    Server,
    /// Settings private to one session
    Session(SessionId),
}

impl Scope {
    /// Map a raw session ID to a scope, treating 0 as server-wide
    pub fn from_id(id: SessionId) -> Self {
        if id == SERVER_SESSION {
            Self::Server
        } else {
            Self::Session(id)
        }
    }

    pub fn id(&self) -> SessionId {
        match self {
            Self::Server => SERVER_SESSION,
            Self::Session(id) => *id,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => write!(f, "server"),
            Self::Session(id) => write!(f, "session {}", id),
        }
    }
}

/// Type of values a setting accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Integer,
    Text,
}

impl ValueKind {
    /// Convert a raw string (command line or config file) into a typed value
    ///
    /// Surrounding whitespace is ignored for booleans and integers; text is
    /// kept as given.
    pub fn parse(&self, raw: &str) -> Option<Value> {
        match self {
            Self::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
            Self::Text => Some(Value::String(raw.to_string())),
        }
    }

    /// Whether a typed value has this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Bool => value.is_boolean(),
            Self::Integer => value.is_i64(),
            Self::Text => value.is_string(),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

pub type PlainCheck = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type ContextCheck = Arc<dyn Fn(&Value, &SettingsSnapshot) -> bool + Send + Sync>;

/// Value check attached to a setting
#[derive(Clone, Default)]
pub enum Validator {
    /// Any value of the declared kind
    #[default]
    Any,
    /// Looks only at the value
    Plain(PlainCheck),
    /// Also sees the effective server-wide settings of every module
    Contextual(ContextCheck),
}

impl Validator {
    pub fn plain<F>(check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Self::Plain(Arc::new(check))
    }

    pub fn contextual<F>(check: F) -> Self
    where
        F: Fn(&Value, &SettingsSnapshot) -> bool + Send + Sync + 'static,
    {
        Self::Contextual(Arc::new(check))
    }

    pub fn check(&self, value: &Value, context: &SettingsSnapshot) -> bool {
        match self {
            Self::Any => true,
            Self::Plain(check) => check(value),
            Self::Contextual(check) => check(value, context),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("Any"),
            Self::Plain(_) => f.write_str("Plain(..)"),
            Self::Contextual(_) => f.write_str("Contextual(..)"),
        }
    }
}

/// Declaration of one setting
#[derive(Debug, Clone)]
pub struct SettingSpec {
    /// Human-readable description
    pub description: String,
    pub kind: ValueKind,
    /// Value may differ per session
    pub per_session: bool,
    /// May be changed after the registry is finalized
    pub mutable: bool,
    /// Must hold a value before finalize succeeds
    pub required: bool,
    /// Value used when nothing is set. Required settings have none.
    pub default: Option<Value>,
    pub validator: Validator,
}

impl SettingSpec {
    /// Server-wide, immutable, optional setting without a default
    pub fn new(kind: ValueKind, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            kind,
            per_session: false,
            mutable: false,
            required: false,
            default: None,
            validator: Validator::Any,
        }
    }

    pub fn per_session(mut self) -> Self {
        self.per_session = true;
        self
    }

    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scope_from_id() {
        assert_eq!(Scope::from_id(0), Scope::Server);
        assert_eq!(Scope::from_id(42), Scope::Session(42));
        assert_eq!(Scope::Session(42).id(), 42);
        assert_eq!(Scope::Server.id(), SERVER_SESSION);
    }

    #[test]
    fn test_parse_bool() {
        for raw in ["true", "TRUE", "yes", "on", "1", " true "] {
            assert_eq!(ValueKind::Bool.parse(raw), Some(json!(true)), "{raw}");
        }
        for raw in ["false", "No", "off", "0"] {
            assert_eq!(ValueKind::Bool.parse(raw), Some(json!(false)), "{raw}");
        }
        assert_eq!(ValueKind::Bool.parse("maybe"), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(ValueKind::Integer.parse("5"), Some(json!(5)));
        assert_eq!(ValueKind::Integer.parse("-17"), Some(json!(-17)));
        assert_eq!(ValueKind::Integer.parse("5.5"), None);
        assert_eq!(ValueKind::Integer.parse("five"), None);
    }

    #[test]
    fn test_parse_text_keeps_content() {
        assert_eq!(ValueKind::Text.parse("a.b=c"), Some(json!("a.b=c")));
        assert_eq!(
            ValueKind::Text.parse("  padded value  "),
            Some(json!("  padded value  "))
        );
        assert_eq!(ValueKind::Integer.parse(" 42 "), Some(json!(42)));
    }

    #[test]
    fn test_kind_matches() {
        assert!(ValueKind::Integer.matches(&json!(3)));
        assert!(!ValueKind::Integer.matches(&json!("3")));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
        assert!(ValueKind::Bool.matches(&json!(false)));
        assert!(ValueKind::Text.matches(&json!("x")));
    }

    #[test]
    fn test_contextual_validator_sees_snapshot() {
        let validator = Validator::contextual(|_, ctx| {
            ctx.get("K2KSM")
                .and_then(|m| m.get("TestMode"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        });

        let mut ctx = SettingsSnapshot::new();
        assert!(!validator.check(&json!(1), &ctx));

        ctx.entry("K2KSM".to_string())
            .or_default()
            .insert("TestMode".to_string(), json!(true));
        assert!(validator.check(&json!(1), &ctx));
    }

    #[test]
    fn test_spec_builder() {
        let spec = SettingSpec::new(ValueKind::Integer, "Window size")
            .per_session()
            .mutable()
            .default_value(3);

        assert!(spec.per_session);
        assert!(spec.mutable);
        assert!(!spec.required);
        assert_eq!(spec.default, Some(json!(3)));
    }
}
