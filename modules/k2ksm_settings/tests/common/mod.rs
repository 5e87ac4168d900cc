//! Common test schemas and helpers
#![allow(dead_code)]

use k2ksm_settings::{DeclaredSchema, ModuleSchema, SettingSpec, Validator, ValueKind};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;

pub fn print_test_header(test_name: &str, purpose: &str) {
    println!("\n🧪 TEST: {}", test_name);
    println!("📋 PURPOSE: {}", purpose);
}

pub fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// `moduleA` recognizes only `settingX`, an integer
pub fn module_a() -> Arc<dyn ModuleSchema> {
    let schema = DeclaredSchema::builder("moduleA")
        .setting(
            "settingX",
            SettingSpec::new(ValueKind::Integer, "Any integer")
                .validator(Validator::plain(|v| v.is_i64())),
        )
        .build()
        .expect("moduleA schema");
    Arc::new(schema)
}

/// Authenticator-like module with per-session and runtime-changeable settings
///
/// - `Window` integer 1..=10, per session, mutable, default 3
/// - `Issuer` text, server-wide, immutable, default "k2ksm"
/// - `Digits` integer, server-wide, mutable, default 6
pub fn totp() -> Arc<dyn ModuleSchema> {
    let schema = DeclaredSchema::builder("TOTP")
        .setting(
            "Window",
            SettingSpec::new(ValueKind::Integer, "Accepted time steps around now")
                .per_session()
                .mutable()
                .default_value(3)
                .validator(Validator::plain(|v| {
                    v.as_i64().is_some_and(|n| (1..=10).contains(&n))
                })),
        )
        .setting(
            "Issuer",
            SettingSpec::new(ValueKind::Text, "Issuer shown to users").default_value("k2ksm"),
        )
        .setting(
            "Digits",
            SettingSpec::new(ValueKind::Integer, "Code length")
                .mutable()
                .default_value(6),
        )
        .build()
        .expect("TOTP schema");
    Arc::new(schema)
}

/// Same settings as [`totp`], but every one of them mutable and unchecked
pub fn lenient_totp() -> Arc<dyn ModuleSchema> {
    let schema = DeclaredSchema::builder("TOTP")
        .setting(
            "Window",
            SettingSpec::new(ValueKind::Integer, "Any window")
                .per_session()
                .mutable()
                .default_value(3),
        )
        .setting(
            "Issuer",
            SettingSpec::new(ValueKind::Text, "Any issuer")
                .mutable()
                .default_value("k2ksm"),
        )
        .setting(
            "Digits",
            SettingSpec::new(ValueKind::Integer, "Any length")
                .mutable()
                .default_value(6),
        )
        .build()
        .expect("lenient TOTP schema");
    Arc::new(schema)
}

/// Module with a required setting that has no default
pub fn vault() -> Arc<dyn ModuleSchema> {
    let schema = DeclaredSchema::builder("Vault")
        .setting(
            "KeyPath",
            SettingSpec::new(ValueKind::Text, "Path to the master key").required(),
        )
        .setting(
            "Cache",
            SettingSpec::new(ValueKind::Bool, "Cache unwrapped keys").default_value(true),
        )
        .build()
        .expect("Vault schema");
    Arc::new(schema)
}

/// INI file with the given contents, removed when dropped
pub fn ini_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

/// In-memory sink for formatted `tracing` output
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Subscriber writing every event, at any level, into this buffer
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        let sink = self.clone();
        tracing_subscriber::registry().with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(move || sink.clone()),
        )
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
