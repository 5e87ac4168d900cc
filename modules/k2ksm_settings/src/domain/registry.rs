//! Settings registry - owner of all configuration state
//!
//! Typical life-cycle:
//!
//! 1. The server creates the registry and loads raw settings from the command
//!    line and the configuration file. Modules are not known yet, so the raw
//!    values are staged by module name.
//! 2. Each module registers its [`ModuleSchema`]. Staged values for that
//!    module are parsed, validated and moved into its server-wide store.
//! 3. The server calls [`SettingsRegistry::finalize`]. Staged values nobody
//!    claimed are reported and dropped, and from then on only mutable settings
//!    may change.
//! 4. Sessions come and go; per-session settings live in per-session stores
//!    created on first write.

use super::staging::{parse_arguments, RawSetting, Unclaimed};
use super::store::{SettingsStore, WriteContext};
use crate::config::Config;
use crate::contract::{
    ModuleSchema, RegistryError, RegistryResult, Scope, SessionId, SettingsAccess,
    SettingsSnapshot, SERVER_SESSION,
};
use crate::infra::config_file::read_config_file;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn, Span};

type StagedSettings = BTreeMap<String, BTreeMap<String, String>>;

/// Where a staged setting goes when its module can not claim it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnFailure {
    /// Drop it from staging and name it in a warning at finalize
    Reject,
    /// Leave it staged
    Keep,
}

#[derive(Default)]
struct RegistryState {
    finalized: bool,
    /// Raw settings whose module has not registered
    unclaimed: Unclaimed,
    /// Raw settings a registered module rejected, reported at finalize
    rejected: StagedSettings,
    /// Server-wide store per registered module
    server: BTreeMap<String, SettingsStore>,
    /// Session ID -> module -> store, created lazily per module
    sessions: HashMap<SessionId, BTreeMap<String, SettingsStore>>,
    config_args: Option<Vec<String>>,
    config_path: Option<PathBuf>,
}

/// Process-wide settings registry
///
/// All methods take `&self`; share it as `Arc<SettingsRegistry>`.
pub struct SettingsRegistry {
    state: RwLock<RegistryState>,
    span: Span,
}

impl Default for SettingsRegistry {
    fn default() -> Self {
        Self::new("k2ksm")
    }
}

impl SettingsRegistry {
    /// Create an empty registry. `name_prefix` tags its diagnostics.
    pub fn new(name_prefix: &str) -> Self {
        let span = tracing::info_span!("settings", prefix = %name_prefix);
        span.in_scope(|| debug!("Settings registry instantiated"));
        Self {
            state: RwLock::new(RegistryState::default()),
            span,
        }
    }

    /// Create a registry, load `args`, then load `config.config_path`
    pub fn load<I, S>(config: &Config, args: I) -> RegistryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let registry = Self::new(&config.name_prefix);
        registry.load_arguments(args)?;
        registry.load_config_file(&config.config_path)?;
        Ok(registry)
    }

    // ===== Loading =====

    /// Stage `module.setting value` pairs
    ///
    /// Later values for the same setting replace earlier ones, across calls and
    /// across config files. A malformed list stages nothing.
    pub fn load_arguments<I, S>(&self, tokens: I) -> RegistryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let _span = self.span.enter();
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();

        let mut state = self.state.write();
        if state.finalized {
            return Err(RegistryError::Finalized {
                operation: "load new arguments",
            });
        }

        info!(count = tokens.len(), "Parsing command-line arguments");
        let parsed = parse_arguments(&tokens)?;
        state.stage_all(parsed);
        state.config_args = Some(tokens);
        Ok(())
    }

    /// Stage every entry of an INI file (`[module]` sections, `setting=value`)
    pub fn load_config_file(&self, path: impl AsRef<Path>) -> RegistryResult<()> {
        let _span = self.span.enter();
        let path = path.as_ref();

        if self.state.read().finalized {
            return Err(RegistryError::Finalized {
                operation: "load new configuration",
            });
        }

        info!(path = %path.display(), "Loading configuration");
        let entries = read_config_file(path)?;

        let mut state = self.state.write();
        if state.finalized {
            return Err(RegistryError::Finalized {
                operation: "load new configuration",
            });
        }
        state.stage_all(entries);
        state.config_path = Some(path.to_path_buf());
        Ok(())
    }

    // ===== Registration =====

    /// Register a module's schema and claim its staged settings
    ///
    /// `initial`, when given, seeds the module's server-wide store. It must
    /// declare the same settings, and its values are checked again against
    /// `schema`. The module stays registered
    /// even if claiming a staged setting fails; the first failure is returned.
    pub fn register(
        &self,
        module: &str,
        schema: Arc<dyn ModuleSchema>,
        initial: Option<SettingsStore>,
    ) -> RegistryResult<()> {
        let _span = self.span.enter();
        debug!(module, "Module is registering settings");

        let mut state = self.state.write();
        if state.finalized {
            return Err(RegistryError::Finalized {
                operation: "register a module",
            });
        }
        if state.server.contains_key(module) {
            return Err(RegistryError::AlreadyRegistered {
                module: module.to_string(),
            });
        }
        if schema.name() != module {
            return Err(RegistryError::SchemaMismatch {
                module: module.to_string(),
                details: format!("schema is named {}", schema.name()),
            });
        }

        let store = match initial {
            Some(initial) => {
                let mut context = state.snapshot();
                context.insert(module.to_string(), initial.effective());
                let store = adopt_initial_store(module, schema, &initial, &context)?;
                debug!(module, "Using provided settings");
                store
            }
            None => {
                debug!(module, "Creating fresh settings");
                SettingsStore::new(schema)
            }
        };
        state.server.insert(module.to_string(), store);

        state.claim(Some(module), OnFailure::Reject)
    }

    /// Move staged settings into the stores of registered modules
    ///
    /// With `None`, every module with staged settings is considered. Modules
    /// that are still unregistered keep their staged settings.
    pub fn claim_unclaimed(&self, module: Option<&str>) -> RegistryResult<()> {
        let _span = self.span.enter();
        let mut state = self.state.write();
        if state.finalized {
            return Err(RegistryError::Finalized {
                operation: "process unused configuration",
            });
        }
        state.claim(module, OnFailure::Reject)
    }

    // ===== Sessions =====

    /// Reserve a scope for session-specific settings
    pub fn new_session(&self, session: SessionId) -> RegistryResult<()> {
        let _span = self.span.enter();
        if session == SERVER_SESSION {
            return Err(RegistryError::ReservedSession);
        }

        let mut state = self.state.write();
        if state.sessions.contains_key(&session) {
            return Err(RegistryError::DuplicateSession(session));
        }
        state.sessions.insert(session, BTreeMap::new());
        debug!(session, "Session created");
        Ok(())
    }

    /// Drop every session-specific setting of a session
    pub fn delete_session(&self, session: SessionId) -> RegistryResult<()> {
        let _span = self.span.enter();
        if session == SERVER_SESSION {
            return Err(RegistryError::ReservedSession);
        }

        let mut state = self.state.write();
        match state.sessions.remove(&session) {
            Some(stores) => {
                debug!(session, modules = stores.len(), "Session deleted");
                Ok(())
            }
            None => Err(RegistryError::UnknownSession(session)),
        }
    }

    pub fn has_session(&self, session: SessionId) -> bool {
        self.state.read().sessions.contains_key(&session)
    }

    // ===== Finalize =====

    /// Close configuration loading and module registration
    ///
    /// Fails with [`RegistryError::MissingRequired`] (and stays open) if a
    /// registered module's required setting has no value. A staged value the
    /// final sweep can not claim also keeps the registry open; it stays
    /// staged until a later load replaces it.
    pub fn finalize(&self) -> RegistryResult<()> {
        let _span = self.span.enter();
        let mut state = self.state.write();
        if state.finalized {
            return Err(RegistryError::Finalized {
                operation: "finalize",
            });
        }

        debug!("Settings setup complete, processing unused settings");
        state.claim(None, OnFailure::Keep)?;

        let missing: Vec<String> = state
            .server
            .iter()
            .flat_map(|(module, store)| {
                store
                    .missing_required()
                    .into_iter()
                    .map(move |setting| format!("{}.{}", module, setting))
            })
            .collect();
        if !missing.is_empty() {
            return Err(RegistryError::MissingRequired { missing });
        }

        for (module, settings) in state.unclaimed.drain() {
            let names: Vec<&String> = settings.keys().collect();
            warn!(
                module = %module,
                settings = ?names,
                "Module had settings defined, but was not loaded"
            );
        }
        for (module, settings) in std::mem::take(&mut state.rejected) {
            let names: Vec<&String> = settings.keys().collect();
            warn!(
                module = %module,
                settings = ?names,
                "Module did not accept these settings; they were dropped"
            );
        }

        state.finalized = true;
        info!(modules = state.server.len(), "Settings finalized");
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.state.read().finalized
    }

    // ===== Access =====

    /// Effective value of a setting in a scope
    ///
    /// Per-session settings are read from the session's own store; other
    /// settings always come from the server-wide store.
    pub fn get(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<Option<Value>> {
        let state = self.state.read();
        let server = state.server_store(module)?;
        let per_session = server.schema().per_session(setting)?;

        match scope {
            Scope::Session(session) if per_session => {
                let stores = state.session(session)?;
                match stores.get(module) {
                    Some(store) => store.get(setting),
                    None => server.schema().default(setting),
                }
            }
            Scope::Session(session) => {
                state.session(session)?;
                server.get(setting)
            }
            Scope::Server => server.get(setting),
        }
    }

    /// Change a setting in a scope
    pub fn set(&self, module: &str, scope: Scope, setting: &str, value: Value) -> RegistryResult<()> {
        let _span = self.span.enter();
        debug!(module, setting, %scope, %value, "Changing setting");

        let mut state = self.state.write();
        let snapshot = state.snapshot();
        let finalized = state.finalized;
        let ctx = WriteContext {
            finalized,
            snapshot: &snapshot,
        };
        state.store_mut(module, scope, setting)?.set(setting, value, ctx)
    }

    /// Return a setting to its default in a scope
    pub fn unset(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<()> {
        let _span = self.span.enter();
        debug!(module, setting, %scope, "Resetting setting to default");

        let mut state = self.state.write();
        let snapshot = state.snapshot();
        let finalized = state.finalized;
        let ctx = WriteContext {
            finalized,
            snapshot: &snapshot,
        };
        state.store_mut(module, scope, setting)?.unset(setting, ctx)
    }

    /// Number of non-default settings a module holds in a scope
    pub fn count(&self, module: &str, scope: Scope) -> RegistryResult<usize> {
        let state = self.state.read();
        let server = state.server_store(module)?;
        match scope {
            Scope::Server => Ok(server.count()),
            Scope::Session(session) => Ok(state
                .session(session)?
                .get(module)
                .map_or(0, SettingsStore::count)),
        }
    }

    /// Effective server-wide settings of every registered module
    pub fn snapshot(&self) -> SettingsSnapshot {
        self.state.read().snapshot()
    }

    // ===== Inspection =====

    pub fn registered_modules(&self) -> Vec<String> {
        self.state.read().server.keys().cloned().collect()
    }

    /// Staged raw settings of a module that has not claimed them
    pub fn unclaimed(&self, module: &str) -> Option<BTreeMap<String, String>> {
        self.state.read().unclaimed.get(module).cloned()
    }

    /// Modules with staged raw settings
    pub fn unclaimed_modules(&self) -> Vec<String> {
        self.state.read().unclaimed.modules()
    }

    /// Last argument list passed to [`load_arguments`](Self::load_arguments)
    pub fn config_args(&self) -> Option<Vec<String>> {
        self.state.read().config_args.clone()
    }

    /// Last file passed to [`load_config_file`](Self::load_config_file)
    pub fn config_path(&self) -> Option<PathBuf> {
        self.state.read().config_path.clone()
    }
}

impl SettingsAccess for SettingsRegistry {
    fn get(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<Option<Value>> {
        SettingsRegistry::get(self, module, scope, setting)
    }

    fn set(&self, module: &str, scope: Scope, setting: &str, value: Value) -> RegistryResult<()> {
        SettingsRegistry::set(self, module, scope, setting, value)
    }

    fn unset(&self, module: &str, scope: Scope, setting: &str) -> RegistryResult<()> {
        SettingsRegistry::unset(self, module, scope, setting)
    }

    fn snapshot(&self) -> SettingsSnapshot {
        SettingsRegistry::snapshot(self)
    }
}

impl RegistryState {
    fn stage_all(&mut self, entries: Vec<RawSetting>) {
        for raw in entries {
            debug!(
                module = %raw.module,
                setting = %raw.setting,
                value = %raw.value,
                "Added setting"
            );
            if let Some(previous) = self.rejected.get_mut(&raw.module) {
                previous.remove(&raw.setting);
            }
            self.unclaimed.stage(raw);
        }
    }

    fn snapshot(&self) -> SettingsSnapshot {
        self.server
            .iter()
            .map(|(module, store)| (module.clone(), store.effective()))
            .collect()
    }

    fn server_store(&self, module: &str) -> RegistryResult<&SettingsStore> {
        self.server
            .get(module)
            .ok_or_else(|| RegistryError::UnknownModule {
                module: module.to_string(),
            })
    }

    fn session(&self, session: SessionId) -> RegistryResult<&BTreeMap<String, SettingsStore>> {
        self.sessions
            .get(&session)
            .ok_or(RegistryError::UnknownSession(session))
    }

    /// Store a write to `setting` must go to, creating session stores lazily
    fn store_mut(
        &mut self,
        module: &str,
        scope: Scope,
        setting: &str,
    ) -> RegistryResult<&mut SettingsStore> {
        let server = self
            .server
            .get_mut(module)
            .ok_or_else(|| RegistryError::UnknownModule {
                module: module.to_string(),
            })?;

        let Scope::Session(session) = scope else {
            return Ok(server);
        };

        if !server.schema().per_session(setting)? {
            return Err(RegistryError::NotPerSession {
                module: module.to_string(),
                setting: setting.to_string(),
            });
        }
        let schema = server.schema().clone();
        let stores = self
            .sessions
            .get_mut(&session)
            .ok_or(RegistryError::UnknownSession(session))?;
        Ok(stores
            .entry(module.to_string())
            .or_insert_with(|| SettingsStore::new(schema)))
    }

    /// Claim staged settings for `module`, or for every staged module
    fn claim(&mut self, module: Option<&str>, on_failure: OnFailure) -> RegistryResult<()> {
        let search: Vec<String> = match module {
            Some(module) if self.unclaimed.contains(module) => vec![module.to_string()],
            Some(module) => {
                debug!(module, "No unused settings to process");
                Vec::new()
            }
            None => self.unclaimed.modules(),
        };
        debug!(modules = ?search, "Processing unused settings");

        let mut first_error = None;
        for module in search {
            if !self.server.contains_key(&module) {
                debug!(module = %module, "Module not registered");
                continue;
            }
            let Some(staged) = self.unclaimed.take(&module) else {
                continue;
            };

            // Settings checked against other settings of the same batch may
            // only pass once those are in; retry while progress is made.
            let mut pending: Vec<(String, String)> = staged.into_iter().collect();
            let failed = loop {
                let attempted = pending.len();
                let mut failed = Vec::new();
                for (setting, raw) in pending {
                    debug!(module = %module, setting = %setting, "Loading setting");
                    if let Err(err) = self.claim_one(&module, &setting, &raw) {
                        failed.push((setting, raw, err));
                    }
                }
                if failed.is_empty() || failed.len() == attempted {
                    break failed;
                }
                pending = failed
                    .into_iter()
                    .map(|(setting, raw, _)| (setting, raw))
                    .collect();
            };

            for (setting, raw, err) in failed {
                warn!(error = %err, "Could not load staged setting");
                match on_failure {
                    OnFailure::Reject => {
                        self.rejected
                            .entry(module.clone())
                            .or_default()
                            .insert(setting, raw);
                    }
                    OnFailure::Keep => {
                        self.unclaimed.stage(RawSetting {
                            module: module.clone(),
                            setting,
                            value: raw,
                        });
                    }
                }
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn claim_one(&mut self, module: &str, setting: &str, raw: &str) -> RegistryResult<()> {
        let snapshot = self.snapshot();
        let store = self
            .server
            .get_mut(module)
            .ok_or_else(|| RegistryError::UnknownModule {
                module: module.to_string(),
            })?;
        let value = store.schema().parse_raw(setting, raw)?;
        store.set(setting, value, WriteContext::startup(&snapshot))
    }
}

/// Rebuild a pre-built store on the registered schema
///
/// The store must describe the same settings, and every value it holds is
/// checked again by `schema`, whose rules apply from then on.
fn adopt_initial_store(
    module: &str,
    schema: Arc<dyn ModuleSchema>,
    initial: &SettingsStore,
    context: &SettingsSnapshot,
) -> RegistryResult<SettingsStore> {
    let mismatch = |details: String| RegistryError::SchemaMismatch {
        module: module.to_string(),
        details,
    };

    let provided = initial.schema();
    if provided.name() != schema.name() {
        return Err(mismatch(format!(
            "provided settings belong to {}",
            provided.name()
        )));
    }

    let mut expected = schema.settings_list();
    let mut actual = provided.settings_list();
    expected.sort_unstable();
    actual.sort_unstable();
    if expected != actual {
        return Err(mismatch(format!(
            "provided settings declare {:?}, schema declares {:?}",
            actual, expected
        )));
    }

    let mut store = SettingsStore::new(schema);
    for (setting, value) in initial.overrides() {
        store
            .set(setting, value.clone(), WriteContext::startup(context))
            .map_err(|err| mismatch(format!("provided value for {} does not fit: {}", setting, err)))?;
    }
    Ok(store)
}
