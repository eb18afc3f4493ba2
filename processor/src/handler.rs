//! Host-facing entry points: hook registration and hook dispatch.

use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::EVIDENCE_CREATE_HOOK;
use crate::MODULE_NAME;
use crate::config::ConfigSource;
use crate::config::HostSettings;
use crate::config::ModuleConfig;
use crate::launcher::DetachedSpawner;
use crate::launcher::ScriptSettings;
use crate::launcher::Spawner;
use crate::launcher::launch_processing_script;
use crate::message_queue::MessageQueue;
use crate::metadata::ModuleInfo;
use crate::metadata::module_info;
use crate::output_dir::compute_output_dir;
use crate::payload::Evidence;
use crate::payload::HookName;
use crate::payload::HookObject;
use crate::payload::HookPayload;
use crate::resolver::resolve_evidence_path;
use crate::status::HookStatus;
use crate::store::DataStore;
use crate::store::StoreError;

/// Host side of hook subscription.
pub trait HookRegistrar {
    fn register_to_hook(&self, module_id: i64, hook_name: &str, run_asynchronously: bool)
    -> HookStatus;
}

/// Interface the host calls into.
pub trait ModuleInterface {
    fn info(&self) -> ModuleInfo;

    /// Subscribe to the hooks the module handles.
    fn register_hooks(&self, module_id: i64, registrar: &dyn HookRegistrar) -> HookStatus;

    /// Handle one hook firing. On every success path the returned status
    /// carries `data` unchanged so the host's hook chain can continue.
    fn hooks_handler(
        &self,
        hook: &HookName,
        hook_ui_name: Option<&str>,
        data: HookPayload,
    ) -> HookStatus;
}

#[derive(Debug, thiserror::Error)]
enum ItemError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("panicked: {0}")]
    Panic(String),
}

/// Reacts to evidence creation by launching the configured script.
pub struct E01Processor {
    config: Arc<dyn ConfigSource>,
    store: Arc<dyn DataStore>,
    spawner: Arc<dyn Spawner>,
    host: HostSettings,
    /// Last configuration read successfully, used when a reload fails.
    last_config: Mutex<Option<ModuleConfig>>,
}

impl E01Processor {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        store: Arc<dyn DataStore>,
        host: HostSettings,
    ) -> Self {
        Self {
            config,
            store,
            spawner: Arc::new(DetachedSpawner),
            host,
            last_config: Mutex::new(None),
        }
    }

    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Fresh configuration, or the last good one (else defaults) when the
    /// source cannot be read.
    fn current_config(&self, log: &mut MessageQueue) -> ModuleConfig {
        match self.config.load() {
            Ok(cfg) => {
                if let Ok(mut last) = self.last_config.lock() {
                    *last = Some(cfg.clone());
                }
                cfg
            }
            Err(err) => {
                log.warning(format!(
                    "could not reload module configuration ({err}); using last known values"
                ));
                self.last_config
                    .lock()
                    .ok()
                    .and_then(|last| last.clone())
                    .unwrap_or_default()
            }
        }
    }

    fn process_evidence(
        &self,
        settings: &ScriptSettings<'_>,
        evidence: &Evidence,
        log: &mut MessageQueue,
    ) -> Result<(), ItemError> {
        let Some(e01_path) = resolve_evidence_path(self.store.as_ref(), evidence, log)? else {
            log.warning(format!(
                "unable to resolve local path for evidence id={}, case_id={}",
                evidence.id,
                evidence
                    .case_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "none".to_string())
            ));
            return Ok(());
        };

        let output_dir = compute_output_dir(
            self.store.as_ref(),
            self.host.uploaded_path.as_deref(),
            MODULE_NAME,
            evidence,
            log,
        );

        log.debug(format!(
            "launching script '{}' for evidence id={}, case_id={}, e01_path='{}', output_dir='{}'",
            settings.script_path,
            evidence.id,
            evidence.case_id.unwrap_or_default(),
            e01_path.display(),
            output_dir
                .as_deref()
                .map(Path::display)
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ));

        launch_processing_script(
            self.spawner.as_ref(),
            settings,
            evidence,
            &e01_path,
            output_dir.as_deref(),
            log,
        );
        Ok(())
    }

    /// Run one item, converting errors and panics into log entries.
    fn process_isolated(
        &self,
        settings: &ScriptSettings<'_>,
        evidence: &Evidence,
        log: &mut MessageQueue,
    ) {
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.process_evidence(settings, evidence, log)
        }))
        .unwrap_or_else(|panic| {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ItemError::Panic(reason))
        });

        if let Err(err) = outcome {
            log.error(format!(
                "error while handling evidence id={}: {err}",
                evidence.id
            ));
        }
    }
}

impl ModuleInterface for E01Processor {
    fn info(&self) -> ModuleInfo {
        module_info()
    }

    fn register_hooks(&self, module_id: i64, registrar: &dyn HookRegistrar) -> HookStatus {
        let status = registrar.register_to_hook(module_id, EVIDENCE_CREATE_HOOK, true);
        let mut log = MessageQueue::default();
        match status.message() {
            Some(message) if status.is_failure() => log.error(message.to_string()),
            _ => log.info(format!(
                "{MODULE_NAME} successfully subscribed to {EVIDENCE_CREATE_HOOK}"
            )),
        }
        match status {
            HookStatus::Success { data, mut logs } => {
                logs.extend(log.into_messages());
                HookStatus::Success { data, logs }
            }
            HookStatus::Error { message, mut logs } => {
                logs.extend(log.into_messages());
                HookStatus::Error { message, logs }
            }
        }
    }

    fn hooks_handler(
        &self,
        hook: &HookName,
        _hook_ui_name: Option<&str>,
        data: HookPayload,
    ) -> HookStatus {
        let mut log = MessageQueue::default();
        let cfg = self.current_config(&mut log);
        log.set_debug(cfg.log_debug);

        if !cfg.enabled {
            return HookStatus::success(data, log.into_messages());
        }
        if *hook != HookName::OnPostloadEvidenceCreate {
            return HookStatus::success(data, log.into_messages());
        }

        let Some(script_path) = cfg.script_path() else {
            log.error("e01_script_path is not configured; skipping evidence processing.");
            return HookStatus::error("e01_script_path not configured", log.into_messages());
        };

        if !data.objects().iter().any(HookObject::is_evidence_record) {
            log.debug(format!(
                "hook {hook} received no CaseReceivedFile instances."
            ));
            return HookStatus::success(data, log.into_messages());
        }

        let settings = ScriptSettings {
            script_path,
            extra_args: &cfg.e01_script_extra_args,
            default_cwd: self.host.uploaded_path.as_deref(),
            module_name: MODULE_NAME,
        };
        for object in data.objects() {
            match object {
                HookObject::Evidence { evidence, .. } => {
                    self.process_isolated(&settings, evidence, &mut log);
                }
                HookObject::Malformed { raw, error } => {
                    let id = raw
                        .get("id")
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "unknown".to_string());
                    log.error(format!(
                        "error while handling evidence id={id}: unreadable evidence record: {error}"
                    ));
                }
                HookObject::Other(_) => {}
            }
        }

        HookStatus::success(data, log.into_messages())
    }
}
