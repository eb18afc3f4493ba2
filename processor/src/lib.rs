//! `iris-e01-processor`: evidence-creation processor module for DFIR-IRIS.
//!
//! When the host commits a new evidence record it fires the
//! `on_postload_evidence_create` hook. This module resolves the on-disk path
//! of the datastore file behind each evidence item, derives a per-case output
//! directory, and starts a user-supplied script against the file as a
//! detached process.
//!
//! ## Host seams
//!
//! Everything owned by the host is reached through a narrow trait:
//! - [`config::ConfigSource`]: module parameters, read on every hook call
//! - [`store::DataStore`]: stored-file and case/client lookups
//! - [`handler::HookRegistrar`]: hook subscription
//! - [`launcher::Spawner`]: process creation
//!
//! The host drives the module through [`handler::ModuleInterface`].

pub mod config;
pub mod handler;
pub mod launcher;
pub mod message_queue;
pub mod metadata;
pub mod output_dir;
pub mod payload;
pub mod resolver;
pub mod status;
pub mod store;

pub use config::ConfigSource;
pub use config::HostSettings;
pub use config::ModuleConfig;
pub use handler::E01Processor;
pub use handler::HookRegistrar;
pub use handler::ModuleInterface;
pub use payload::Evidence;
pub use payload::HookName;
pub use payload::HookObject;
pub use payload::HookPayload;
pub use status::HookStatus;
pub use store::DataStore;
pub use store::SqliteStore;

/// Name under which the module is registered with the host.
pub const MODULE_NAME: &str = "iris_e01_processor";

/// Hook fired by the host once an evidence record has been committed.
pub const EVIDENCE_CREATE_HOOK: &str = "on_postload_evidence_create";
