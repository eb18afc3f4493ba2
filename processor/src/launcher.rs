//! Detached launch of the user-supplied processing script.
//!
//! The script receives the evidence file path as its first positional
//! argument followed by the configured extra arguments, and these variables on
//! top of the inherited environment:
//!
//! - `IRIS_CASE_ID`
//! - `IRIS_EVIDENCE_ID`
//! - `IRIS_E01_PATH`
//! - `IRIS_E01_OUTPUT_DIR` (empty when no output directory)
//! - `IRIS_MODULE_NAME`
//!
//! Launching is fire-and-forget: once the process has been created nothing
//! about it is observed or reported. Only a failure of the spawn call itself
//! reaches the caller.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use crate::message_queue::MessageQueue;
use crate::payload::Evidence;

pub const ENV_CASE_ID: &str = "IRIS_CASE_ID";
pub const ENV_EVIDENCE_ID: &str = "IRIS_EVIDENCE_ID";
pub const ENV_E01_PATH: &str = "IRIS_E01_PATH";
pub const ENV_OUTPUT_DIR: &str = "IRIS_E01_OUTPUT_DIR";
pub const ENV_MODULE_NAME: &str = "IRIS_MODULE_NAME";

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("script '{}' not found or not executable", path.display())]
    ScriptNotFound { path: PathBuf },

    #[error("working directory '{}' does not exist", path.display())]
    WorkingDir { path: PathBuf },

    #[error("failed to launch script '{}': {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything needed to create the child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub program: PathBuf,
    /// Arguments after the program itself.
    pub args: Vec<String>,
    /// Added to (or overriding) the inherited environment.
    pub env: Vec<(String, String)>,
    /// `None` inherits the current working directory.
    pub cwd: Option<PathBuf>,
}

impl LaunchRequest {
    /// Full argument vector, program first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Creates processes without waiting on them.
pub trait Spawner: Send + Sync {
    /// Start the process and return its pid. Must return as soon as the
    /// process has been created.
    fn spawn_detached(&self, request: &LaunchRequest) -> Result<u32, LaunchError>;
}

/// Spawns real processes with stdin, stdout and stderr attached to the null
/// device.
///
/// The child handle is handed to a short-lived thread that only reaps it so no
/// zombie is left behind. The exit status is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedSpawner;

impl Spawner for DetachedSpawner {
    fn spawn_detached(&self, request: &LaunchRequest) -> Result<u32, LaunchError> {
        if let Some(cwd) = &request.cwd
            && !cwd.is_dir()
        {
            return Err(LaunchError::WorkingDir { path: cwd.clone() });
        }

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|source| match source.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => LaunchError::ScriptNotFound {
                path: request.program.clone(),
            },
            _ => LaunchError::Spawn {
                path: request.program.clone(),
                source,
            },
        })?;
        let pid = child.id();

        let reaper = std::thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || {
                let _ = child.wait();
            });
        if let Err(err) = reaper {
            tracing::debug!("could not start reaper for pid {pid}: {err}");
        }
        Ok(pid)
    }
}

/// Split the extra-arguments string with shell-word rules.
///
/// `#` is an ordinary character, never the start of a comment. A malformed
/// string (e.g. an unterminated quote) is logged and treated as empty.
pub fn split_extra_args(raw: &str, log: &mut MessageQueue) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    match shlex::split(&escape_word_leading_hashes(raw)) {
        Some(args) => args,
        None => {
            log.error(format!(
                "failed to parse e01_script_extra_args '{raw}'; ignoring extra args."
            ));
            Vec::new()
        }
    }
}

/// Backslash-escape every `#` that would open a word outside quotes, the
/// only position where `shlex` reads it as a comment.
fn escape_word_leading_hashes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut word_start = true;
    for c in raw.chars() {
        if escaped {
            escaped = false;
        } else {
            match quote {
                Some(q) if c == q => quote = None,
                Some('"') if c == '\\' => escaped = true,
                Some(_) => {}
                None => match c {
                    '\\' => escaped = true,
                    '\'' | '"' => quote = Some(c),
                    '#' if word_start => out.push('\\'),
                    _ => {}
                },
            }
        }
        word_start = quote.is_none() && !escaped && c.is_whitespace();
        out.push(c);
    }
    out
}

/// Per-invocation launch settings shared by every evidence item.
#[derive(Debug, Clone, Copy)]
pub struct ScriptSettings<'a> {
    pub script_path: &'a str,
    /// Raw `e01_script_extra_args` value.
    pub extra_args: &'a str,
    /// Working directory when the item has no output directory.
    pub default_cwd: Option<&'a Path>,
    pub module_name: &'a str,
}

/// Argument vector, environment and working directory for one evidence item.
pub fn build_launch_request(
    settings: &ScriptSettings<'_>,
    evidence: &Evidence,
    e01_path: &Path,
    output_dir: Option<&Path>,
    log: &mut MessageQueue,
) -> LaunchRequest {
    let e01_path = e01_path.to_string_lossy().into_owned();
    let mut args = vec![e01_path.clone()];
    args.extend(split_extra_args(settings.extra_args, log));

    let env = vec![
        (
            ENV_CASE_ID.to_string(),
            evidence.case_id.map(|id| id.to_string()).unwrap_or_default(),
        ),
        (ENV_EVIDENCE_ID.to_string(), evidence.id.to_string()),
        (ENV_E01_PATH.to_string(), e01_path),
        (
            ENV_OUTPUT_DIR.to_string(),
            output_dir
                .map(|dir| dir.to_string_lossy().into_owned())
                .unwrap_or_default(),
        ),
        (ENV_MODULE_NAME.to_string(), settings.module_name.to_string()),
    ];

    LaunchRequest {
        program: PathBuf::from(settings.script_path),
        args,
        env,
        cwd: output_dir.or(settings.default_cwd).map(Path::to_path_buf),
    }
}

/// Build the request and start the script detached.
///
/// Never fails: spawn errors are logged, with a missing or non-executable
/// script reported separately. Returns the pid when the process was created.
pub fn launch_processing_script(
    spawner: &dyn Spawner,
    settings: &ScriptSettings<'_>,
    evidence: &Evidence,
    e01_path: &Path,
    output_dir: Option<&Path>,
    log: &mut MessageQueue,
) -> Option<u32> {
    let request = build_launch_request(settings, evidence, e01_path, output_dir, log);

    match spawner.spawn_detached(&request) {
        Ok(pid) => {
            log.debug(format!(
                "started '{}' for evidence id={} (pid {pid})",
                settings.script_path, evidence.id
            ));
            Some(pid)
        }
        Err(err @ LaunchError::ScriptNotFound { .. }) => {
            log.error(format!("{err}."));
            None
        }
        Err(err) => {
            log.error(format!("evidence id={}: {err}", evidence.id));
            None
        }
    }
}
