//! Result type handed back to the host after every hook or registration call.

use serde::Serialize;

use crate::payload::HookPayload;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HookStatus {
    /// The host continues its hook chain with `data`.
    Success {
        data: Option<HookPayload>,
        logs: Vec<String>,
    },
    Error {
        message: String,
        logs: Vec<String>,
    },
}

impl HookStatus {
    pub fn success(data: HookPayload, logs: Vec<String>) -> Self {
        HookStatus::Success {
            data: Some(data),
            logs,
        }
    }

    /// Success without payload, used for registration results.
    pub fn ok(logs: Vec<String>) -> Self {
        HookStatus::Success { data: None, logs }
    }

    pub fn error(message: impl Into<String>, logs: Vec<String>) -> Self {
        HookStatus::Error {
            message: message.into(),
            logs,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HookStatus::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            HookStatus::Error { message, .. } => Some(message),
            HookStatus::Success { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&HookPayload> {
        match self {
            HookStatus::Success { data, .. } => data.as_ref(),
            HookStatus::Error { .. } => None,
        }
    }

    pub fn logs(&self) -> &[String] {
        match self {
            HookStatus::Success { logs, .. } | HookStatus::Error { logs, .. } => logs,
        }
    }
}
