//! Per-invocation module log.
//!
//! Every message is emitted through `tracing` and also recorded, prefixed
//! with its level, so it can be returned to the host in [`HookStatus`] logs.
//!
//! [`HookStatus`]: crate::status::HookStatus

use std::collections::VecDeque;

/// Upper bound on recorded messages; the oldest are dropped first.
const DEFAULT_MAX_MESSAGES: usize = 512;

#[derive(Debug)]
pub struct MessageQueue {
    messages: VecDeque<String>,
    max_messages: usize,
    debug: bool,
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new(false)
    }
}

impl MessageQueue {
    /// `debug` controls whether debug messages are recorded and emitted.
    pub fn new(debug: bool) -> Self {
        Self::with_capacity(DEFAULT_MAX_MESSAGES, debug)
    }

    pub fn with_capacity(max_messages: usize, debug: bool) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages: max_messages.max(1),
            debug,
        }
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        if !self.debug {
            return;
        }
        let message = message.into();
        tracing::debug!(target: "iris_e01_processor", "{message}");
        self.push("DEBUG", message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: "iris_e01_processor", "{message}");
        self.push("INFO", message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: "iris_e01_processor", "{message}");
        self.push("WARNING", message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(target: "iris_e01_processor", "{message}");
        self.push("ERROR", message);
    }

    fn push(&mut self, level: &str, message: String) {
        if self.messages.len() == self.max_messages {
            self.messages.pop_front();
        }
        self.messages.push_back(format!("[{level}] {message}"));
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.iter().any(|m| m.contains(needle))
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages.into()
    }
}
