//! Progress sinks handed to long-running components.
//!
//! The trainer never reaches for a global logger directly; it writes to the
//! sink it was given. [`LogSink`] forwards to the `log` facade and is the
//! default.
use std::sync::{Arc, Mutex};

use log::Level;

pub trait ProgressSink: Send + Sync {
    fn emit(&self, level: Level, message: &str);
}

/// Forwards progress lines to the `log` facade under a fixed target.
#[derive(Debug, Clone)]
pub struct LogSink {
    target: &'static str,
}

impl LogSink {
    pub fn new(target: &'static str) -> Self {
        Self { target }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new("calibra::trainer")
    }
}

impl ProgressSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: self.target, level, "{}", message);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _level: Level, _message: &str) {}
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Level, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.lines().into_iter().map(|(_, m)| m).collect()
    }
}

impl ProgressSink for MemorySink {
    fn emit(&self, level: Level, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

pub type SharedSink = Arc<dyn ProgressSink>;

pub fn default_sink() -> SharedSink {
    Arc::new(LogSink::default())
}
