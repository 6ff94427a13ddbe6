use std::sync::{Mutex, mpsc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Logging sink carried by the execution context.
pub trait BuildLog: Send + Sync {
    fn emit(&self, entry: LogEntry);

    fn info(&self, message: &str) {
        self.emit(LogEntry {
            level: LogLevel::Info,
            message: message.to_string(),
        });
    }

    fn warning(&self, message: &str) {
        self.emit(LogEntry {
            level: LogLevel::Warning,
            message: message.to_string(),
        });
    }
}

/// Forwards entries to `tracing`; what gets printed is up to the installed subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl BuildLog for TracingLog {
    fn emit(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info => tracing::info!(target: "android_build", "{}", entry.message),
            LogLevel::Warning => tracing::warn!(target: "android_build", "{}", entry.message),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .map(|g| g.iter().filter(|e| e.level == level).count())
            .unwrap_or(0)
    }
}

impl BuildLog for MemoryLog {
    fn emit(&self, entry: LogEntry) {
        if let Ok(mut g) = self.entries.lock() {
            g.push(entry);
        }
    }
}

#[derive(Clone)]
pub struct ChannelLog {
    tx: mpsc::Sender<LogEntry>,
}

impl ChannelLog {
    pub fn new(tx: mpsc::Sender<LogEntry>) -> Self {
        Self { tx }
    }
}

impl BuildLog for ChannelLog {
    fn emit(&self, entry: LogEntry) {
        let _ = self.tx.send(entry);
    }
}
