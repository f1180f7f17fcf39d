//! Where non-fatal pipeline problems are reported.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::warn;

/// Receives problems that are recovered from rather than raised.
pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    /// Report one problem. `context` names the stage.
    fn report(&self, context: &str, message: &str);
}

/// Forwards reports to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, context: &str, message: &str) {
        warn!(context, message, "Pipeline diagnostic");
    }
}

/// Keeps reports in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    entries: Arc<Mutex<Vec<(String, String)>>>,
}

impl CollectingSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far, as `(context, message)`.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, context: &str, message: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((context.to_string(), message.to_string()));
        }
    }
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn DiagnosticSink>;

/// The default sink.
pub fn default_sink() -> SharedSink {
    Arc::new(TracingSink)
}
