use log::{debug, info, warn};

/// Thin wrapper over the `log` facade, tagged with the emitting component.
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    /// Advisory conditions: reported, then ingestion carries on.
    pub fn advise(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }

    pub fn detail(&self, message: &str) {
        debug!("[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("volcore")
    }
}
