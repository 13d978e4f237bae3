use crate::core::errors::{ConvergeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_COORDINATOR_ID: AtomicU64 = AtomicU64::new(1);

/// Per-coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name used in log lines and errors. Generated when absent.
    pub name: Option<String>,
    /// Panic on precondition violations instead of logging and ignoring them
    pub strict: bool,
    /// Attach a `LoggingHook` that traces every lifecycle event
    pub log_events: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            name: None,
            strict: cfg!(debug_assertions),
            log_events: false,
        }
    }
}

impl CoordinatorConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(ConvergeError::configuration_field(
                    "name must not be blank",
                    "name",
                ));
            }
        }
        Ok(())
    }

    /// Panic on every misuse, regardless of build profile
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Log misuse and carry on, regardless of build profile
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_log_events(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// The configured name, or a fresh process-unique one.
    pub(crate) fn resolve_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "coordinator-{}",
                NEXT_COORDINATOR_ID.fetch_add(1, Ordering::Relaxed)
            ),
        }
    }
}
