//! Configuration System
//!
//! Hierarchical configuration: built-in defaults, the global file, workspace files and
//! environment overrides, deserialized into [`NiwaConfig`] and validated before use.

use crate::logging::LoggingConfig;
use crate::store::{StoreOptions, WaitPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;
pub use sources::workspace_file::{write_default_config, CONFIG_DIR};

const DAY_MS: u64 = 24 * 60 * 60 * 1000;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NiwaConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicyKind {
    Wait,
    FailFast,
}

/// Storage engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database directory, relative to the workspace unless absolute
    pub path: PathBuf,
    /// Automatic retries of a command whose commit hit a write conflict
    pub write_retries: u32,
    pub retry_backoff_ms: u64,
    pub wait_policy: WaitPolicyKind,
    /// Writer gate and database lock wait under the `wait` policy
    pub lock_timeout_ms: u64,
    pub flush_on_commit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".niwa/store"),
            write_retries: 3,
            retry_backoff_ms: 10,
            wait_policy: WaitPolicyKind::Wait,
            lock_timeout_ms: 5000,
            flush_on_commit: true,
        }
    }
}

impl StoreConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            workspace_root.join(&self.path)
        }
    }

    pub fn to_options(&self) -> StoreOptions {
        StoreOptions {
            write_retries: self.write_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            wait_policy: match self.wait_policy {
                WaitPolicyKind::Wait => WaitPolicy::Wait(Duration::from_millis(self.lock_timeout_ms)),
                WaitPolicyKind::FailFast => WaitPolicy::FailFast,
            },
            flush_on_commit: self.flush_on_commit,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("Store path cannot be empty".to_string());
        }
        if self.wait_policy == WaitPolicyKind::Wait && self.lock_timeout_ms == 0 {
            return Err("lock_timeout_ms must be positive with the wait policy".to_string());
        }
        Ok(())
    }
}

/// Pending-read and conflict expiry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub expiry_enabled: bool,
    pub stale_after_days: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            expiry_enabled: true,
            stale_after_days: 30,
        }
    }
}

impl RegistryConfig {
    /// Age after which cleanup removes records; `None` when expiry is off.
    pub fn horizon_ms(&self) -> Option<u64> {
        self.expiry_enabled
            .then(|| self.stale_after_days.saturating_mul(DAY_MS))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.expiry_enabled && self.stale_after_days == 0 {
            return Err("stale_after_days must be at least 1 when expiry is enabled".to_string());
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Store(String),
    Registry(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Store(msg) => write!(f, "Store: {}", msg),
            ValidationError::Registry(msg) => write!(f, "Registry: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl NiwaConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.store.validate() {
            errors.push(ValidationError::Store(e));
        }
        if let Err(e) = self.registry.validate() {
            errors.push(ValidationError::Registry(e));
        }
        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
