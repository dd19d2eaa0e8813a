//! Merge rules: defaults first, then files, then environment.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("store.path", ".niwa/store")?
        .set_default("store.write_retries", 3)?
        .set_default("store.retry_backoff_ms", 10)?
        .set_default("store.wait_policy", "wait")?
        .set_default("store.lock_timeout_ms", 5000)?
        .set_default("store.flush_on_commit", true)?
        .set_default("registry.expiry_enabled", true)?
        .set_default("registry.stale_after_days", 30)
}
