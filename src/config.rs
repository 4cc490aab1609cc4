//! Configuration loading for the notification engine.
//!
//! # Architecture overview
//!
//! Config lives in a stable per-user JSON file and is loaded exactly once at
//! startup. It has no mutation path — it is read-only for the lifetime of
//! the process. `Config::load()` follows a never-fail philosophy: a missing
//! or corrupt file degrades to defaults with a warning rather than aborting
//! the invocation.
//!
//! # Three-state optional fields
//!
//! Every scalar a user might want to explicitly set to a falsy value
//! (`enabled = false`, `sound_enabled = false`) is stored as `Option<T>`
//! with `#[serde(default)]`, so "absent from the file" (use the built-in
//! default) and "present and false" (explicit override) are distinguished.
//! `resolved()`-style accessors below apply the default at point of use.
//!
//! # TRADE-OFFS
//!
//! - Path-valued fields are plain `String` on the struct (not `PathBuf`),
//!   with env-var expansion applied by `expand_env` at load time, resolved
//!   lazily at point of use rather than eagerly at parse time.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HookError;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DesktopConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub sound_enabled: Option<bool>,
    #[serde(default)]
    pub terminal_bell: Option<bool>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub output_device: Option<String>,
    #[serde(default)]
    pub app_icon: Option<String>,
    #[serde(default)]
    pub click_to_focus: Option<bool>,
    #[serde(default)]
    pub terminal_app: Option<String>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            enabled: None,
            sound_enabled: None,
            terminal_bell: None,
            volume: None,
            output_device: None,
            app_icon: None,
            click_to_focus: None,
            terminal_app: None,
        }
    }
}

impl DesktopConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
    pub fn is_sound_enabled(&self) -> bool {
        self.sound_enabled.unwrap_or(true)
    }
    pub fn is_terminal_bell_enabled(&self) -> bool {
        self.terminal_bell.unwrap_or(false)
    }
    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(0.7)
    }
    pub fn click_to_focus(&self) -> bool {
        self.click_to_focus.unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), HookError> {
        let volume = self.volume();
        if !(0.0..=1.0).contains(&volume) {
            return Err(HookError::InvalidConfig(format!(
                "desktop.volume must be within 0.0..=1.0, got {volume}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookPreset {
    Slack,
    Discord,
    Telegram,
    Lark,
    Custom,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    Json,
    Text,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryPolicy {
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub initial_backoff_ms: Option<u64>,
    #[serde(default)]
    pub max_backoff_ms: Option<u64>,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(3)
    }
    pub fn initial_backoff_ms(&self) -> u64 {
        self.initial_backoff_ms.unwrap_or(200)
    }
    pub fn max_backoff_ms(&self) -> u64 {
        self.max_backoff_ms.unwrap_or(5_000)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: None, initial_backoff_ms: None, max_backoff_ms: None }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CircuitBreakerPolicy {
    #[serde(default)]
    pub failure_threshold: Option<u32>,
    #[serde(default)]
    pub success_threshold: Option<u32>,
    #[serde(default)]
    pub open_timeout_secs: Option<u64>,
}

impl CircuitBreakerPolicy {
    pub fn failure_threshold(&self) -> u32 {
        self.failure_threshold.unwrap_or(5)
    }
    pub fn success_threshold(&self) -> u32 {
        self.success_threshold.unwrap_or(2)
    }
    pub fn open_timeout_secs(&self) -> u64 {
        self.open_timeout_secs.unwrap_or(30)
    }
}

impl Default for CircuitBreakerPolicy {
    fn default() -> Self {
        Self { failure_threshold: None, success_threshold: None, open_timeout_secs: None }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitPolicy {
    #[serde(default)]
    pub rate_per_minute: Option<f64>,
    #[serde(default)]
    pub capacity: Option<f64>,
}

impl RateLimitPolicy {
    pub fn rate_per_minute(&self) -> f64 {
        self.rate_per_minute.unwrap_or(20.0)
    }
    pub fn capacity(&self) -> f64 {
        self.capacity.unwrap_or(5.0)
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self { rate_per_minute: None, capacity: None }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub preset: Option<WebhookPreset>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub payload_encoding: Option<PayloadEncoding>,
    #[serde(default)]
    pub headers: std::collections::BTreeMap<String, String>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerPolicy,
    #[serde(default)]
    pub rate_limit: RateLimitPolicy,
}

impl WebhookConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(false) && self.url.is_some()
    }
    pub fn preset(&self) -> WebhookPreset {
        self.preset.unwrap_or(WebhookPreset::Custom)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubjectFilterRule {
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BehaviorConfig {
    #[serde(default)]
    pub cooldown_after_complete_secs: Option<u64>,
    #[serde(default)]
    pub cooldown_after_any_secs: Option<u64>,
    #[serde(default)]
    pub notify_on_subagent: bool,
    #[serde(default)]
    pub suppress_for_subagent_transcripts: bool,
    #[serde(default)]
    pub notify_on_text_response: bool,
    #[serde(default)]
    pub respect_judge_mode: bool,
    #[serde(default)]
    pub subject_filter: Vec<SubjectFilterRule>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            cooldown_after_complete_secs: None,
            cooldown_after_any_secs: None,
            notify_on_subagent: true,
            suppress_for_subagent_transcripts: true,
            notify_on_text_response: false,
            respect_judge_mode: true,
            subject_filter: Vec::new(),
        }
    }
}

impl BehaviorConfig {
    pub fn cooldown_after_complete_secs(&self) -> u64 {
        self.cooldown_after_complete_secs.unwrap_or(12)
    }
    pub fn cooldown_after_any_secs(&self) -> u64 {
        self.cooldown_after_any_secs.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusEntry {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub sound_path: Option<String>,
}

impl StatusEntry {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub desktop: DesktopConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub behavior: BehaviorConfig,
    #[serde(default)]
    pub status: std::collections::BTreeMap<String, StatusEntry>,
}

impl Config {
    pub fn status_for(&self, key: &str) -> StatusEntry {
        self.status.get(key).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), HookError> {
        self.desktop.validate()
    }

    /// Load config, falling back to the legacy path and then to defaults.
    /// Never fails the invocation — every error path is logged at `warn!`
    /// and degrades.
    pub fn load() -> Config {
        let Some(path) = config_path() else {
            tracing::warn!("could not determine config path, using defaults");
            return Config::default();
        };

        if let Some(config) = read_config(&path) {
            return config;
        }

        // Fall back to a legacy path under the plugin install directory,
        // migrating it into place on first successful read.
        if let Some(legacy) = legacy_config_path() {
            if let Some(config) = read_config(&legacy) {
                if let Err(e) = migrate_legacy(&legacy, &path) {
                    tracing::warn!("failed to migrate legacy config: {e}");
                }
                return config;
            }
        }

        Config::default()
    }
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".claude/claude-notifications-go/config.json"))
}

fn legacy_config_path() -> Option<PathBuf> {
    if let Ok(root) = std::env::var("CLAUDE_PLUGIN_ROOT") {
        return Some(PathBuf::from(root).join("config.json"));
    }
    dirs::home_dir().map(|home| home.join(".claude-notifications/config.json"))
}

fn read_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Config>(&content) {
        Ok(mut config) => {
            expand_paths(&mut config);
            Some(config)
        }
        Err(e) => {
            tracing::warn!("failed to parse config at {}: {e}", path.display());
            None
        }
    }
}

/// Atomically migrate a legacy config into the stable path: write to a
/// temp file in the target directory, then rename. Rename within one
/// filesystem is atomic; writing the temp file in the same directory as
/// the target keeps it on the same filesystem.
fn migrate_legacy(legacy: &Path, target: &Path) -> Result<(), HookError> {
    let content = std::fs::read_to_string(legacy)?;
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = target.with_extension("json.tmp");
    std::fs::write(&tmp, &content)?;
    std::fs::rename(&tmp, target)?;
    tracing::warn!(
        "migrated legacy config from {} to {}",
        legacy.display(),
        target.display()
    );
    Ok(())
}

fn expand_paths(config: &mut Config) {
    if let Some(ref mut icon) = config.desktop.app_icon {
        *icon = expand_env(icon);
    }
    for entry in config.status.values_mut() {
        if let Some(ref mut sound) = entry.sound_path {
            *sound = expand_env(sound);
        }
    }
}

/// Expand `$VAR` and `${VAR}` references and a leading `~` against `HOME`.
/// Unknown variables are left untouched rather than erroring.
pub fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut chars = input.chars().peekable();
    if input.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            out.push_str(&home.to_string_lossy());
            chars.next();
        }
    }
    while let Some(c) = chars.next() {
        if c == '$' {
            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next();
            }
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if braced {
                    if next == '}' {
                        chars.next();
                        break;
                    }
                } else if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                name.push(next);
                chars.next();
            }
            if let Ok(value) = std::env::var(&name) {
                out.push_str(&value);
            } else {
                out.push('$');
                if braced {
                    out.push('{');
                }
                out.push_str(&name);
                if braced {
                    out.push('}');
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_volume_out_of_range_fails_validation() {
        let mut config = Config::default();
        config.desktop.volume = Some(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_volume_in_range_passes() {
        let mut config = Config::default();
        config.desktop.volume = Some(0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_expand_env_dollar_brace() {
        unsafe { std::env::set_var("CLNOTIFY_TEST_VAR", "value123") };
        assert_eq!(expand_env("prefix-${CLNOTIFY_TEST_VAR}-suffix"), "prefix-value123-suffix");
        unsafe { std::env::remove_var("CLNOTIFY_TEST_VAR") };
    }

    #[test]
    fn test_expand_env_unknown_var_untouched() {
        assert_eq!(expand_env("$THIS_VAR_DOES_NOT_EXIST_ABC"), "$THIS_VAR_DOES_NOT_EXIST_ABC");
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        // HOME pointed at an empty temp dir: no config anywhere, should
        // degrade to defaults rather than panic.
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::var("HOME").ok();
        unsafe { std::env::set_var("HOME", dir.path()) };
        let config = Config::load();
        assert!(config.desktop.enabled.is_none());
        if let Some(prev) = prev {
            unsafe { std::env::set_var("HOME", prev) };
        }
    }

    #[test]
    fn test_legacy_migration() {
        let dir = tempfile::tempdir().unwrap();
        let prev = std::env::var("HOME").ok();
        unsafe { std::env::set_var("HOME", dir.path()) };
        unsafe { std::env::remove_var("CLAUDE_PLUGIN_ROOT") };

        let legacy_dir = dir.path().join(".claude-notifications");
        std::fs::create_dir_all(&legacy_dir).unwrap();
        std::fs::write(legacy_dir.join("config.json"), r#"{"behavior":{"notify_on_text_response":true}}"#).unwrap();

        let config = Config::load();
        assert!(config.behavior.notify_on_text_response);

        let migrated = dir.path().join(".claude/claude-notifications-go/config.json");
        assert!(migrated.exists());

        if let Some(prev) = prev {
            unsafe { std::env::set_var("HOME", prev) };
        }
    }
}
