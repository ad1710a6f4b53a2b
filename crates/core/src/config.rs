use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Split a comma-separated env value, dropping blanks.
pub(crate) fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub registry: RegistryConfig,
    pub filters: FilterConfig,
    pub matrix: MatrixConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `CHECKLOGIC_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("CHECKLOGIC_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            registry: RegistryConfig::from_env_profiled(p),
            filters: FilterConfig::from_env_profiled(p),
            matrix: MatrixConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  registry:    path={}",
            self.registry
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(builtin)".to_string())
        );
        tracing::info!(
            "  filters:     query_key={}, ignore_keys={:?}",
            self.filters.query_key,
            self.filters.ignore_keys
        );
        tracing::info!("  matrix:      variables={:?}", self.matrix.variables);
    }
}

// ── Check registry ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// YAML catalog to load instead of the builtin checks.
    pub path: Option<PathBuf>,
}

impl RegistryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            path: profiled_env_opt(p, "CHECKS_REGISTRY_PATH").map(PathBuf::from),
        }
    }
}

// ── Filter query strings ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Query parameter that carries the encoded filter.
    pub query_key: String,
    /// Query parameters preserved next to the filter (e.g. `view`).
    pub ignore_keys: Vec<String>,
}

impl FilterConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            query_key: profiled_env_or(p, "FILTER_QUERY_KEY", "filters"),
            ignore_keys: parse_list(&profiled_env_or(p, "FILTER_IGNORE_KEYS", "view")),
        }
    }
}

// ── Results matrix ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    /// Restrict the row axis to these variable names.
    pub variables: Option<Vec<String>>,
}

impl MatrixConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            variables: profiled_env_opt(p, "MATRIX_VARIABLES")
                .map(|raw| parse_list(&raw))
                .filter(|keys| !keys.is_empty()),
        }
    }
}
