//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradebook_core::model::default_task_weight_fraction;
use gradebook_core::traits::EvaluationStore;

use crate::file::JsonFileStore;
use crate::http::HttpStore;
use crate::memory::InMemoryStore;

/// Which `EvaluationStore` to use.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    Memory,
    File {
        #[serde(default = "default_store_path")]
        path: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        api_key: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory => f.write_str("Memory"),
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::Http {
                base_url,
                api_key,
                timeout_secs,
            } => f
                .debug_struct("Http")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "***"))
                .field("timeout_secs", timeout_secs)
                .finish(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./gradebook-data/evaluations.json")
}

/// Top-level gradebook configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradebookConfig {
    /// Where evaluation records are kept.
    #[serde(default)]
    pub store: StoreConfig,
    /// Task share used by tasks+exam drafts that do not set one.
    #[serde(default = "default_task_weight_fraction")]
    pub default_task_weight_fraction: f64,
}

impl Default for GradebookConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_task_weight_fraction: default_task_weight_fraction(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Memory => StoreConfig::Memory,
        StoreConfig::File { path } => StoreConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        StoreConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => StoreConfig::Http {
            base_url: resolve_env_vars(base_url),
            api_key: api_key.as_ref().map(|k| resolve_env_vars(k)),
            timeout_secs: *timeout_secs,
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradebook.toml` in the current directory
/// 2. `~/.config/gradebook/config.toml`
///
/// Environment variable overrides: `GRADEBOOK_STORE_URL`, `GRADEBOOK_API_KEY`.
pub fn load_config() -> Result<GradebookConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradebookConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradebook.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<GradebookConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => GradebookConfig::default(),
    };

    apply_env_overrides(
        &mut config,
        std::env::var("GRADEBOOK_STORE_URL").ok(),
        std::env::var("GRADEBOOK_API_KEY").ok(),
    );
    config.store = resolve_store_config(&config.store);

    anyhow::ensure!(
        (0.0..=1.0).contains(&config.default_task_weight_fraction),
        "default_task_weight_fraction must be between 0 and 1, got {}",
        config.default_task_weight_fraction
    );

    Ok(config)
}

/// A store URL switches to the HTTP store; an API key applies to it.
fn apply_env_overrides(
    config: &mut GradebookConfig,
    store_url: Option<String>,
    api_key: Option<String>,
) {
    if let Some(url) = store_url {
        match &mut config.store {
            StoreConfig::Http { base_url, .. } => *base_url = url,
            other => {
                *other = StoreConfig::Http {
                    base_url: url,
                    api_key: None,
                    timeout_secs: None,
                }
            }
        }
    }

    if let Some(key) = api_key {
        if let StoreConfig::Http { api_key, .. } = &mut config.store {
            *api_key = Some(key);
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradebook"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn EvaluationStore>> {
    let store: Arc<dyn EvaluationStore> = match config {
        StoreConfig::Memory => Arc::new(InMemoryStore::new()),
        StoreConfig::File { path } => Arc::new(JsonFileStore::new(path)),
        StoreConfig::Http {
            base_url,
            api_key,
            timeout_secs,
        } => {
            anyhow::ensure!(!base_url.is_empty(), "http store requires a base_url");
            Arc::new(
                HttpStore::new(base_url, api_key.clone(), *timeout_secs)
                    .context("failed to create http store")?,
            )
        }
    };
    tracing::debug!(store = store.name(), "created store");
    Ok(store)
}
