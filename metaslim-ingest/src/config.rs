//! Configuration resolution for metaslim-ingest
//!
//! Multi-tier resolution with Database → ENV → TOML priority. The database
//! tier is authoritative so keys entered at runtime survive restarts without
//! touching files.

use metaslim_common::config::TomlConfig;
use metaslim_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Firestore selection resolved from configuration
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub api_key: Option<String>,
}

/// Resolve the Gemini API key from 3-tier configuration.
///
/// Priority: Database → ENV → TOML. Returns None when no tier holds a valid
/// key; the service still starts and extraction reports the missing key.
pub async fn resolve_gemini_api_key(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
) -> Result<Option<String>> {
    let db_key = crate::db::settings::get_gemini_api_key(db).await?;
    let env_key = std::env::var("METASLIM_GEMINI_API_KEY").ok();
    let toml_key = toml_config.gemini_api_key.clone();

    let mut sources = Vec::new();
    if db_key.as_deref().is_some_and(is_valid_key) {
        sources.push("database");
    }
    if env_key.as_deref().is_some_and(is_valid_key) {
        sources.push("environment");
    }
    if toml_key.as_deref().is_some_and(is_valid_key) {
        sources.push("TOML");
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            "Gemini API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (key, source) in [
        (db_key, "database"),
        (env_key, "environment"),
        (toml_key, "TOML config"),
    ] {
        if let Some(key) = key {
            if is_valid_key(&key) {
                info!("Gemini API key loaded from {}", source);
                return Ok(Some(key));
            }
        }
    }

    warn!(
        "Gemini API key not configured. Configure using one of:\n\
         1. Environment: METASLIM_GEMINI_API_KEY=your-key-here\n\
         2. TOML config: ~/.config/metaslim/config.toml (gemini_api_key = \"your-key\")\n\
         Obtain a key at: https://aistudio.google.com/apikey"
    );
    Ok(None)
}

/// Resolve Firestore settings from ENV → TOML.
///
/// Returns None when no project id is configured anywhere, which selects the
/// local SQLite store.
pub fn resolve_firestore(toml_config: &TomlConfig) -> Option<FirestoreSettings> {
    let project_id = std::env::var("METASLIM_FIRESTORE_PROJECT_ID")
        .ok()
        .filter(|v| is_valid_key(v))
        .or_else(|| {
            toml_config
                .firestore_project_id
                .clone()
                .filter(|v| is_valid_key(v))
        })?;

    let api_key = std::env::var("METASLIM_FIRESTORE_API_KEY")
        .ok()
        .filter(|v| is_valid_key(v))
        .or_else(|| {
            toml_config
                .firestore_api_key
                .clone()
                .filter(|v| is_valid_key(v))
        });

    Some(FirestoreSettings {
        project_id,
        api_key,
    })
}

/// Validate a key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
