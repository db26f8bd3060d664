use std::env;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// Compiled-in fallback for the output language preference.
pub const DEFAULT_OUTPUT_LANGUAGE: &str = "zh";

/// Language codes the output-language preference may hold.
pub const OUTPUT_LANGUAGES: &[&str] = &["zh", "ja", "en", "auto"];

/// A credential value as persisted in the settings row.
///
/// NULL means the user never set it and the environment value stands.
/// An empty string means the user explicitly cleared it, which must
/// suppress the environment fallback rather than fall through to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Unset,
    Cleared,
    Set(String),
}

impl Credential {
    pub fn from_db(value: Option<String>) -> Self {
        match value {
            None => Credential::Unset,
            Some(s) if s.is_empty() => Credential::Cleared,
            Some(s) => Credential::Set(s),
        }
    }
}

/// Allowed CORS origins, parsed from the CORS_ORIGINS env var.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

/// Process configuration read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_path: PathBuf,
    pub cors_origins: CorsOrigins,
    pub ai_provider_format: String,
    pub google_api_base: String,
    pub openai_api_base: String,
    pub google_api_key: String,
    pub openai_api_key: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        // Packaged deployments pass an absolute database path; dev mode
        // falls back to a relative instance directory.
        let database_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("instance").join("database.db"));

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5000);

        let raw_cors =
            env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let cors_origins = parse_cors_origins(&raw_cors);

        Self {
            port,
            database_path,
            cors_origins,
            ai_provider_format: env::var("AI_PROVIDER_FORMAT")
                .unwrap_or_else(|_| "gemini".to_string()),
            google_api_base: env::var("GOOGLE_API_BASE").unwrap_or_default(),
            openai_api_base: env::var("OPENAI_API_BASE").unwrap_or_default(),
            google_api_key: env::var("GOOGLE_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }

    /// The effective configuration before any persisted settings are merged.
    pub fn initial_effective(&self) -> EffectiveConfig {
        EffectiveConfig {
            ai_provider_format: self.ai_provider_format.clone(),
            google_api_base: self.google_api_base.clone(),
            openai_api_base: self.openai_api_base.clone(),
            google_api_key: self.google_api_key.clone(),
            openai_api_key: self.openai_api_key.clone(),
            default_resolution: "2K".to_string(),
            default_aspect_ratio: "16:9".to_string(),
            max_description_workers: 5,
            max_image_workers: 3,
        }
    }
}

fn parse_cors_origins(raw: &str) -> CorsOrigins {
    if raw.trim() == "*" {
        CorsOrigins::Any
    } else {
        CorsOrigins::List(
            raw.split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

/// The merged runtime configuration the rest of the service reads.
///
/// Owned by whoever holds the `SharedConfig`; written only by the cascade
/// resolver, at startup and again after a settings update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveConfig {
    pub ai_provider_format: String,
    pub google_api_base: String,
    pub openai_api_base: String,
    pub google_api_key: String,
    pub openai_api_key: String,
    pub default_resolution: String,
    pub default_aspect_ratio: String,
    pub max_description_workers: i32,
    pub max_image_workers: i32,
}

pub type SharedConfig = Arc<RwLock<EffectiveConfig>>;
