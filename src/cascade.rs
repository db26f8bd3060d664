//! Settings cascade: merge the persisted settings singleton over the
//! environment-derived defaults. Runs once at startup and again after a
//! settings update; it may only ever refine the effective configuration,
//! never prevent the process from serving.

use crate::config::{self, Credential, EffectiveConfig};
use crate::db::repos::settings as settings_repo;
use crate::db::DbPool;

/// Merge persisted settings into `config`. Never fails: an unreadable
/// settings row logs a warning and leaves the configuration exactly as it
/// was.
pub fn resolve(pool: &DbPool, config: &mut EffectiveConfig) {
    let settings = match settings_repo::get_or_create(pool) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Could not load settings from database: {}", e);
            return;
        }
    };

    // Provider format always has a sensible default, so only a non-empty
    // persisted value overrides.
    if !settings.ai_provider_format.is_empty() {
        config.ai_provider_format = settings.ai_provider_format.clone();
        tracing::info!(format = %config.ai_provider_format, "Loaded AI provider format from settings");
    }

    // The single stored base/key feeds every provider slot that depends on
    // it. An explicit clear ("") must override the environment value; only
    // a never-set credential (NULL) leaves the environment value standing.
    match Credential::from_db(settings.api_base_url.clone()) {
        Credential::Unset => {}
        Credential::Cleared => {
            config.google_api_base.clear();
            config.openai_api_base.clear();
            tracing::info!("API base cleared in settings, suppressing environment value");
        }
        Credential::Set(url) => {
            config.google_api_base = url.clone();
            config.openai_api_base = url;
            tracing::info!(base = %config.google_api_base, "Loaded API base from settings");
        }
    }

    match Credential::from_db(settings.api_key.clone()) {
        Credential::Unset => {}
        Credential::Cleared => {
            config.google_api_key.clear();
            config.openai_api_key.clear();
            tracing::info!("API key cleared in settings, suppressing environment value");
        }
        Credential::Set(key) => {
            config.google_api_key = key.clone();
            config.openai_api_key = key;
            tracing::info!("Loaded API key from settings");
        }
    }

    // Image and worker defaults always come from the row; the row's own
    // defaulting happened when the singleton was first created.
    config.default_resolution = settings.image_resolution.clone();
    config.default_aspect_ratio = settings.image_aspect_ratio.clone();
    config.max_description_workers = settings.max_description_workers;
    config.max_image_workers = settings.max_image_workers;
    tracing::info!(
        resolution = %config.default_resolution,
        aspect_ratio = %config.default_aspect_ratio,
        description_workers = config.max_description_workers,
        image_workers = config.max_image_workers,
        "Loaded image and worker defaults from settings"
    );
}

/// Output language preference, read on demand rather than cached at
/// startup. Falls back to the compiled default when the row is unreadable
/// or holds an unknown code.
pub fn output_language(pool: &DbPool) -> String {
    match settings_repo::get_or_create(pool) {
        Ok(settings) if config::OUTPUT_LANGUAGES.contains(&settings.output_language.as_str()) => {
            settings.output_language
        }
        Ok(settings) => {
            tracing::warn!(
                value = %settings.output_language,
                "Unknown output language in settings, using default"
            );
            config::DEFAULT_OUTPUT_LANGUAGE.to_string()
        }
        Err(e) => {
            tracing::warn!("Failed to load output language from settings: {}", e);
            config::DEFAULT_OUTPUT_LANGUAGE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::db::models::UpdateSettingsInput;

    fn env_config() -> EffectiveConfig {
        EffectiveConfig {
            ai_provider_format: "gemini".into(),
            google_api_base: "https://env.example/google".into(),
            openai_api_base: "https://env.example/openai".into(),
            google_api_key: "env-k".into(),
            openai_api_key: "env-k".into(),
            default_resolution: "2K".into(),
            default_aspect_ratio: "16:9".into(),
            max_description_workers: 5,
            max_image_workers: 3,
        }
    }

    #[test]
    fn unset_key_keeps_environment_value() {
        let pool = init_test_db().unwrap();
        let mut config = env_config();

        resolve(&pool, &mut config);

        assert_eq!(config.google_api_key, "env-k");
        assert_eq!(config.openai_api_key, "env-k");
        assert_eq!(config.google_api_base, "https://env.example/google");
    }

    #[test]
    fn cleared_key_suppresses_environment_value() {
        let pool = init_test_db().unwrap();
        let input = UpdateSettingsInput {
            api_key: Some(Some(String::new())),
            ..Default::default()
        };
        settings_repo::update(&pool, &input).unwrap();

        let mut config = env_config();
        resolve(&pool, &mut config);

        assert_eq!(config.google_api_key, "");
        assert_eq!(config.openai_api_key, "");
    }

    #[test]
    fn set_key_overrides_environment_value_in_every_slot() {
        let pool = init_test_db().unwrap();
        let input = UpdateSettingsInput {
            api_key: Some(Some("db-k".into())),
            api_base_url: Some(Some("https://db.example".into())),
            ..Default::default()
        };
        settings_repo::update(&pool, &input).unwrap();

        let mut config = env_config();
        resolve(&pool, &mut config);

        assert_eq!(config.google_api_key, "db-k");
        assert_eq!(config.openai_api_key, "db-k");
        assert_eq!(config.google_api_base, "https://db.example");
        assert_eq!(config.openai_api_base, "https://db.example");
    }

    #[test]
    fn image_and_worker_defaults_always_copied() {
        let pool = init_test_db().unwrap();
        let input = UpdateSettingsInput {
            image_resolution: Some("4K".into()),
            image_aspect_ratio: Some("4:3".into()),
            max_description_workers: Some(2),
            max_image_workers: Some(7),
            ..Default::default()
        };
        settings_repo::update(&pool, &input).unwrap();

        let mut config = env_config();
        resolve(&pool, &mut config);

        assert_eq!(config.default_resolution, "4K");
        assert_eq!(config.default_aspect_ratio, "4:3");
        assert_eq!(config.max_description_workers, 2);
        assert_eq!(config.max_image_workers, 7);
    }

    #[test]
    fn unreadable_settings_row_leaves_config_untouched() {
        let pool = init_test_db().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch("DROP TABLE settings;").unwrap();
        }

        let mut config = env_config();
        resolve(&pool, &mut config);

        assert_eq!(config, env_config());
    }

    #[test]
    fn output_language_reads_persisted_preference() {
        let pool = init_test_db().unwrap();
        assert_eq!(output_language(&pool), "zh");

        let input = UpdateSettingsInput {
            output_language: Some("ja".into()),
            ..Default::default()
        };
        settings_repo::update(&pool, &input).unwrap();
        assert_eq!(output_language(&pool), "ja");
    }

    #[test]
    fn output_language_falls_back_on_unknown_code_and_store_error() {
        let pool = init_test_db().unwrap();
        let input = UpdateSettingsInput {
            output_language: Some("klingon".into()),
            ..Default::default()
        };
        settings_repo::update(&pool, &input).unwrap();
        assert_eq!(output_language(&pool), "zh");

        {
            let conn = pool.get().unwrap();
            conn.execute_batch("DROP TABLE settings;").unwrap();
        }
        assert_eq!(output_language(&pool), "zh");
    }
}
