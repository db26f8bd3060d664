use serde::{Deserialize, Serialize};

/// The persisted settings singleton. Exactly one row exists (id = 1),
/// created with defaults on first access.
///
/// `api_base_url` and `api_key` are tri-state: NULL = never set,
/// "" = explicitly cleared, non-empty = set. The distinction drives the
/// cascade resolver's environment-override rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub ai_provider_format: String,
    pub api_base_url: Option<String>,
    pub api_key: Option<String>,
    pub image_resolution: String,
    pub image_aspect_ratio: String,
    pub max_description_workers: i32,
    pub max_image_workers: i32,
    pub baidu_ocr_api_key: Option<String>,
    pub output_language: String,
    pub mineru_token: Option<String>,
    pub image_caption_model: Option<String>,
    pub mineru_api_base: Option<String>,
    pub text_model: Option<String>,
    pub image_model: Option<String>,
    pub updated_at: String,
}

/// Partial update of the settings singleton. Outer `None` leaves a field
/// alone; for the nullable fields the inner option distinguishes writing
/// NULL (back to "never set") from writing a value — an explicit clear is
/// expressed as `Some(Some(""))`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSettingsInput {
    pub ai_provider_format: Option<String>,
    pub api_base_url: Option<Option<String>>,
    pub api_key: Option<Option<String>>,
    pub image_resolution: Option<String>,
    pub image_aspect_ratio: Option<String>,
    pub max_description_workers: Option<i32>,
    pub max_image_workers: Option<i32>,
    pub baidu_ocr_api_key: Option<Option<String>>,
    pub output_language: Option<String>,
    pub mineru_token: Option<Option<String>>,
    pub image_caption_model: Option<Option<String>>,
    pub mineru_api_base: Option<Option<String>>,
    pub text_model: Option<Option<String>>,
    pub image_model: Option<Option<String>>,
}
