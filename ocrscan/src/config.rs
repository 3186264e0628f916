use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

fn parse_env_opt<T: std::str::FromStr>(var: &str) -> Option<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Ignoring.", val, var, e);
                None
            }
        },
        Err(_) => None,
    }
}

/// Parse a comma-separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ocr: OcrConfig,
    pub preprocessing: PreprocessConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Backend selection in `provider/model` form, e.g. `vision/DOCUMENT_TEXT_DETECTION`.
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub language_hints: Vec<String>,
    pub timeout_secs: u64,
    pub max_payload_bytes: usize,
    pub project_id: Option<String>,
    pub location: String,
    pub processor_id: Option<String>,
    /// Path to a service-account key JSON file.
    pub credentials_path: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model: "vision/DOCUMENT_TEXT_DETECTION".to_string(),
            api_key: None,
            base_url: None,
            language_hints: vec!["ar".to_string(), "en".to_string()],
            timeout_secs: 60,
            max_payload_bytes: 10 * 1024 * 1024,
            project_id: None,
            location: "us".to_string(),
            processor_id: None,
            credentials_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreprocessConfig {
    pub enabled: bool,
    pub enhance_contrast: bool,
    pub sharpen: bool,
    pub denoise: bool,
    pub binarize: bool,
    pub max_resolution: u32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            enhance_contrast: true,
            sharpen: true,
            denoise: true,
            binarize: false,
            max_resolution: 2048,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let ocr_defaults = OcrConfig::default();
        let pre_defaults = PreprocessConfig::default();

        Self {
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or(ocr_defaults.model),
                api_key: env::var("OCR_API_KEY").ok(),
                base_url: env::var("OCR_BASE_URL").ok(),
                language_hints: env::var("OCR_LANGUAGE_HINTS")
                    .map(|hints| parse_list(&hints))
                    .unwrap_or(ocr_defaults.language_hints),
                timeout_secs: parse_env_opt("OCR_TIMEOUT")
                    .filter(|&secs: &u64| {
                        if secs == 0 {
                            tracing::warn!("OCR_TIMEOUT must be positive. Using default.");
                        }
                        secs > 0
                    })
                    .unwrap_or(ocr_defaults.timeout_secs),
                max_payload_bytes: parse_env_or(
                    "OCR_MAX_PAYLOAD_BYTES",
                    ocr_defaults.max_payload_bytes,
                ),
                project_id: env::var("DOCAI_PROJECT_ID").ok(),
                location: env::var("DOCAI_LOCATION").unwrap_or(ocr_defaults.location),
                processor_id: env::var("DOCAI_PROCESSOR_ID").ok(),
                credentials_path: env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            },
            preprocessing: PreprocessConfig {
                enabled: parse_env_or("OCR_PREPROCESS", pre_defaults.enabled),
                enhance_contrast: parse_env_or(
                    "OCR_ENHANCE_CONTRAST",
                    pre_defaults.enhance_contrast,
                ),
                sharpen: parse_env_or("OCR_SHARPEN", pre_defaults.sharpen),
                denoise: parse_env_or("OCR_DENOISE", pre_defaults.denoise),
                binarize: parse_env_or("OCR_BINARIZE", pre_defaults.binarize),
                max_resolution: parse_env_opt("OCR_MAX_RESOLUTION")
                    .filter(|&res: &u32| {
                        if res == 0 {
                            tracing::warn!("OCR_MAX_RESOLUTION must be positive. Using default.");
                        }
                        res > 0
                    })
                    .unwrap_or(pre_defaults.max_resolution),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}

/// Known recognition providers.
pub const KNOWN_OCR_PROVIDERS: &[&str] = &["vision", "documentai"];

/// Parse an OCR model string into (provider, model) tuple.
///
/// A bare string without a `/` is treated as a Cloud Vision feature name.
pub fn parse_ocr_provider_model(model: &str) -> (&str, &str) {
    match model.split_once('/') {
        Some((prefix, rest)) => (prefix, rest),
        None => ("vision", model),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const OCR_VARS: &[&str] = &[
        "OCR_MODEL",
        "OCR_API_KEY",
        "OCR_BASE_URL",
        "OCR_LANGUAGE_HINTS",
        "OCR_TIMEOUT",
        "OCR_MAX_PAYLOAD_BYTES",
        "DOCAI_PROJECT_ID",
        "DOCAI_LOCATION",
        "DOCAI_PROCESSOR_ID",
        "GOOGLE_APPLICATION_CREDENTIALS",
        "OCR_PREPROCESS",
        "OCR_ENHANCE_CONTRAST",
        "OCR_SHARPEN",
        "OCR_DENOISE",
        "OCR_BINARIZE",
        "OCR_MAX_RESOLUTION",
    ];

    fn clear_env() {
        for var in OCR_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_ocr_config_defaults() {
        clear_env();

        let config = Config::default();
        assert_eq!(config.ocr.model, "vision/DOCUMENT_TEXT_DETECTION");
        assert!(config.ocr.api_key.is_none());
        assert_eq!(config.ocr.language_hints, vec!["ar", "en"]);
        assert_eq!(config.ocr.timeout_secs, 60);
        assert_eq!(config.ocr.max_payload_bytes, 10485760);
        assert_eq!(config.ocr.location, "us");
    }

    #[test]
    #[serial]
    fn test_preprocess_config_defaults() {
        clear_env();

        let config = Config::default();
        let pre = &config.preprocessing;
        assert!(pre.enabled);
        assert!(pre.enhance_contrast);
        assert!(pre.sharpen);
        assert!(pre.denoise);
        assert!(!pre.binarize);
        assert_eq!(pre.max_resolution, 2048);
    }

    #[test]
    #[serial]
    fn test_ocr_config_from_env() {
        clear_env();
        std::env::set_var("OCR_MODEL", "documentai/ocr");
        std::env::set_var("OCR_LANGUAGE_HINTS", " ar , ,fr ");
        std::env::set_var("OCR_TIMEOUT", "15");
        std::env::set_var("DOCAI_PROJECT_ID", "my-project");
        std::env::set_var("DOCAI_LOCATION", "eu");
        std::env::set_var("DOCAI_PROCESSOR_ID", "abc123");

        let config = Config::from_env();
        assert_eq!(config.ocr.model, "documentai/ocr");
        assert_eq!(config.ocr.language_hints, vec!["ar", "fr"]);
        assert_eq!(config.ocr.timeout_secs, 15);
        assert_eq!(config.ocr.project_id.as_deref(), Some("my-project"));
        assert_eq!(config.ocr.location, "eu");
        assert_eq!(config.ocr.processor_id.as_deref(), Some("abc123"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back_to_defaults() {
        clear_env();
        std::env::set_var("OCR_TIMEOUT", "soon");
        std::env::set_var("OCR_BINARIZE", "maybe");
        std::env::set_var("OCR_MAX_RESOLUTION", "0");

        let config = Config::default();
        assert_eq!(config.ocr.timeout_secs, 60);
        assert!(!config.preprocessing.binarize);
        assert_eq!(config.preprocessing.max_resolution, 2048);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_timeout_falls_back_to_default() {
        clear_env();
        std::env::set_var("OCR_TIMEOUT", "0");

        let config = Config::default();
        assert_eq!(config.ocr.timeout_secs, 60);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_preprocess_config_from_env() {
        clear_env();
        std::env::set_var("OCR_PREPROCESS", "false");
        std::env::set_var("OCR_BINARIZE", "true");
        std::env::set_var("OCR_MAX_RESOLUTION", "1024");

        let config = Config::default();
        assert!(!config.preprocessing.enabled);
        assert!(config.preprocessing.binarize);
        assert_eq!(config.preprocessing.max_resolution, 1024);

        clear_env();
    }

    #[test]
    fn test_parse_ocr_provider_model() {
        assert_eq!(
            parse_ocr_provider_model("vision/TEXT_DETECTION"),
            ("vision", "TEXT_DETECTION")
        );
        assert_eq!(
            parse_ocr_provider_model("DocumentAI/ocr"),
            ("DocumentAI", "ocr")
        );
        assert_eq!(
            parse_ocr_provider_model("DOCUMENT_TEXT_DETECTION"),
            ("vision", "DOCUMENT_TEXT_DETECTION")
        );
        assert_eq!(
            parse_ocr_provider_model("tesseract/eng"),
            ("tesseract", "eng")
        );
    }
}
