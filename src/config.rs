use std::path::PathBuf;

use chrono::Local;

/// Application-level constants
pub const APP_NAME: &str = "cargoscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// OpenRouter chat-completions endpoint base.
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable holding the OpenRouter API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Default vision model for extraction.
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";

/// Completion limits sent with every request.
pub const MAX_TOKENS: u32 = 64_000;
pub const TEMPERATURE: f32 = 0.0;

/// Total collaborator rounds per image: the initial extraction plus
/// correction rounds. A value of 1 disables correction entirely.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// HTTP timeout for a single model call. Vision extraction on large
/// images can take minutes on slower models.
pub const REQUEST_TIMEOUT_SECS: u64 = 300;

pub fn default_log_filter() -> &'static str {
    "cargoscan=info"
}

/// Timestamped default output path: `output/container_data_YYYYMMDD_HHMMSS.json`
pub fn default_output_path() -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("output").join(format!("container_data_{timestamp}.json"))
}

/// Timestamped default evaluation report path.
pub fn default_report_path() -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("output").join(format!("test_results_{timestamp}.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_cargoscan() {
        assert_eq!(APP_NAME, "cargoscan");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn default_output_path_under_output_dir() {
        let path = default_output_path();
        assert!(path.starts_with("output"));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("container_data_"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn default_report_path_under_output_dir() {
        let path = default_report_path();
        assert!(path.starts_with("output"));
        assert!(path.extension().is_some_and(|e| e == "json"));
    }

    #[test]
    fn one_iteration_means_no_correction() {
        // Round 1 is the initial extraction, so the default budget leaves
        // two correction rounds.
        assert!(DEFAULT_MAX_ITERATIONS > 1);
    }
}
