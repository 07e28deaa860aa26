use crate::error::{Error, Result};
use std::path::PathBuf;

/// Runtime configuration, read once at process start.
///
/// The model credential is checked here so a missing key surfaces as a
/// distinct configuration error at startup instead of a per-call failure.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Sutra API key (required)
    pub api_key: String,
    /// OpenAI-compatible endpoint base URL
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Directory uploaded files are stored in
    pub upload_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("SUTRA_API_KEY")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::Configuration("SUTRA_API_KEY environment variable not set".into())
            })?;

        Ok(Self {
            api_key,
            base_url: env_or("SUTRA_BASE_URL", "https://api.two.ai/v2"),
            model: env_or("SUTRA_MODEL", "sutra-v2"),
            upload_dir: PathBuf::from(env_or("FINADVISOR_UPLOAD_DIR", "uploads")),
            database_path: PathBuf::from(env_or("FINADVISOR_DB", "finadvisor.db")),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        std::env::remove_var("SUTRA_API_KEY");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(err.status_code(), 500);
    }
}
