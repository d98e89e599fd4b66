//! Persistent application configuration model and defaults.

use std::path::{Path, PathBuf};

use log::{info, warn};

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    /// Catalog (YouTube Data API) access.
    #[serde(default)]
    pub youtube: YoutubeConfig,
    /// Similarity service (Last.fm API) access.
    #[serde(default)]
    pub lastfm: LastfmConfig,
    /// Similarity-expansion tuning.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Catalog service credentials.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Similarity service credentials.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LastfmConfig {
    #[serde(default)]
    pub api_key: String,
}

/// Tuning knobs for the similarity expander.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct AnalysisConfig {
    /// Candidate count requested from the primary similar-tracks endpoint.
    #[serde(default = "default_similar_limit")]
    pub similar_limit: u32,
    /// Below this candidate count the expander widens to the next cascade stage.
    #[serde(default = "default_min_cascade_results")]
    pub min_cascade_results: usize,
    /// Hard cap on the recommendation list.
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            similar_limit: default_similar_limit(),
            min_cascade_results: default_min_cascade_results(),
            max_recommendations: default_max_recommendations(),
        }
    }
}

fn default_similar_limit() -> u32 {
    12
}

fn default_min_cascade_results() -> usize {
    5
}

fn default_max_recommendations() -> usize {
    10
}

/// Clamps out-of-range values back to usable ones.
pub fn sanitize_config(mut config: Config) -> Config {
    config.youtube.api_key = config.youtube.api_key.trim().to_string();
    config.lastfm.api_key = config.lastfm.api_key.trim().to_string();
    config.analysis.similar_limit = config.analysis.similar_limit.clamp(1, 50);
    config.analysis.max_recommendations = config.analysis.max_recommendations.clamp(1, 50);
    config.analysis.min_cascade_results = config
        .analysis
        .min_cascade_results
        .clamp(1, config.analysis.max_recommendations);
    config
}

/// Default on-disk location of the config file.
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|root| root.join("tunescout").join("config.toml"))
}

/// Loads the config file, creating it with defaults when missing.
/// An unreadable or unparseable file falls back to defaults with a warning.
pub fn load_or_create(config_file: &Path) -> Config {
    if !config_file.exists() {
        let default_config = sanitize_config(Config::default());
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        if let Some(parent) = config_file.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    err
                );
                return default_config;
            }
        }
        match toml::to_string(&default_config) {
            Ok(serialized) => {
                if let Err(err) = std::fs::write(config_file, serialized) {
                    warn!(
                        "Failed to write default config {}: {}",
                        config_file.display(),
                        err
                    );
                }
            }
            Err(err) => warn!("Failed to serialize default config: {}", err),
        }
        return default_config;
    }

    let content = match std::fs::read_to_string(config_file) {
        Ok(content) => content,
        Err(err) => {
            warn!(
                "Failed to read config {}: {}. Using defaults.",
                config_file.display(),
                err
            );
            return sanitize_config(Config::default());
        }
    };
    sanitize_config(toml::from_str::<Config>(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{sanitize_config, Config};

    #[test]
    fn test_sanitize_clamps_limits() {
        let mut config = Config::default();
        config.analysis.similar_limit = 0;
        config.analysis.max_recommendations = 500;
        config.analysis.min_cascade_results = 400;
        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.analysis.similar_limit, 1);
        assert_eq!(sanitized.analysis.max_recommendations, 50);
        assert_eq!(sanitized.analysis.min_cascade_results, 50);
    }

    #[test]
    fn test_sanitize_trims_api_keys() {
        let mut config = Config::default();
        config.youtube.api_key = "  key  ".to_string();
        config.lastfm.api_key = "\tother\n".to_string();
        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.youtube.api_key, "key");
        assert_eq!(sanitized.lastfm.api_key, "other");
    }

    #[test]
    fn test_min_cascade_results_never_exceeds_cap() {
        let mut config = Config::default();
        config.analysis.max_recommendations = 8;
        config.analysis.min_cascade_results = 20;
        let sanitized = sanitize_config(config);
        assert_eq!(sanitized.analysis.min_cascade_results, 8);
    }

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let parsed: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(parsed, Config::default());
        assert_eq!(parsed.analysis.similar_limit, 12);
        assert_eq!(parsed.analysis.min_cascade_results, 5);
        assert_eq!(parsed.analysis.max_recommendations, 10);
    }
}
