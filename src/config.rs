// src/config.rs
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{Result, ScoutError};
use crate::linkedin::filter::{LocationPolicy, LocationRuleConfig, DEFAULT_ROLE_KEYWORDS};
use crate::linkedin::geo::GeoTable;

pub const DEFAULT_API_HOST: &str = "fresh-linkedin-profile-data.p.rapidapi.com";
pub const DEFAULT_CONFIG_FILE: &str = "jobfeed.yaml";
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;

pub const DEFAULT_DECISION_MAKER_TITLES: &[&str] = &[
    "CEO",
    "Founder",
    "Co-Founder",
    "Owner",
    "CFO",
    "Managing Director",
    "Director",
    "Practice Manager",
    "General Manager",
];

#[derive(Debug, Clone)]
pub struct ScoutConfig {
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub geo: GeoTable,
    pub policy: LocationPolicy,
    pub search: SearchDefaults,
    pub decision_makers: DecisionMakerDefaults,
    /// Retention threshold of the downstream matcher (0-100)
    pub match_threshold: u8,
    /// Window of the downstream contact cache
    pub contact_cache_days: u32,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub host: String,
    pub base_url: String,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct SearchDefaults {
    pub role_keywords: Vec<String>,
    pub industries: Vec<String>,
    pub window_hours: u32,
}

#[derive(Debug, Clone)]
pub struct DecisionMakerDefaults {
    pub titles: Vec<String>,
    pub geo_codes: Vec<u64>,
    pub limit: u32,
}

/// Optional YAML overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub geo_codes: Option<Vec<GeoEntry>>,
    #[serde(default)]
    pub locations: Option<Vec<LocationRuleConfig>>,
    #[serde(default)]
    pub role_keywords: Option<Vec<String>>,
    #[serde(default)]
    pub industries: Option<Vec<String>>,
    #[serde(default)]
    pub decision_maker_titles: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeoEntry {
    pub city: String,
    pub code: u64,
}

impl ApiConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.trim().is_empty())
    }
}

impl ScoutConfig {
    /// Load from the process environment plus a YAML file. An explicit path
    /// must exist; otherwise `JOBFEED_CONFIG` (default `jobfeed.yaml`) is read
    /// when present.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let config = Self::from_lookup(|key| std::env::var(key).ok())?;

        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (
                std::env::var("JOBFEED_CONFIG")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE)),
                false,
            ),
        };

        match Self::read_file(&path)? {
            Some(file) => {
                info!("Loaded configuration overrides from {}", path.display());
                config.with_file(file)
            }
            None if required => Err(ScoutError::config(format!(
                "Config file not found: {}",
                path.display()
            ))),
            None => Ok(config),
        }
    }

    /// Build from an arbitrary key lookup so tests need not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = get("RAPIDAPI_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());
        let base_url = get("RAPIDAPI_BASE_URL").unwrap_or_else(|| format!("https://{}", host));

        let api = ApiConfig {
            api_key: get("RAPIDAPI_KEY"),
            base_url: base_url.trim_end_matches('/').to_string(),
            host,
            timeout_seconds: parse_number(&get, "JOBFEED_TIMEOUT_SECONDS", 30)?,
            max_attempts: parse_number(&get, "JOBFEED_MAX_ATTEMPTS", 3)?,
            retry_backoff_ms: parse_number(&get, "JOBFEED_RETRY_BACKOFF_MS", 1_000)?,
        };

        let rate_limit = RateLimitConfig {
            max_calls: parse_number(&get, "JOBFEED_RATE_MAX_CALLS", 10)?,
            window_seconds: parse_number(&get, "JOBFEED_RATE_WINDOW_SECONDS", 60)?,
        };

        let role_keywords: Vec<String> =
            DEFAULT_ROLE_KEYWORDS.iter().map(|s| s.to_string()).collect();
        let geo = GeoTable::default();

        let config = Self {
            api,
            rate_limit,
            policy: LocationPolicy::default_with_roles(&role_keywords)?,
            search: SearchDefaults {
                role_keywords,
                industries: vec!["Financial Services".to_string()],
                window_hours: parse_number(&get, "JOBS_WINDOW_HOURS", 24)?,
            },
            decision_makers: DecisionMakerDefaults {
                titles: DEFAULT_DECISION_MAKER_TITLES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                geo_codes: vec![geo.code_for("Melbourne")?],
                limit: 5,
            },
            geo,
            match_threshold: parse_number(&get, "MATCH_THRESHOLD", 85)?,
            contact_cache_days: parse_number(&get, "CONTACT_CACHE_DAYS", 30)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn read_file(path: &Path) -> Result<Option<FileConfig>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        let file = serde_yaml::from_str(&content).map_err(|e| {
            ScoutError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(file))
    }

    /// Apply YAML overrides on top of the environment configuration.
    pub fn with_file(mut self, file: FileConfig) -> Result<Self> {
        if let Some(entries) = file.geo_codes {
            self.geo = GeoTable::from_entries(
                entries.into_iter().map(|entry| (entry.city, entry.code)),
            )?;
        }

        if let Some(keywords) = file.role_keywords {
            self.search.role_keywords = keywords;
            self.policy = LocationPolicy::default_with_roles(&self.search.role_keywords)?;
        }

        if let Some(rules) = file.locations {
            self.policy = LocationPolicy::from_configs(rules)?;
        }

        if let Some(industries) = file.industries {
            self.search.industries = industries;
        }

        if let Some(titles) = file.decision_maker_titles {
            self.decision_makers.titles = titles;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.api.max_attempts == 0 || self.api.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(ScoutError::config(format!(
                "JOBFEED_MAX_ATTEMPTS must be between 1 and {}",
                MAX_ATTEMPTS_LIMIT
            )));
        }
        if self.api.timeout_seconds == 0 {
            return Err(ScoutError::config("JOBFEED_TIMEOUT_SECONDS must be positive"));
        }
        if self.rate_limit.max_calls == 0 || self.rate_limit.window_seconds == 0 {
            return Err(ScoutError::InvalidRateLimit {
                max_calls: self.rate_limit.max_calls,
                window_seconds: self.rate_limit.window_seconds,
            });
        }
        if self.match_threshold > 100 {
            return Err(ScoutError::config("MATCH_THRESHOLD must be between 0 and 100"));
        }
        if self.search.role_keywords.is_empty() {
            return Err(ScoutError::config("role_keywords must not be empty"));
        }
        for code in &self.decision_makers.geo_codes {
            if !self.geo.contains_code(*code) {
                return Err(ScoutError::config(format!(
                    "Default decision maker geo code {} is not in geo_codes",
                    code
                )));
            }
        }
        for rule in self.policy.rules() {
            if self.geo.code_for(&rule.name).is_err() {
                warn!(
                    "Location rule {:?} has no geo code and will not be swept",
                    rule.name
                );
            }
        }
        Ok(())
    }
}

fn parse_number<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ScoutError::config(format!("{} must be a valid number, got {:?}", key, raw))),
        None => Ok(default),
    }
}
