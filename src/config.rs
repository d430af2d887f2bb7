use crate::error::{AppError, Result};

pub const PRIMARY_SOURCE_URL: &str =
    "https://www.ine.pt/ine/json_indicador/pindica.jsp?op=2&varcd=0009492&Dim2={municipality}&lang=EN";
pub const SECONDARY_SOURCE_URL: &str =
    "https://www.pordata.pt/api/municipalities/{municipality}/housing";
/// JSON pointers into each source's response body.
pub const PRIMARY_PRICE_POINTER: &str = "/price";
pub const PRIMARY_TREND_POINTER: &str = "/trend";
pub const SECONDARY_PRICE_POINTER: &str = "/average_price";
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const OPENAI_MODEL: &str = "gpt-4o";

/// Area statistics stay valid for exactly this long after being cached.
pub const CACHE_TTL_DAYS: i64 = 7;

/// Fallback stats are cached too, but only this long, so sources are retried
/// soon after an outage without every request paying the source timeout.
pub const FALLBACK_CACHE_TTL_MINUTES: i64 = 60;

/// Default per-source request timeout (seconds).
pub const SOURCE_TIMEOUT_SECS: u64 = 5;

/// National average price per m² used when every price source fails.
pub const FALLBACK_PRICE_PER_M2: f64 = 1644.0;

/// National year-over-year price trend used when no source reports one.
pub const FALLBACK_TREND_PERCENT: f64 = 5.0;

/// Source label attached to stats built from the fallback constants.
pub const FALLBACK_SOURCE_LABEL: &str = "fallback";

/// Weights for combining source quotes. Renormalised over the sources that answer.
pub const PRIMARY_SOURCE_WEIGHT: f64 = 0.7;
pub const SECONDARY_SOURCE_WEIGHT: f64 = 0.3;

/// Regional premium multipliers, matched as substrings of the lower-cased region.
/// First match wins.
pub const REGIONAL_PREMIUMS: &[(&str, f64)] = &[("lisboa", 1.4), ("porto", 1.2), ("algarve", 1.3)];

/// Monthly rent yield as a fraction of purchase price, by price band.
pub mod yield_tiers {
    pub const DEFAULT: f64 = 0.008;
    /// price > 500_000
    pub const LUXURY: f64 = 0.006;
    /// 300_000 < price <= 500_000
    pub const UPPER: f64 = 0.007;
    /// price < 100_000
    pub const LOW: f64 = 0.009;

    pub const LUXURY_MIN: f64 = 500_000.0;
    pub const UPPER_MIN: f64 = 300_000.0;
    pub const LOW_MAX: f64 = 100_000.0;

    /// Yield shift applied when the listing deviates from the area average.
    pub const AREA_ADJUSTMENT: f64 = 0.0005;
    /// Deviation (in percent) beyond which the area adjustment kicks in.
    pub const AREA_DEVIATION_THRESHOLD: i64 = 10;
}

/// Monthly expenses as a fraction of monthly rent.
pub mod expense_ratios {
    pub const DEFAULT: f64 = 0.40;
    pub const NEWER: f64 = 0.35;
    pub const OLDER: f64 = 0.45;

    pub const NEWER_KEYWORDS: &[&str] = &["new", "renovated", "modern"];
    pub const OLDER_KEYWORDS: &[&str] = &["old", "needs work", "fixer"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Sqlite,
    Memory,
}

impl std::fmt::Display for CacheBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackend::Sqlite => write!(f, "sqlite"),
            CacheBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Where area statistics are cached (CACHE_BACKEND: sqlite | memory)
    pub cache_backend: CacheBackend,
    /// URL template for the primary price source; `{municipality}` is substituted
    pub primary_source_url: String,
    /// URL template for the secondary price source
    pub secondary_source_url: String,
    /// JSON pointer to the price in primary responses (PRIMARY_PRICE_POINTER)
    pub primary_price_pointer: String,
    /// JSON pointer to the trend in primary responses; `None` when the source has none
    pub primary_trend_pointer: Option<String>,
    pub secondary_price_pointer: String,
    pub secondary_trend_pointer: Option<String>,
    /// Per-source timeout in seconds (SOURCE_TIMEOUT_SECS)
    pub source_timeout_secs: u64,
    /// Serve area prices from static national figures instead of the network
    /// (VALUATOR_MOCK_SOURCES). Passed down explicitly, never read globally.
    pub mock_sources: bool,
    /// Enables POST /analyze-content when present (OPENAI_API_KEY)
    pub openai_api_key: Option<String>,
    pub openai_api_url: String,
    pub openai_model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            db_path: "valuator.db".to_string(),
            api_port: 3000,
            cache_backend: CacheBackend::Sqlite,
            primary_source_url: PRIMARY_SOURCE_URL.to_string(),
            secondary_source_url: SECONDARY_SOURCE_URL.to_string(),
            primary_price_pointer: PRIMARY_PRICE_POINTER.to_string(),
            primary_trend_pointer: Some(PRIMARY_TREND_POINTER.to_string()),
            secondary_price_pointer: SECONDARY_PRICE_POINTER.to_string(),
            secondary_trend_pointer: None,
            source_timeout_secs: SOURCE_TIMEOUT_SECS,
            mock_sources: false,
            openai_api_key: None,
            openai_api_url: OPENAI_API_URL.to_string(),
            openai_model: OPENAI_MODEL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            db_path: std::env::var("DB_PATH").unwrap_or(defaults.db_path),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            cache_backend: match std::env::var("CACHE_BACKEND") {
                Ok(v) => parse_cache_backend(&v)?,
                Err(_) => defaults.cache_backend,
            },
            primary_source_url: std::env::var("PRIMARY_SOURCE_URL")
                .unwrap_or(defaults.primary_source_url),
            secondary_source_url: std::env::var("SECONDARY_SOURCE_URL")
                .unwrap_or(defaults.secondary_source_url),
            primary_price_pointer: match std::env::var("PRIMARY_PRICE_POINTER") {
                Ok(v) => parse_pointer("PRIMARY_PRICE_POINTER", &v)?,
                Err(_) => defaults.primary_price_pointer,
            },
            primary_trend_pointer: match std::env::var("PRIMARY_TREND_POINTER") {
                Ok(v) => parse_optional_pointer("PRIMARY_TREND_POINTER", &v)?,
                Err(_) => defaults.primary_trend_pointer,
            },
            secondary_price_pointer: match std::env::var("SECONDARY_PRICE_POINTER") {
                Ok(v) => parse_pointer("SECONDARY_PRICE_POINTER", &v)?,
                Err(_) => defaults.secondary_price_pointer,
            },
            secondary_trend_pointer: match std::env::var("SECONDARY_TREND_POINTER") {
                Ok(v) => parse_optional_pointer("SECONDARY_TREND_POINTER", &v)?,
                Err(_) => defaults.secondary_trend_pointer,
            },
            source_timeout_secs: std::env::var("SOURCE_TIMEOUT_SECS")
                .unwrap_or_else(|_| SOURCE_TIMEOUT_SECS.to_string())
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| {
                    AppError::Config("SOURCE_TIMEOUT_SECS must be a positive integer".to_string())
                })?,
            mock_sources: match std::env::var("VALUATOR_MOCK_SOURCES") {
                Ok(v) => parse_flag(&v).ok_or_else(|| {
                    AppError::Config(format!("VALUATOR_MOCK_SOURCES must be true/false, got {v:?}"))
                })?,
                Err(_) => defaults.mock_sources,
            },
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            openai_api_url: std::env::var("OPENAI_API_URL").unwrap_or(defaults.openai_api_url),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
        })
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// A JSON pointer is empty (the whole document) or starts with `/`.
fn parse_pointer(var: &str, v: &str) -> Result<String> {
    let v = v.trim();
    if v.is_empty() || v.starts_with('/') {
        Ok(v.to_string())
    } else {
        Err(AppError::Config(format!("{var} must be a JSON pointer like /data/value, got {v:?}")))
    }
}

/// Like `parse_pointer`, but blank disables the field.
fn parse_optional_pointer(var: &str, v: &str) -> Result<Option<String>> {
    if v.trim().is_empty() {
        return Ok(None);
    }
    parse_pointer(var, v).map(Some)
}

fn parse_cache_backend(v: &str) -> Result<CacheBackend> {
    match v.trim().to_ascii_lowercase().as_str() {
        "sqlite" => Ok(CacheBackend::Sqlite),
        "memory" => Ok(CacheBackend::Memory),
        other => Err(AppError::Config(format!(
            "CACHE_BACKEND must be 'sqlite' or 'memory', got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 1 "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn cache_backend_is_case_insensitive() {
        assert_eq!(parse_cache_backend("Memory").unwrap(), CacheBackend::Memory);
        assert_eq!(parse_cache_backend("sqlite").unwrap(), CacheBackend::Sqlite);
        assert!(matches!(parse_cache_backend("redis"), Err(AppError::Config(_))));
    }

    #[test]
    fn response_pointers_are_validated() {
        assert_eq!(parse_pointer("P", " /0/valor ").unwrap(), "/0/valor");
        assert!(matches!(parse_pointer("P", "valor"), Err(AppError::Config(_))));
        assert_eq!(parse_optional_pointer("P", "  ").unwrap(), None);
        assert_eq!(
            parse_optional_pointer("P", "/data/yoy").unwrap(),
            Some("/data/yoy".to_string())
        );
        assert!(parse_optional_pointer("P", "yoy").is_err());
    }

    #[test]
    fn default_config_uses_real_sources() {
        let cfg = Config::default();
        assert!(!cfg.mock_sources);
        assert_eq!(cfg.source_timeout_secs, SOURCE_TIMEOUT_SECS);
        assert!(cfg.openai_api_key.is_none());
    }
}
