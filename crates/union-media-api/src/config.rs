use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;
use union_media_core::util::is_http_url;
use url::Url;

const DEFAULT_MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;
const MIN_REQUEST_BODY_BYTES: usize = 1024;
const MAX_REQUEST_BODY_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub supabase_anon_key: String,
    pub supabase_user_url: String,
    pub media_api_base_url: String,
    pub max_request_body_bytes: usize,
    pub media: Option<MediaHostConfig>,
}

/// Credentials for the media host account.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaHostConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for MediaHostConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MediaHostConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("supabase_anon_key", &"[REDACTED]")
            .field("supabase_user_url", &self.supabase_user_url)
            .field("media_api_base_url", &self.media_api_base_url)
            .field("max_request_body_bytes", &self.max_request_body_bytes)
            .field("media", &self.media)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::from_lookup(|name| values.get(name).cloned())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = value_or_default(&lookup, "UNION_MEDIA_BIND_ADDR", "127.0.0.1:8080");

        let supabase_url = trim_trailing(&required_trimmed(&lookup, "SUPABASE_URL")?).to_string();
        let supabase_anon_key = required_trimmed(&lookup, "SUPABASE_ANON_KEY")?;
        ensure_http_url("SUPABASE_URL", &supabase_url)?;

        let default_user_url = format!("{supabase_url}/auth/v1/user");
        let supabase_user_url = value_or_default(&lookup, "SUPABASE_AUTH_USER_URL", &default_user_url);
        ensure_http_url("SUPABASE_AUTH_USER_URL", &supabase_user_url)?;

        let media_api_base_url = trim_trailing(&value_or_default(
            &lookup,
            "CLOUDINARY_API_BASE_URL",
            "https://api.cloudinary.com",
        ))
        .to_string();
        ensure_http_url("CLOUDINARY_API_BASE_URL", &media_api_base_url)?;

        let max_request_body_bytes = value_or_default(
            &lookup,
            "MAX_REQUEST_BODY_BYTES",
            &DEFAULT_MAX_REQUEST_BODY_BYTES.to_string(),
        )
        .parse::<usize>()
        .map_err(|_| {
            ConfigError::Invalid(
                "MAX_REQUEST_BODY_BYTES must be an integer in [1024, 104857600]".to_string(),
            )
        })?;
        if !(MIN_REQUEST_BODY_BYTES..=MAX_REQUEST_BODY_BYTES).contains(&max_request_body_bytes) {
            return Err(ConfigError::Invalid(
                "MAX_REQUEST_BODY_BYTES must be in [1024, 104857600]".to_string(),
            ));
        }

        let media = parse_media_config(&lookup)?;

        Ok(Self {
            bind_addr,
            supabase_anon_key,
            supabase_user_url,
            media_api_base_url,
            max_request_body_bytes,
            media,
        })
    }
}

fn parse_media_config(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<MediaHostConfig>, ConfigError> {
    let cloud_name = optional_trimmed(&lookup, "CLOUDINARY_CLOUD_NAME");
    let api_key = optional_trimmed(&lookup, "CLOUDINARY_API_KEY");
    let api_secret = optional_trimmed(&lookup, "CLOUDINARY_API_SECRET");

    let any_set = cloud_name.is_some() || api_key.is_some() || api_secret.is_some();
    if !any_set {
        return Ok(None);
    }

    let cloud_name = cloud_name.ok_or(ConfigError::MissingVar("CLOUDINARY_CLOUD_NAME"))?;
    let api_key = api_key.ok_or(ConfigError::MissingVar("CLOUDINARY_API_KEY"))?;
    let api_secret = api_secret.ok_or(ConfigError::MissingVar("CLOUDINARY_API_SECRET"))?;

    Ok(Some(MediaHostConfig {
        cloud_name,
        api_key,
        api_secret,
    }))
}

fn value_or_default(lookup: impl Fn(&str) -> Option<String>, name: &str, default: &str) -> String {
    optional_trimmed(lookup, name).unwrap_or_else(|| default.to_string())
}

fn required_trimmed(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional_trimmed(lookup, name).ok_or(ConfigError::MissingVar(name))
}

fn optional_trimmed(lookup: impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn ensure_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    if !is_http_url(value) || Url::parse(value).is_err() {
        return Err(ConfigError::Invalid(format!(
            "{name} must be a valid http:// or https:// URL"
        )));
    }
    Ok(())
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn minimal() -> HashMap<&'static str, &'static str> {
        let mut map = HashMap::new();
        map.insert("SUPABASE_URL", "https://project.supabase.co/");
        map.insert("SUPABASE_ANON_KEY", "sensitive-anon-key");
        map
    }

    fn load(map: &HashMap<&str, &str>) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn config_requires_session_service() {
        let map: HashMap<&str, &str> = HashMap::new();
        let err = load(&map).unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn config_applies_defaults() {
        let config = load(&minimal()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(
            config.supabase_user_url,
            "https://project.supabase.co/auth/v1/user"
        );
        assert_eq!(config.media_api_base_url, "https://api.cloudinary.com");
        assert_eq!(config.max_request_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.media, None);
    }

    #[test]
    fn config_rejects_partial_media_credentials() {
        let mut map = minimal();
        map.insert("CLOUDINARY_CLOUD_NAME", "union");
        map.insert("CLOUDINARY_API_KEY", "123456");
        let err = load(&map).unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_API_SECRET"));
    }

    #[test]
    fn config_rejects_out_of_range_body_limit() {
        let mut map = minimal();
        map.insert("MAX_REQUEST_BODY_BYTES", "12");
        assert!(load(&map).is_err());

        map.insert("MAX_REQUEST_BODY_BYTES", "lots");
        assert!(load(&map).is_err());
    }

    #[test]
    fn config_rejects_non_http_urls() {
        let mut map = minimal();
        map.insert("CLOUDINARY_API_BASE_URL", "ftp://api.cloudinary.com");
        let err = load(&map).unwrap_err();
        assert!(err.to_string().contains("CLOUDINARY_API_BASE_URL"));
    }

    #[test]
    fn config_redacts_sensitive_debug_fields() {
        let mut map = minimal();
        map.insert("CLOUDINARY_CLOUD_NAME", "union");
        map.insert("CLOUDINARY_API_KEY", "123456");
        map.insert("CLOUDINARY_API_SECRET", "sensitive-api-secret");

        let config = load(&map).unwrap();
        assert!(config.media.is_some());

        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("sensitive-api-secret"));
        assert!(!debug_output.contains("sensitive-anon-key"));
        assert!(debug_output.contains("[REDACTED]"));
    }
}
