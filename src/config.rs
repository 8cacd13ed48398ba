//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a
//! type-safe struct, then validates the token settings into an immutable
//! [`JwtSettings`] that the token service is constructed with.

use std::{fmt, str::FromStr};

use jsonwebtoken::Algorithm;
use serde::Deserialize;

use crate::error::ConfigError;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `JWT_SECRET` (required): HMAC signing secret, must be non-empty
/// - `JWT_REALM` (optional): realm reported to clients, defaults to "test zone"
/// - `JWT_SIGNING_ALGORITHM` (optional): HS256, HS384 or HS512, defaults to HS256
/// - `JWT_TOKEN_LOOKUP` (optional): where to find the token, defaults to "header: Authorization"
/// - `JWT_TOKEN_HEAD_NAME` (optional): scheme before the token, defaults to "Bearer"
/// - `JWT_TIMEOUT_SECS` (optional): token lifetime, defaults to 3600
/// - `JWT_MAX_REFRESH_SECS` (optional): refresh window, defaults to 3600
/// - `JWT_IDENTITY_KEY` (optional): claim holding the username, defaults to "id"
/// - `JWT_SEND_COOKIE` (optional): also deliver tokens as a cookie, defaults to false
/// - `JWT_COOKIE_NAME` (optional): cookie name, defaults to "jwt"
/// - `API_KEYS` (optional): comma-separated static API keys, defaults to "test_admin"
#[derive(Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Absent and empty are both rejected by [`Config::jwt_settings`].
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_realm")]
    pub jwt_realm: String,

    #[serde(default = "default_algorithm")]
    pub jwt_signing_algorithm: String,

    #[serde(default = "default_token_lookup")]
    pub jwt_token_lookup: String,

    #[serde(default = "default_token_head_name")]
    pub jwt_token_head_name: String,

    #[serde(default = "default_timeout_secs")]
    pub jwt_timeout_secs: u64,

    #[serde(default = "default_timeout_secs")]
    pub jwt_max_refresh_secs: u64,

    #[serde(default = "default_identity_key")]
    pub jwt_identity_key: String,

    #[serde(default)]
    pub jwt_send_cookie: bool,

    #[serde(default = "default_cookie_name")]
    pub jwt_cookie_name: String,

    /// envy splits comma-separated values into the vector.
    #[serde(default = "default_api_keys")]
    pub api_keys: Vec<String>,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

fn default_realm() -> String {
    "test zone".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_lookup() -> String {
    "header: Authorization".to_string()
}

fn default_token_head_name() -> String {
    "Bearer".to_string()
}

fn default_timeout_secs() -> u64 {
    3600
}

fn default_identity_key() -> String {
    "id".to_string()
}

fn default_cookie_name() -> String {
    "jwt".to_string()
}

fn default_api_keys() -> Vec<String> {
    vec!["test_admin".to_string()]
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Env` if environment variable values cannot be
    /// parsed into expected types (e.g., a non-numeric `JWT_TIMEOUT_SECS`).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Field names are automatically converted: jwt_secret -> JWT_SECRET
        Ok(envy::from_env::<Config>()?)
    }

    /// Validate the token-related values and freeze them into [`JwtSettings`].
    ///
    /// # Errors
    ///
    /// - `MissingSecretKey` if the secret is empty
    /// - `InvalidSigningAlgorithm` if the algorithm is not HS256/HS384/HS512
    /// - `InvalidTokenLookup` if the lookup string has no usable source
    /// - `InvalidTimeout` if the timeout is zero or does not fit in an i64
    pub fn jwt_settings(&self) -> Result<JwtSettings, ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }

        let timeout_secs =
            i64::try_from(self.jwt_timeout_secs).map_err(|_| ConfigError::InvalidTimeout)?;
        let max_refresh_secs =
            i64::try_from(self.jwt_max_refresh_secs).map_err(|_| ConfigError::InvalidTimeout)?;

        let settings = JwtSettings {
            realm: self.jwt_realm.clone(),
            secret: self.jwt_secret.clone().into_bytes(),
            algorithm: parse_algorithm(&self.jwt_signing_algorithm)?,
            token_lookup: parse_token_lookup(&self.jwt_token_lookup)?,
            token_head_name: head_name_or_default(&self.jwt_token_head_name),
            timeout_secs,
            max_refresh_secs,
            identity_key: self.jwt_identity_key.clone(),
            send_cookie: self.jwt_send_cookie,
            cookie_name: self.jwt_cookie_name.clone(),
        };
        settings.validate()?;

        Ok(settings)
    }
}

/// Trimmed scheme name, falling back to "Bearer" when blank.
fn head_name_or_default(name: &str) -> String {
    match name.trim() {
        "" => default_token_head_name(),
        trimmed => trimmed.to_string(),
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_port", &self.server_port)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_realm", &self.jwt_realm)
            .field("jwt_signing_algorithm", &self.jwt_signing_algorithm)
            .field("jwt_token_lookup", &self.jwt_token_lookup)
            .field("jwt_timeout_secs", &self.jwt_timeout_secs)
            .field("jwt_max_refresh_secs", &self.jwt_max_refresh_secs)
            .field("api_keys", &self.api_keys.len())
            .finish_non_exhaustive()
    }
}

/// One place a token may be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// `<name>: <TokenHeadName> <token>`
    Header(String),
    /// `?<name>=<token>`
    Query(String),
    /// `Cookie: <name>=<token>`
    Cookie(String),
}

impl FromStr for TokenSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, name) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidTokenLookup(s.trim().to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigError::InvalidTokenLookup(s.trim().to_string()));
        }

        match kind.trim() {
            "header" => Ok(TokenSource::Header(name.to_string())),
            "query" => Ok(TokenSource::Query(name.to_string())),
            "cookie" => Ok(TokenSource::Cookie(name.to_string())),
            other => Err(ConfigError::InvalidTokenLookup(other.to_string())),
        }
    }
}

/// Parse `"header: Authorization, query: token, cookie: jwt"` into sources.
pub fn parse_token_lookup(lookup: &str) -> Result<Vec<TokenSource>, ConfigError> {
    let sources = lookup
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<TokenSource>, _>>()?;

    if sources.is_empty() {
        return Err(ConfigError::InvalidTokenLookup(lookup.to_string()));
    }

    Ok(sources)
}

/// Parse an algorithm name, accepting only the HMAC family.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    let algorithm = Algorithm::from_str(name.trim())
        .map_err(|_| ConfigError::InvalidSigningAlgorithm(name.to_string()))?;

    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(algorithm),
        _ => Err(ConfigError::InvalidSigningAlgorithm(name.to_string())),
    }
}

/// Immutable token settings shared by every request.
///
/// Built once at startup. The secret must stay the same for the life of
/// the process, otherwise every token issued before the change becomes
/// unverifiable.
#[derive(Clone)]
pub struct JwtSettings {
    /// Realm reported in the `WWW-Authenticate` challenge
    pub realm: String,

    /// HMAC signing secret
    pub secret: Vec<u8>,

    /// HS256, HS384 or HS512
    pub algorithm: Algorithm,

    /// Sources tried in order when extracting a token
    pub token_lookup: Vec<TokenSource>,

    /// Scheme expected before the token in header lookups
    pub token_head_name: String,

    /// Lifetime of an issued token
    pub timeout_secs: i64,

    /// How long after `orig_iat` a token may still be refreshed
    pub max_refresh_secs: i64,

    /// Claim key carrying the username
    pub identity_key: String,

    /// Whether login/refresh also set a cookie
    pub send_cookie: bool,

    /// Name of that cookie
    pub cookie_name: String,
}

impl JwtSettings {
    /// Settings with the documented defaults and the given secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            realm: default_realm(),
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            token_lookup: vec![TokenSource::Header("Authorization".to_string())],
            token_head_name: default_token_head_name(),
            timeout_secs: 3600,
            max_refresh_secs: 3600,
            identity_key: default_identity_key(),
            send_cookie: false,
            cookie_name: default_cookie_name(),
        }
    }

    /// Check the invariants the token service relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        if self.timeout_secs <= 0 || self.max_refresh_secs < 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::InvalidSigningAlgorithm(format!(
                "{:?}",
                self.algorithm
            )));
        }
        if self.token_lookup.is_empty() {
            return Err(ConfigError::InvalidTokenLookup(String::new()));
        }

        Ok(())
    }
}

impl fmt::Debug for JwtSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtSettings")
            .field("realm", &self.realm)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("token_lookup", &self.token_lookup)
            .field("token_head_name", &self.token_head_name)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_refresh_secs", &self.max_refresh_secs)
            .field("identity_key", &self.identity_key)
            .field("send_cookie", &self.send_cookie)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_secret(secret: &str) -> Config {
        Config {
            server_port: default_port(),
            jwt_secret: secret.to_string(),
            jwt_realm: default_realm(),
            jwt_signing_algorithm: default_algorithm(),
            jwt_token_lookup: default_token_lookup(),
            jwt_token_head_name: default_token_head_name(),
            jwt_timeout_secs: default_timeout_secs(),
            jwt_max_refresh_secs: default_timeout_secs(),
            jwt_identity_key: default_identity_key(),
            jwt_send_cookie: false,
            jwt_cookie_name: default_cookie_name(),
            api_keys: default_api_keys(),
        }
    }

    #[test]
    fn empty_secret_is_fatal() {
        let err = config_with_secret("").jwt_settings().unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecretKey));
    }

    #[test]
    fn defaults_produce_valid_settings() {
        let settings = config_with_secret("secret key").jwt_settings().unwrap();
        assert_eq!(settings.algorithm, Algorithm::HS256);
        assert_eq!(settings.timeout_secs, 3600);
        assert_eq!(
            settings.token_lookup,
            vec![TokenSource::Header("Authorization".to_string())]
        );
        assert_eq!(settings.identity_key, "id");
    }

    #[test]
    fn asymmetric_algorithms_are_rejected() {
        assert!(parse_algorithm("HS512").is_ok());
        assert!(matches!(
            parse_algorithm("RS256"),
            Err(ConfigError::InvalidSigningAlgorithm(_))
        ));
        assert!(matches!(
            parse_algorithm("nope"),
            Err(ConfigError::InvalidSigningAlgorithm(_))
        ));
    }

    #[test]
    fn blank_head_name_falls_back_to_bearer() {
        let mut config = config_with_secret("secret key");
        config.jwt_token_head_name = "   ".to_string();
        assert_eq!(config.jwt_settings().unwrap().token_head_name, "Bearer");

        config.jwt_token_head_name = " wen ".to_string();
        assert_eq!(config.jwt_settings().unwrap().token_head_name, "wen");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = config_with_secret("secret key");
        config.jwt_timeout_secs = 0;
        assert!(matches!(
            config.jwt_settings(),
            Err(ConfigError::InvalidTimeout)
        ));
    }

    #[test]
    fn token_lookup_parses_every_source_kind() {
        let sources = parse_token_lookup("header: Authorization, query: token, cookie: jwt").unwrap();
        assert_eq!(
            sources,
            vec![
                TokenSource::Header("Authorization".to_string()),
                TokenSource::Query("token".to_string()),
                TokenSource::Cookie("jwt".to_string()),
            ]
        );
    }

    #[test]
    fn token_lookup_rejects_unknown_sources() {
        assert!(parse_token_lookup("param: token").is_err());
        assert!(parse_token_lookup("header:").is_err());
        assert!(parse_token_lookup("").is_err());
    }

    #[test]
    fn debug_output_hides_secret() {
        let settings = JwtSettings::new("super secret");
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("super secret"));
    }
}
