//! Token issuance, verification, refresh and authorization.
//!
//! [`TokenService`] is the whole token pipeline. Handlers and the token
//! middleware only orchestrate calls into it:
//!
//! - login: `issue_token` (credentials -> identity -> claims -> signed token)
//! - every protected request: `extract_token` -> `verify_token` ->
//!   `resolve_identity` -> `authorize`
//! - refresh: `refresh_token` (signature check, refresh window, re-sign)
//!
//! Per token the lifecycle is `Issued -> Valid (now < exp) -> Expired`.
//! A token can be refreshed into a new `Issued` token while
//! `now <= orig_iat + max_refresh`; after that the user must log in again.
//!
//! The service holds only immutable settings and keys, so a single
//! instance behind an `Arc` serves any number of concurrent requests.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::Query,
    http::{
        HeaderMap, HeaderValue, StatusCode, Uri,
        header::{COOKIE, WWW_AUTHENTICATE},
    },
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde_json::Value;

use crate::{
    config::{JwtSettings, TokenSource},
    error::{AppError, ConfigError, json_error},
    models::{
        claims::{self, EXP_KEY, MapClaims, ORIG_IAT_KEY},
        identity::{Credentials, Identity},
        token::IssuedToken,
    },
    services::credential_store::CredentialVerifier,
};

/// Username allowed through by [`default_authorize`].
pub const PRIVILEGED_USERNAME: &str = "admin";

/// Builds claims from an identity at login. Receives the identity key.
pub type BuildClaimsFn = fn(&str, &Identity) -> MapClaims;

/// Maps verified claims back to an identity. Receives the identity key.
pub type ResolveIdentityFn = fn(&str, &MapClaims) -> Option<Identity>;

/// Decides whether an identity may access a route (the request path).
pub type AuthorizeFn = fn(&Identity, &str) -> bool;

/// Renders a failed authentication or authorization.
pub type UnauthorizedFn = fn(StatusCode, &str) -> Response;

/// Pluggable pieces of the token pipeline.
///
/// `build_claims` and `resolve_identity` must be inverse of each other for
/// the fields that go into the token.
#[derive(Debug, Clone, Copy)]
pub struct TokenHooks {
    pub build_claims: BuildClaimsFn,
    pub resolve_identity: ResolveIdentityFn,
    pub authorize: AuthorizeFn,
    pub unauthorized: UnauthorizedFn,
}

impl Default for TokenHooks {
    fn default() -> Self {
        Self {
            build_claims: default_build_claims,
            resolve_identity: default_resolve_identity,
            authorize: default_authorize,
            unauthorized: default_unauthorized,
        }
    }
}

/// Store the username under the identity key.
pub fn default_build_claims(identity_key: &str, identity: &Identity) -> MapClaims {
    let mut claims = MapClaims::new();
    claims.insert(
        identity_key.to_string(),
        Value::String(identity.username.clone()),
    );
    claims
}

/// Read the username back from the identity key.
pub fn default_resolve_identity(identity_key: &str, claims: &MapClaims) -> Option<Identity> {
    claims
        .get(identity_key)
        .and_then(Value::as_str)
        .map(Identity::from_username)
}

/// Deny everyone except [`PRIVILEGED_USERNAME`].
pub fn default_authorize(identity: &Identity, _route: &str) -> bool {
    identity.username == PRIVILEGED_USERNAME
}

/// `{code, message}` JSON with the given status.
pub fn default_unauthorized(status: StatusCode, message: &str) -> Response {
    json_error(status, message)
}

/// Current unix time in seconds.
fn now() -> i64 {
    Utc::now().timestamp()
}

/// Issues, verifies and refreshes signed tokens.
pub struct TokenService {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    verifier: Arc<dyn CredentialVerifier>,
    hooks: TokenHooks,
}

impl TokenService {
    /// Create a service with the default hooks.
    ///
    /// # Errors
    ///
    /// Any [`JwtSettings::validate`] failure, most importantly
    /// `MissingSecretKey` for an empty secret. These are fatal at startup.
    pub fn new(
        settings: JwtSettings,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;

        // Expiry is checked by hand against an explicit clock so the same
        // parse can serve refresh, where an expired token is still acceptable.
        let mut validation = Validation::new(settings.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&settings.secret),
            decoding_key: DecodingKey::from_secret(&settings.secret),
            validation,
            settings,
            verifier,
            hooks: TokenHooks::default(),
        })
    }

    /// Replace the pluggable hooks.
    pub fn with_hooks(mut self, hooks: TokenHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    /// Authenticate credentials and issue a token for the resulting identity.
    ///
    /// # Errors
    ///
    /// - `FailedAuthentication` if the credential verifier knows no such user
    /// - `TokenCreation` if signing fails
    pub fn issue_token(&self, credentials: &Credentials) -> Result<IssuedToken, AppError> {
        self.issue_token_at(credentials, now())
    }

    /// [`issue_token`](Self::issue_token) with an explicit clock.
    pub fn issue_token_at(
        &self,
        credentials: &Credentials,
        now: i64,
    ) -> Result<IssuedToken, AppError> {
        let identity = self
            .verifier
            .verify(credentials)
            .ok_or(AppError::FailedAuthentication)?;

        let claims = (self.hooks.build_claims)(&self.settings.identity_key, &identity);
        self.sign(claims, now)
    }

    /// Check signature and expiry and return the token's claims.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` if the token cannot be parsed or lacks `exp`
    /// - `InvalidSignature` if it was not signed with our secret and algorithm
    /// - `Expired` if `now >= exp`
    pub fn verify_token(&self, raw: &str) -> Result<MapClaims, AppError> {
        self.verify_token_at(raw, now())
    }

    /// [`verify_token`](Self::verify_token) with an explicit clock.
    pub fn verify_token_at(&self, raw: &str, now: i64) -> Result<MapClaims, AppError> {
        let claims = self.decode(raw)?;

        let expiry = claims::timestamp(&claims, EXP_KEY)?;
        if now >= expiry {
            return Err(AppError::Expired);
        }

        Ok(claims)
    }

    /// Map verified claims back to an identity.
    ///
    /// # Errors
    ///
    /// `MalformedToken` if the identity claim is missing or has the wrong type.
    pub fn resolve_identity(&self, claims: &MapClaims) -> Result<Identity, AppError> {
        (self.hooks.resolve_identity)(&self.settings.identity_key, claims)
            .ok_or(AppError::MalformedToken("missing identity claim"))
    }

    /// Ask the authorization policy whether `identity` may access `route`.
    pub fn authorize(&self, identity: &Identity, route: &str) -> bool {
        (self.hooks.authorize)(identity, route)
    }

    /// Exchange a token for a new one with the same claims.
    ///
    /// Only the signature is checked; the token may already be past `exp`
    /// as long as the refresh window since `orig_iat` is still open.
    ///
    /// # Errors
    ///
    /// - `MalformedToken` / `InvalidSignature` as for verification
    /// - `RefreshWindowExceeded` if `now > orig_iat + max_refresh`
    pub fn refresh_token(&self, raw: &str) -> Result<IssuedToken, AppError> {
        self.refresh_token_at(raw, now())
    }

    /// [`refresh_token`](Self::refresh_token) with an explicit clock.
    pub fn refresh_token_at(&self, raw: &str, now: i64) -> Result<IssuedToken, AppError> {
        let claims = self.decode(raw)?;

        let issued_at = claims::timestamp(&claims, ORIG_IAT_KEY)?;
        if now > issued_at.saturating_add(self.settings.max_refresh_secs) {
            return Err(AppError::RefreshWindowExceeded);
        }

        self.sign(claims, now)
    }

    /// Find the raw token in the request using the configured lookup order.
    ///
    /// The first source that yields a token wins. When none does, the
    /// error from the last source tried is returned.
    pub fn extract_token(&self, headers: &HeaderMap, uri: &Uri) -> Result<String, AppError> {
        let mut last_error = AppError::MalformedToken("auth header is empty");

        for source in &self.settings.token_lookup {
            let found = match source {
                TokenSource::Header(name) => self.token_from_header(headers, name),
                TokenSource::Query(name) => token_from_query(uri, name),
                TokenSource::Cookie(name) => token_from_cookie(headers, name),
            };

            match found {
                Ok(token) => return Ok(token),
                Err(e) => last_error = e,
            }
        }

        Err(last_error)
    }

    /// Render an error through the unauthorized hook.
    ///
    /// 401 responses also carry the realm challenge.
    pub fn unauthorized_response(&self, error: &AppError) -> Response {
        let status = error.status();
        let mut response = (self.hooks.unauthorized)(status, &error.to_string());

        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("JWT realm={}", self.settings.realm);
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response.headers_mut().insert(WWW_AUTHENTICATE, value);
            }
        }

        response
    }

    /// `Set-Cookie` value delivering a token, when cookies are enabled.
    pub fn token_cookie(&self, token: &str) -> Option<HeaderValue> {
        if !self.settings.send_cookie {
            return None;
        }

        let cookie = format!(
            "{}={}; Max-Age={}; Path=/; HttpOnly",
            self.settings.cookie_name, token, self.settings.timeout_secs
        );
        HeaderValue::from_str(&cookie).ok()
    }

    /// `Set-Cookie` value removing the token cookie, when cookies are enabled.
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        if !self.settings.send_cookie {
            return None;
        }

        let cookie = format!("{}=; Max-Age=0; Path=/; HttpOnly", self.settings.cookie_name);
        HeaderValue::from_str(&cookie).ok()
    }

    /// Stamp `exp`/`orig_iat` onto the claims and sign them.
    fn sign(&self, mut claims: MapClaims, now: i64) -> Result<IssuedToken, AppError> {
        let expiry = now.saturating_add(self.settings.timeout_secs);
        claims.insert(EXP_KEY.to_string(), Value::from(expiry));
        claims.insert(ORIG_IAT_KEY.to_string(), Value::from(now));

        let token = jsonwebtoken::encode(
            &Header::new(self.settings.algorithm),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AppError::TokenCreation
        })?;

        let expire = DateTime::<Utc>::from_timestamp(expiry, 0).ok_or(AppError::TokenCreation)?;

        Ok(IssuedToken { token, expire })
    }

    /// Parse the token and check its signature, ignoring expiry.
    fn decode(&self, raw: &str) -> Result<MapClaims, AppError> {
        jsonwebtoken::decode::<MapClaims>(raw, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    AppError::InvalidSignature
                }
                ErrorKind::InvalidToken => {
                    AppError::MalformedToken("token contains an invalid number of segments")
                }
                _ => AppError::MalformedToken("token is malformed"),
            })
    }

    /// `<name>: <TokenHeadName> <token>`
    fn token_from_header(&self, headers: &HeaderMap, name: &str) -> Result<String, AppError> {
        let value = headers
            .get(name)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AppError::MalformedToken("auth header is empty"))?;

        let head_name = &self.settings.token_head_name;
        if head_name.is_empty() {
            return Ok(value.to_string());
        }

        match value.split_once(' ') {
            Some((scheme, token)) if scheme == head_name && !token.trim().is_empty() => {
                Ok(token.trim().to_string())
            }
            _ => Err(AppError::MalformedToken("auth header is invalid")),
        }
    }
}

/// `?<name>=<token>`
///
/// Values are percent-decoded.
fn token_from_query(uri: &Uri, name: &str) -> Result<String, AppError> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri)
        .map_err(|_| AppError::MalformedToken("query token is empty"))?;

    params
        .get(name)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or(AppError::MalformedToken("query token is empty"))
}

/// `Cookie: <name>=<token>`
fn token_from_cookie(headers: &HeaderMap, name: &str) -> Result<String, AppError> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
        .ok_or(AppError::MalformedToken("cookie token is empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::credential_store::StaticCredentialStore;
    use axum::http::header::AUTHORIZATION;
    use jsonwebtoken::Algorithm;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;
    const HOUR: i64 = 3600;

    fn service() -> TokenService {
        TokenService::new(
            JwtSettings::new("secret key"),
            Arc::new(StaticCredentialStore::demo()),
        )
        .unwrap()
    }

    fn issue(service: &TokenService, username: &str, password: &str, now: i64) -> String {
        service
            .issue_token_at(&Credentials::new(username, password), now)
            .unwrap()
            .token
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn empty_secret_is_rejected_at_construction() {
        let result = TokenService::new(
            JwtSettings::new(Vec::<u8>::new()),
            Arc::new(StaticCredentialStore::demo()),
        );
        assert!(matches!(result, Err(ConfigError::MissingSecretKey)));
    }

    #[test]
    fn issued_token_verifies_and_resolves_to_the_same_username() {
        let service = service();
        for user in ["admin", "test"] {
            let token = issue(&service, user, user, NOW);
            let claims = service.verify_token_at(&token, NOW + 1).unwrap();
            let identity = service.resolve_identity(&claims).unwrap();
            assert_eq!(identity.username, user);
        }
    }

    #[test]
    fn issued_claims_carry_timestamps() {
        let service = service();
        let token = issue(&service, "admin", "admin", NOW);
        let claims = service.verify_token_at(&token, NOW).unwrap();
        assert_eq!(claims.get(EXP_KEY), Some(&json!(NOW + HOUR)));
        assert_eq!(claims.get(ORIG_IAT_KEY), Some(&json!(NOW)));
        assert_eq!(claims.get("id"), Some(&json!("admin")));
    }

    #[test]
    fn issued_expire_matches_timeout() {
        let issued = service()
            .issue_token_at(&Credentials::new("admin", "admin"), NOW)
            .unwrap();
        assert_eq!(issued.expire.timestamp(), NOW + HOUR);
    }

    #[test]
    fn invalid_credentials_fail_authentication() {
        let service = service();
        for (user, pass) in [("admin", "test"), ("test", "admin"), ("root", "root")] {
            let err = service
                .issue_token_at(&Credentials::new(user, pass), NOW)
                .unwrap_err();
            assert_eq!(err, AppError::FailedAuthentication);
        }
    }

    #[test]
    fn token_past_expiry_is_expired() {
        let service = service();
        let token = issue(&service, "admin", "admin", NOW);
        assert_eq!(
            service.verify_token_at(&token, NOW + HOUR).unwrap_err(),
            AppError::Expired
        );
        assert!(service.verify_token_at(&token, NOW + HOUR - 1).is_ok());
    }

    #[test]
    fn token_signed_with_another_secret_is_invalid() {
        let other = TokenService::new(
            JwtSettings::new("another secret"),
            Arc::new(StaticCredentialStore::demo()),
        )
        .unwrap();
        let token = issue(&other, "admin", "admin", NOW);
        assert_eq!(
            service().verify_token_at(&token, NOW).unwrap_err(),
            AppError::InvalidSignature
        );
    }

    #[test]
    fn token_with_another_algorithm_is_invalid() {
        let mut settings = JwtSettings::new("secret key");
        settings.algorithm = Algorithm::HS512;
        let other = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();
        let token = issue(&other, "admin", "admin", NOW);
        assert_eq!(
            service().verify_token_at(&token, NOW).unwrap_err(),
            AppError::InvalidSignature
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let err = service().verify_token_at("not-a-token", NOW).unwrap_err();
        assert!(matches!(err, AppError::MalformedToken(_)));
    }

    #[test]
    fn refresh_within_window_extends_expiry() {
        let service = service();
        let original = service
            .issue_token_at(&Credentials::new("admin", "admin"), NOW)
            .unwrap();

        let refreshed = service.refresh_token_at(&original.token, NOW + 10).unwrap();
        assert!(refreshed.expire > original.expire);

        let claims = service.verify_token_at(&refreshed.token, NOW + 10).unwrap();
        assert_eq!(claims.get(ORIG_IAT_KEY), Some(&json!(NOW + 10)));
        assert_eq!(claims.get("id"), Some(&json!("admin")));
    }

    #[test]
    fn expired_token_can_still_be_refreshed_inside_the_window() {
        let mut settings = JwtSettings::new("secret key");
        settings.timeout_secs = 60;
        settings.max_refresh_secs = HOUR;
        let service = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();
        let token = issue(&service, "test", "test", NOW);

        assert_eq!(
            service.verify_token_at(&token, NOW + 120).unwrap_err(),
            AppError::Expired
        );
        let refreshed = service.refresh_token_at(&token, NOW + 120).unwrap();
        assert!(service.verify_token_at(&refreshed.token, NOW + 121).is_ok());
    }

    #[test]
    fn refresh_after_window_is_rejected() {
        let service = service();
        let token = issue(&service, "admin", "admin", NOW);
        assert!(service.refresh_token_at(&token, NOW + HOUR).is_ok());
        assert_eq!(
            service.refresh_token_at(&token, NOW + HOUR + 1).unwrap_err(),
            AppError::RefreshWindowExceeded
        );
    }

    #[test]
    fn default_policy_admits_only_admin() {
        let service = service();
        assert!(service.authorize(&Identity::from_username("admin"), "/auth/ping"));
        assert!(!service.authorize(&Identity::from_username("test"), "/auth/ping"));
        assert!(!service.authorize(&Identity::from_username("Admin"), "/auth/ping"));
    }

    #[test]
    fn resolve_identity_inverts_build_claims() {
        let identity = Identity::from_username("someone");
        let claims = default_build_claims("id", &identity);
        assert_eq!(default_resolve_identity("id", &claims), Some(identity));
    }

    #[test]
    fn missing_identity_claim_is_malformed() {
        let claims = json!({"exp": NOW}).as_object().cloned().unwrap();
        assert_eq!(
            service().resolve_identity(&claims).unwrap_err(),
            AppError::MalformedToken("missing identity claim")
        );
    }

    #[test]
    fn custom_hooks_replace_defaults() {
        fn everyone(_: &Identity, _: &str) -> bool {
            true
        }
        let service = service().with_hooks(TokenHooks {
            authorize: everyone,
            ..TokenHooks::default()
        });
        assert!(service.authorize(&Identity::from_username("test"), "/auth/ping"));
    }

    #[test]
    fn header_extraction_requires_the_scheme() {
        let service = service();
        let uri: Uri = "/auth/ping".parse().unwrap();

        assert_eq!(
            service.extract_token(&bearer("abc"), &uri).unwrap(),
            "abc"
        );
        assert_eq!(
            service.extract_token(&HeaderMap::new(), &uri).unwrap_err(),
            AppError::MalformedToken("auth header is empty")
        );

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(
            service.extract_token(&headers, &uri).unwrap_err(),
            AppError::MalformedToken("auth header is invalid")
        );
    }

    #[test]
    fn custom_head_name_is_honoured() {
        let mut settings = JwtSettings::new("secret key");
        settings.token_head_name = "wen".to_string();
        let service = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();
        let uri: Uri = "/".parse().unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("wen abc"));
        assert_eq!(service.extract_token(&headers, &uri).unwrap(), "abc");
        assert!(service.extract_token(&bearer("abc"), &uri).is_err());
    }

    #[test]
    fn lookup_falls_through_to_query_and_cookie() {
        let mut settings = JwtSettings::new("secret key");
        settings.token_lookup = vec![
            TokenSource::Header("Authorization".to_string()),
            TokenSource::Query("token".to_string()),
            TokenSource::Cookie("jwt".to_string()),
        ];
        let service = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();

        let uri: Uri = "/auth/ping?a=1&token=from-query".parse().unwrap();
        assert_eq!(
            service.extract_token(&HeaderMap::new(), &uri).unwrap(),
            "from-query"
        );

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; jwt=from-cookie"));
        let plain: Uri = "/auth/ping".parse().unwrap();
        assert_eq!(
            service.extract_token(&headers, &plain).unwrap(),
            "from-cookie"
        );
        assert_eq!(
            service.extract_token(&HeaderMap::new(), &plain).unwrap_err(),
            AppError::MalformedToken("cookie token is empty")
        );
    }

    #[test]
    fn query_token_is_percent_decoded() {
        let mut settings = JwtSettings::new("secret key");
        settings.token_lookup = vec![TokenSource::Query("token".to_string())];
        let service = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();

        let token = issue(&service, "admin", "admin", NOW);
        let encoded = token.replace('.', "%2E");
        let uri: Uri = format!("/auth/ping?token={encoded}").parse().unwrap();

        let extracted = service.extract_token(&HeaderMap::new(), &uri).unwrap();
        assert_eq!(extracted, token);
        assert!(service.verify_token_at(&extracted, NOW + 1).is_ok());
    }

    #[test]
    fn unauthorized_response_adds_realm_challenge() {
        let service = service();

        let response = service.unauthorized_response(&AppError::Expired);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(WWW_AUTHENTICATE).unwrap(),
            "JWT realm=test zone"
        );

        let forbidden = service.unauthorized_response(&AppError::Forbidden);
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert!(forbidden.headers().get(WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn cookies_only_when_enabled() {
        assert!(service().token_cookie("abc").is_none());

        let mut settings = JwtSettings::new("secret key");
        settings.send_cookie = true;
        let service = TokenService::new(settings, Arc::new(StaticCredentialStore::demo())).unwrap();
        assert_eq!(
            service.token_cookie("abc").unwrap(),
            "jwt=abc; Max-Age=3600; Path=/; HttpOnly"
        );
        assert_eq!(
            service.clear_cookie().unwrap(),
            "jwt=; Max-Age=0; Path=/; HttpOnly"
        );
    }
}
