//! Bearer-token credentials for Google APIs.
//!
//! A [`CredentialHolder`] is built once per process or interactive session.
//! Its [`refresh`](CredentialHolder::refresh) call performs the OAuth
//! service-account flow (RS256-signed JWT assertion exchanged at the key's
//! `token_uri`) and yields a [`BearerToken`] that is cloned into every client
//! that needs it. Tokens are not refreshed per request.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use searchagent_shared::{GenerationConfig, Result, SearchAgentError};

/// Scope required by the text-generation endpoint.
pub const GENERATIVE_LANGUAGE_SCOPE: &str = "https://www.googleapis.com/auth/generative-language";

/// Scope required to write spreadsheet values.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

// ---------------------------------------------------------------------------
// ServiceAccountKey
// ---------------------------------------------------------------------------

/// The subset of a service-account JSON key file used for the token flow.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    /// PEM-encoded RSA private key.
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.into()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    /// Read and parse a key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SearchAgentError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            SearchAgentError::parse(format!(
                "invalid service account key {}: {e}",
                path.display()
            ))
        })
    }
}

// ---------------------------------------------------------------------------
// BearerToken
// ---------------------------------------------------------------------------

/// An OAuth access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(***)")
    }
}

// ---------------------------------------------------------------------------
// Token flow
// ---------------------------------------------------------------------------

/// Where access tokens come from.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// Exchange a signed assertion for a token.
    ServiceAccount(ServiceAccountKey),
    /// Use a token issued out of band.
    Static(String),
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Holds the credential source and the most recently obtained token.
#[derive(Debug)]
pub struct CredentialHolder {
    source: TokenSource,
    scopes: Vec<String>,
    client: Client,
    token: Option<BearerToken>,
}

impl CredentialHolder {
    /// Build a holder requesting both the generation and spreadsheet scopes.
    pub fn new(source: TokenSource) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SearchAgentError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            source,
            scopes: vec![
                GENERATIVE_LANGUAGE_SCOPE.to_string(),
                SPREADSHEETS_SCOPE.to_string(),
            ],
            client,
            token: None,
        })
    }

    /// Resolve the token source from config: a pre-issued token env var wins,
    /// otherwise the service-account key file is read.
    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        if let Some(token) = config.access_token() {
            debug!(env = %config.access_token_env, "using pre-issued access token");
            return Self::new(TokenSource::Static(token));
        }

        let path = config.resolve_credentials_path();
        if !path.exists() {
            return Err(SearchAgentError::config(format!(
                "Google credentials not found at {}. Set {} or {}.",
                path.display(),
                config.credentials_env,
                config.access_token_env
            )));
        }
        Self::new(TokenSource::ServiceAccount(ServiceAccountKey::from_file(
            &path,
        )?))
    }

    /// The token obtained by the last successful [`refresh`](Self::refresh).
    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    /// Obtain a fresh access token and remember it.
    #[instrument(skip_all)]
    pub async fn refresh(&mut self) -> Result<BearerToken> {
        let token = match &self.source {
            TokenSource::Static(token) => BearerToken::new(token.clone()),
            TokenSource::ServiceAccount(key) => self.exchange(key).await?,
        };
        self.token = Some(token.clone());
        Ok(token)
    }

    async fn exchange(&self, key: &ServiceAccountKey) -> Result<BearerToken> {
        let assertion = sign_assertion(key, &self.scopes, Utc::now().timestamp())?;

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SearchAgentError::Network(format!("{}: {e}", key.token_uri)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchAgentError::Auth(format!(
                "token exchange failed: HTTP {status}: {body}"
            )));
        }

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| SearchAgentError::parse(format!("invalid token response: {e}")))?;

        info!(
            client_email = %key.client_email,
            expires_in = parsed.expires_in.unwrap_or_default(),
            "obtained access token"
        );
        Ok(BearerToken::new(parsed.access_token))
    }
}

/// Build the RS256-signed JWT assertion for the service-account grant.
fn sign_assertion(key: &ServiceAccountKey, scopes: &[String], now: i64) -> Result<String> {
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: scopes.join(" "),
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| SearchAgentError::Auth(format!("invalid service account private key: {e}")))?;

    encode(&header, &claims, &encoding_key)
        .map_err(|e| SearchAgentError::Auth(format!("failed to sign assertion: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEY_FIXTURE: &str = "../../../fixtures/keys/test-service-account.json";
    const PUBLIC_KEY_FIXTURE: &str = "../../../fixtures/keys/test-public.pem";

    #[derive(Debug, Deserialize)]
    struct DecodedClaims {
        iss: String,
        scope: String,
        aud: String,
        iat: i64,
        exp: i64,
    }

    fn fixture_key() -> ServiceAccountKey {
        ServiceAccountKey::from_file(Path::new(KEY_FIXTURE)).expect("read key fixture")
    }

    #[test]
    fn key_debug_hides_private_key() {
        let key = fixture_key();
        let debug = format!("{key:?}");
        assert!(debug.contains("searchagent-test@"));
        assert!(!debug.contains("PRIVATE KEY"));
    }

    #[test]
    fn bearer_debug_is_redacted() {
        let token = BearerToken::new("ya29.secret");
        assert_eq!(format!("{token:?}"), "BearerToken(***)");
        assert_eq!(token.as_str(), "ya29.secret");
    }

    #[test]
    fn assertion_carries_expected_claims() {
        let key = fixture_key();
        let scopes = vec![GENERATIVE_LANGUAGE_SCOPE.to_string(), SPREADSHEETS_SCOPE.to_string()];
        let now = Utc::now().timestamp();
        let jwt = sign_assertion(&key, &scopes, now).expect("sign");

        let public = std::fs::read(PUBLIC_KEY_FIXTURE).expect("read public key");
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[key.token_uri.as_str()]);
        validation.set_issuer(&[key.client_email.as_str()]);
        let decoded = decode::<DecodedClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(&public).expect("public key"),
            &validation,
        )
        .expect("decode");

        assert_eq!(decoded.claims.iss, key.client_email);
        assert_eq!(decoded.claims.aud, key.token_uri);
        assert_eq!(decoded.claims.iat, now);
        assert_eq!(decoded.claims.exp, now + ASSERTION_LIFETIME_SECS);
        assert!(decoded.claims.scope.contains("generative-language"));
        assert!(decoded.claims.scope.contains("spreadsheets"));
        assert_eq!(decoded.header.kid.as_deref(), Some("test-key-1"));
    }

    #[test]
    fn invalid_private_key_is_auth_error() {
        let mut key = fixture_key();
        key.private_key = "not a pem".into();
        let err = sign_assertion(&key, &[], 0).unwrap_err();
        assert!(matches!(err, SearchAgentError::Auth(_)));
    }

    #[tokio::test]
    async fn refresh_exchanges_assertion_for_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test-token",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut key = fixture_key();
        key.token_uri = format!("{}/token", server.uri());

        let mut holder = CredentialHolder::new(TokenSource::ServiceAccount(key)).unwrap();
        assert!(holder.token().is_none());

        let token = holder.refresh().await.expect("refresh");
        assert_eq!(token.as_str(), "ya29.test-token");
        assert_eq!(holder.token(), Some(&token));
    }

    #[tokio::test]
    async fn refresh_reports_rejected_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
            .mount(&server)
            .await;

        let mut key = fixture_key();
        key.token_uri = format!("{}/token", server.uri());

        let mut holder = CredentialHolder::new(TokenSource::ServiceAccount(key)).unwrap();
        let err = holder.refresh().await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
        assert!(holder.token().is_none());
    }

    #[tokio::test]
    async fn static_source_needs_no_network() {
        let mut holder = CredentialHolder::new(TokenSource::Static("pre-issued".into())).unwrap();
        let token = holder.refresh().await.unwrap();
        assert_eq!(token.as_str(), "pre-issued");
    }

    #[test]
    fn from_config_reports_missing_key_file() {
        let config = GenerationConfig {
            credentials_env: "SA_TEST_NONEXISTENT_CREDS_ENV_5521".into(),
            credentials_path: "/nonexistent/searchagent/key.json".into(),
            access_token_env: "SA_TEST_NONEXISTENT_TOKEN_ENV_5521".into(),
            ..Default::default()
        };
        let err = CredentialHolder::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("Google credentials not found"));
    }
}
