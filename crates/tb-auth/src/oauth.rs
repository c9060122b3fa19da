//! OAuth login through Google and GitHub
//!
//! Authorization-code flow with PKCE. The caller keeps the returned CSRF
//! state and PKCE verifier in a session until the provider redirects back.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use tb_core::config::{OAuthConfig, OAuthProviderConfig};
use tb_core::TbError;
use thiserror::Error;

const USER_AGENT: &str = concat!("taskboard/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),
    #[error("OAuth provider {0} is not configured")]
    NotConfigured(OAuthProvider),
    #[error("Invalid OAuth configuration: {0}")]
    InvalidConfig(String),
    #[error("Code exchange failed: {0}")]
    Exchange(String),
    #[error("Fetching the profile failed: {0}")]
    Profile(String),
    #[error("The provider did not return a verified email address")]
    MissingEmail,
}

impl From<OAuthError> for TbError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::UnknownProvider(name) => TbError::NotFound {
                entity: "OAuthProvider",
                field: "name",
                value: name,
            },
            OAuthError::NotConfigured(provider) => TbError::NotFound {
                entity: "OAuthProvider",
                field: "name",
                value: provider.to_string(),
            },
            OAuthError::InvalidConfig(message) => TbError::Config(message),
            e @ (OAuthError::Exchange(_) | OAuthError::Profile(_)) => TbError::ExternalService {
                service: "oauth".to_string(),
                message: e.to_string(),
            },
            e @ OAuthError::MissingEmail => TbError::invalid("email", e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    fn auth_url(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://accounts.google.com/o/oauth2/v2/auth",
            OAuthProvider::Github => "https://github.com/login/oauth/authorize",
        }
    }

    fn token_url(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "https://oauth2.googleapis.com/token",
            OAuthProvider::Github => "https://github.com/login/oauth/access_token",
        }
    }

    fn scopes(&self) -> &'static [&'static str] {
        match self {
            OAuthProvider::Google => &["openid", "email", "profile"],
            OAuthProvider::Github => &["read:user", "user:email"],
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = OAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(OAuthError::UnknownProvider(other.to_string())),
        }
    }
}

/// Identity returned by a provider after a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    pub provider: OAuthProvider,
    /// Stable provider-side user id
    pub subject: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Redirect target plus the state to keep until the callback
#[derive(Debug, Clone)]
pub struct PendingAuthorization {
    pub url: String,
    pub csrf_state: String,
    pub pkce_verifier: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

impl GoogleUserInfo {
    fn into_profile(self) -> Result<OAuthProfile, OAuthError> {
        let email = self
            .email
            .filter(|_| self.email_verified)
            .ok_or(OAuthError::MissingEmail)?;
        Ok(OAuthProfile {
            provider: OAuthProvider::Google,
            subject: self.sub,
            name: self.name.unwrap_or_else(|| default_name(&email)),
            email,
            avatar_url: self.picture,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GithubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GithubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

impl GithubUser {
    fn into_profile(self, emails: &[GithubEmail]) -> Result<OAuthProfile, OAuthError> {
        let email = emails
            .iter()
            .find(|e| e.primary && e.verified)
            .or_else(|| emails.iter().find(|e| e.verified))
            .map(|e| e.email.clone())
            .or(self.email)
            .ok_or(OAuthError::MissingEmail)?;
        Ok(OAuthProfile {
            provider: OAuthProvider::Github,
            subject: self.id.to_string(),
            name: self.name.unwrap_or(self.login),
            email,
            avatar_url: self.avatar_url,
        })
    }
}

fn default_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

pub struct OAuthService {
    clients: HashMap<OAuthProvider, BasicClient>,
    http: reqwest::Client,
}

impl OAuthService {
    /// Build clients for every configured provider
    ///
    /// `public_url` is the externally visible base of this API; callbacks land on
    /// `{public_url}/api/v1/auth/oauth/{provider}/callback`.
    pub fn from_config(config: &OAuthConfig, public_url: &str) -> Result<Self, OAuthError> {
        let mut clients = HashMap::new();
        let configured = [
            (OAuthProvider::Google, config.google.as_ref()),
            (OAuthProvider::Github, config.github.as_ref()),
        ];
        for (provider, settings) in configured {
            if let Some(settings) = settings {
                clients.insert(provider, build_client(provider, settings, public_url)?);
            }
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| OAuthError::InvalidConfig(e.to_string()))?;

        Ok(Self { clients, http })
    }

    pub fn is_configured(&self, provider: OAuthProvider) -> bool {
        self.clients.contains_key(&provider)
    }

    pub fn configured_providers(&self) -> Vec<OAuthProvider> {
        let mut providers: Vec<_> = self.clients.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }

    fn client(&self, provider: OAuthProvider) -> Result<&BasicClient, OAuthError> {
        self.clients
            .get(&provider)
            .ok_or(OAuthError::NotConfigured(provider))
    }

    pub fn authorize_url(&self, provider: OAuthProvider) -> Result<PendingAuthorization, OAuthError> {
        let client = self.client(provider)?;
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = client.authorize_url(CsrfToken::new_random);
        for scope in provider.scopes() {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (url, csrf) = request.set_pkce_challenge(challenge).url();

        Ok(PendingAuthorization {
            url: url.to_string(),
            csrf_state: csrf.secret().clone(),
            pkce_verifier: verifier.secret().clone(),
        })
    }

    /// Swap the authorization code for a token and load the provider profile
    #[tracing::instrument(skip(self, code, pkce_verifier))]
    pub async fn exchange_code(
        &self,
        provider: OAuthProvider,
        code: String,
        pkce_verifier: String,
    ) -> Result<OAuthProfile, OAuthError> {
        let token = self
            .client(provider)?
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        let access_token = token.access_token().secret();
        match provider {
            OAuthProvider::Google => self.google_profile(access_token).await,
            OAuthProvider::Github => self.github_profile(access_token).await,
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, OAuthError> {
        self.http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OAuthError::Profile(e.to_string()))?
            .json::<T>()
            .await
            .map_err(|e| OAuthError::Profile(e.to_string()))
    }

    async fn google_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let info: GoogleUserInfo = self
            .get_json("https://openidconnect.googleapis.com/v1/userinfo", access_token)
            .await?;
        info.into_profile()
    }

    async fn github_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let user: GithubUser = self.get_json("https://api.github.com/user", access_token).await?;
        let emails: Vec<GithubEmail> = self
            .get_json("https://api.github.com/user/emails", access_token)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "could not list GitHub emails");
                Vec::new()
            });
        user.into_profile(&emails)
    }
}

fn build_client(
    provider: OAuthProvider,
    settings: &OAuthProviderConfig,
    public_url: &str,
) -> Result<BasicClient, OAuthError> {
    let invalid = |e: oauth2::url::ParseError| OAuthError::InvalidConfig(e.to_string());
    let redirect = format!(
        "{}/api/v1/auth/oauth/{}/callback",
        public_url.trim_end_matches('/'),
        provider
    );

    Ok(BasicClient::new(
        ClientId::new(settings.client_id.clone()),
        Some(ClientSecret::new(settings.client_secret.clone())),
        AuthUrl::new(provider.auth_url().to_string()).map_err(invalid)?,
        Some(TokenUrl::new(provider.token_url().to_string()).map_err(invalid)?),
    )
    .set_redirect_uri(RedirectUrl::new(redirect).map_err(invalid)?))
}
