//! Registration, login, token refresh and OAuth sign-in

use std::sync::Arc;

use tb_auth::{
    hash_password, verify_password, JwtService, OAuthProfile, OAuthProvider, OAuthService,
    PendingAuthorization, TokenPair, TokenType,
};
use tb_contracts::RegistrationContract;
use tb_core::{Id, TbError, TbResult};
use tb_db::UserStore;
use tb_models::{CreateUserDto, LoginRequest, RegisterRequest, User};
use tracing::info;

/// Name of the workspace every new account starts with
pub const PERSONAL_WORKSPACE_NAME: &str = "Personal";

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// A signed-in user and their fresh tokens
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: TokenPair,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: Arc<JwtService>,
    oauth: Arc<OAuthService>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: Arc<JwtService>, oauth: Arc<OAuthService>) -> Self {
        Self { users, jwt, oauth }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    fn session(&self, user: User) -> TbResult<AuthSession> {
        let tokens = self
            .jwt
            .issue_pair(user.id, &user.email, user.token_version)?;
        Ok(AuthSession { user, tokens })
    }

    pub async fn register(&self, request: RegisterRequest) -> TbResult<AuthSession> {
        RegistrationContract::validate(&request)?;

        let email = normalize_email(&request.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(TbError::invalid("email", "has already been taken"));
        }

        let password_hash = hash_password(&request.password)?;
        let user = self
            .users
            .create_with_personal_workspace(
                CreateUserDto {
                    name: request.name.trim().to_string(),
                    email,
                    password_hash: Some(password_hash),
                    avatar_url: None,
                    oauth_provider: None,
                    oauth_subject: None,
                },
                PERSONAL_WORKSPACE_NAME,
            )
            .await?;

        info!(user_id = user.id, "User registered");
        self.session(user)
    }

    /// Any mismatch yields the same message so accounts cannot be probed
    pub async fn login(&self, request: LoginRequest) -> TbResult<AuthSession> {
        let email = normalize_email(&request.email);
        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| TbError::unauthorized(INVALID_CREDENTIALS))?;

        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(&request.password, hash));
        if !verified {
            tracing::debug!(user_id = user.id, "Password login rejected");
            return Err(TbError::unauthorized(INVALID_CREDENTIALS));
        }

        self.users.record_login(user.id).await?;
        info!(user_id = user.id, "User logged in");
        self.session(user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> TbResult<AuthSession> {
        let claims = self.jwt.validate(refresh_token, TokenType::Refresh)?;
        let user_id = claims.user_id()?;

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| TbError::unauthorized("Invalid token"))?;
        if user.token_version != claims.ver {
            return Err(TbError::unauthorized("Token has been revoked"));
        }

        self.session(user)
    }

    /// Revokes every token issued to the user so far
    pub async fn logout(&self, user_id: Id) -> TbResult<()> {
        let version = self.users.bump_token_version(user_id).await?;
        info!(user_id, token_version = version, "User logged out");
        Ok(())
    }

    pub fn oauth_authorize(&self, provider: &str) -> TbResult<(OAuthProvider, PendingAuthorization)> {
        let provider: OAuthProvider = provider.parse()?;
        let pending = self.oauth.authorize_url(provider)?;
        Ok((provider, pending))
    }

    pub async fn oauth_callback(
        &self,
        provider: OAuthProvider,
        code: String,
        pkce_verifier: String,
    ) -> TbResult<AuthSession> {
        let profile = self
            .oauth
            .exchange_code(provider, code, pkce_verifier)
            .await?;
        self.login_with_profile(profile).await
    }

    /// Known identity, else an account with the same email, else a new account
    pub async fn login_with_profile(&self, profile: OAuthProfile) -> TbResult<AuthSession> {
        let provider = profile.provider.as_str();
        let email = normalize_email(&profile.email);

        let user = match self.users.find_by_oauth(provider, &profile.subject).await? {
            Some(user) => user,
            None => match self.users.find_by_email(&email).await? {
                Some(existing) => {
                    info!(user_id = existing.id, provider, "Linking OAuth identity");
                    self.users
                        .link_oauth(existing.id, provider, &profile.subject, profile.avatar_url)
                        .await?
                }
                None => {
                    let user = self
                        .users
                        .create_with_personal_workspace(
                            CreateUserDto {
                                name: profile.name,
                                email,
                                password_hash: None,
                                avatar_url: profile.avatar_url,
                                oauth_provider: Some(provider.to_string()),
                                oauth_subject: Some(profile.subject),
                            },
                            PERSONAL_WORKSPACE_NAME,
                        )
                        .await?;
                    info!(user_id = user.id, provider, "User registered through OAuth");
                    user
                }
            },
        };

        self.users.record_login(user.id).await?;
        self.session(user)
    }
}
