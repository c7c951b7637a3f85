use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use url::Url;

use super::repository::Repository;
use super::types::{AuthConfig, Identity, StoredSession};
use super::{AuthProvider, ResultExt};

/// OAuth2 authorization code flow against a hosted sign in page.
///
/// `federated_sign_in` opens the sign in page in the browser. After signing
/// in, the page redirects to `redirect_uri` with a `code` which is handed to
/// `complete_sign_in`. Tokens end up in the repository.
#[derive(Clone)]
pub struct HostedUiAuth {
    config: AuthConfig,
    repository: Repository,
    client: reqwest::Client,
}

impl std::fmt::Debug for HostedUiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedUiAuth")
            .field("domain", &self.config.domain)
            .finish()
    }
}

impl HostedUiAuth {
    pub fn new(config: AuthConfig, repository: Repository) -> Self {
        Self {
            config,
            repository,
            client: reqwest::Client::new(),
        }
    }

    fn base(&self) -> String {
        let domain = self.config.domain.trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    pub fn authorize_url(&self) -> Result<Url, String> {
        let scope = self.config.scopes.join(" ");
        let mut params = vec![
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", scope.as_str()),
        ];
        if let Some(ref provider) = self.config.identity_provider {
            params.push(("identity_provider", provider.as_str()));
        }
        Url::parse_with_params(&format!("{}/oauth2/authorize", self.base()), &params)
            .map_err(|e| format!("Invalid sign in url: {e}"))
    }

    pub fn logout_url(&self) -> Result<Url, String> {
        Url::parse_with_params(
            &format!("{}/logout", self.base()),
            &[
                ("client_id", self.config.client_id.as_str()),
                ("logout_uri", self.config.logout_uri.as_str()),
            ],
        )
        .map_err(|e| format!("Invalid sign out url: {e}"))
    }

    fn open_url(&self, url: &Url) -> Result<(), String> {
        log::info!("Opening {url}");
        webbrowser::open(url.as_str()).map_err(|e| format!("Could not open browser: {e:?}"))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenResponse, String> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code", code.trim()),
        ];
        self.client
            .post(format!("{}/oauth2/token", self.base()))
            .form(&params)
            .send()
            .await
            .string_error("token")?
            .error_for_status()
            .string_error("token")?
            .json()
            .await
            .string_error("token")
    }

    async fn user_info(&self, access_token: &str) -> Result<UserInfo, String> {
        self.client
            .get(format!("{}/oauth2/userInfo", self.base()))
            .bearer_auth(access_token)
            .send()
            .await
            .string_error("user_info")?
            .error_for_status()
            .string_error("user_info")?
            .json()
            .await
            .string_error("user_info")
    }
}

#[async_trait]
impl AuthProvider for HostedUiAuth {
    async fn current_user(&self) -> Result<Identity, String> {
        let session = self.repository.session()?.ok_or("Not signed in")?;
        if session.is_expired(Utc::now()) {
            return Err(format!("Session of {} expired", session.username));
        }
        Ok(session.identity())
    }

    async fn federated_sign_in(&self) -> Result<(), String> {
        self.open_url(&self.authorize_url()?)
    }

    async fn complete_sign_in(&self, code: String) -> Result<Identity, String> {
        log::trace!("Complete sign in");
        let tokens = self.exchange_code(&code).await?;
        let info = self.user_info(&tokens.access_token).await?;
        let session = StoredSession {
            username: info.username(),
            id_token: tokens.id_token,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: Utc::now() + Duration::seconds(tokens.expires_in),
        };
        self.repository.set_session(Some(session.clone()))?;
        Ok(session.identity())
    }

    async fn sign_out(&self) -> Result<(), String> {
        log::trace!("Sign out");
        self.repository.set_session(None)?;
        self.open_url(&self.logout_url()?)
    }
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    id_token: String,
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: i64,
}

#[derive(Deserialize, Debug)]
struct UserInfo {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    sub: String,
}

impl UserInfo {
    fn username(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.sub.clone())
    }
}
