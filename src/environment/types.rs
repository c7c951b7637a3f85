use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use url::Url;
use uuid::Uuid;

/// Identifies one running instance of the app. Created once at startup and
/// used to recognise our own talks when they come back over the subscription.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TalkId(pub String);

impl TalkId {
    /// Every created talk gets its own id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Display for TalkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TalkId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Talk {
    pub id: TalkId,
    pub name: String,
    pub description: String,
    pub speaker_name: String,
    pub speaker_bio: String,
    pub client_id: ClientId,
}

/// The signed in user
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Identity {
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

// Repository Types

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub username: String,
    pub id_token: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn identity(&self) -> Identity {
        Identity {
            username: self.username.clone(),
            expires_at: self.expires_at,
        }
    }
}

#[derive(Default, Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackendConfig {
    pub endpoint: String,
    #[serde(default)]
    pub realtime_endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4000/graphql".to_string(),
            realtime_endpoint: None,
            api_key: None,
        }
    }
}

impl BackendConfig {
    pub fn endpoint_url(&self) -> Result<Url, String> {
        Url::parse(&self.endpoint).map_err(|e| format!("Invalid endpoint {}: {e}", self.endpoint))
    }

    /// The websocket endpoint. Falls back to the http endpoint with a
    /// `ws` / `wss` scheme.
    pub fn realtime_url(&self) -> Result<Url, String> {
        if let Some(ref realtime) = self.realtime_endpoint {
            return Url::parse(realtime)
                .map_err(|e| format!("Invalid realtime endpoint {realtime}: {e}"));
        }
        let mut url = self.endpoint_url()?;
        let scheme = match url.scheme() {
            "https" => "wss",
            "http" => "ws",
            other => return Err(format!("Unsupported endpoint scheme {other}")),
        };
        url.set_scheme(scheme)
            .map_err(|_| format!("Could not derive realtime endpoint from {}", self.endpoint))?;
        Ok(url)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    /// Domain of the hosted sign in UI, e.g. `auth.example.com`
    pub domain: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub logout_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub identity_provider: Option<String>,
}

fn default_scopes() -> Vec<String> {
    ["openid", "email", "profile"]
        .iter()
        .map(|e| e.to_string())
        .collect()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            domain: "auth.example.com".to_string(),
            client_id: String::new(),
            redirect_uri: "http://localhost:3000/".to_string(),
            logout_uri: "http://localhost:3000/".to_string(),
            scopes: default_scopes(),
            identity_provider: None,
        }
    }
}
