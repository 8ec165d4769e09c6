use serde::Deserialize;

use crate::context::Viewer;
use crate::models::{MediaType, SortKey, UserId};

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the MediaHub REST API, including the `/api` prefix
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Bearer token issued by the auth service
    #[serde(default)]
    pub api_token: Option<String>,

    /// Username of the signed-in viewer
    #[serde(default)]
    pub viewer_username: Option<String>,

    /// Account id of the signed-in viewer, when known
    #[serde(default)]
    pub viewer_id: Option<i64>,

    /// Whole-request timeout enforced by the HTTP transport
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Sort key used when the listing is first mounted
    #[serde(default)]
    pub default_sort: SortKey,

    /// Media type shown when the listing is first mounted
    #[serde(default = "default_media_type")]
    pub default_media_type: MediaType,
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_media_type() -> MediaType {
    MediaType::Movie
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            api_token: None,
            viewer_username: None,
            viewer_id: None,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            default_sort: SortKey::None,
            default_media_type: default_media_type(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// The signed-in viewer, if a username was configured
    pub fn viewer(&self) -> Option<Viewer> {
        self.viewer_username.as_ref().map(|username| Viewer {
            user_id: self.viewer_id.map(UserId),
            username: username.clone(),
        })
    }
}
