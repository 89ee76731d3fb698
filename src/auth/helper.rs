use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::process::Command;
use std::sync::Mutex;

use super::token_store::OAuthToken;

/// Azure CLI client id, a public multi-tenant application.
pub const CLIENT_ID: &str = "04b07795-8ddb-461a-bbee-02f9e1bf7b46";

// Scopes for a multi-tenant app work for openid, email and other common
// scopes, but fail when mixing in a v1 scope like
// "https://management.azure.com/.default" needed for ARM access.
pub const SCOPES: &str = "offline_access https://management.azure.com/.default";

pub const TENANTS_URL: &str = "https://management.azure.com/tenants?api-version=2019-11-01";

const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";

const STATE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz123456789";

/// Token endpoint response of the Microsoft identity platform.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AzureToken {
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    pub expires_in: i64,
    #[serde(default)]
    pub ext_expires_in: i64,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub foci: String,
}

impl AzureToken {
    /// Stamp the server-reported lifetime into an absolute expiry.
    pub fn into_oauth_token(self) -> OAuthToken {
        OAuthToken {
            expiry: Utc::now() + Duration::seconds(self.expires_in),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            token_type: self.token_type,
        }
    }
}

/// The three identity-provider interactions of the login flow, kept behind a
/// trait so tests can substitute them.
#[async_trait]
pub trait ApiHelper: Send + Sync {
    /// POST a form-encoded grant request to the tenant-scoped token endpoint.
    async fn query_token(&self, data: Vec<(String, String)>, tenant_id: &str)
        -> Result<AzureToken>;

    /// GET an ARM endpoint with an `Authorization` header; returns the raw
    /// body and status code.
    async fn query_authorization_api(
        &self,
        authorization_url: &str,
        authorization_header: &str,
    ) -> Result<(Vec<u8>, u16)>;

    /// Point the user's browser at the authorize endpoint.
    async fn open_azure_login_page(&self, redirect_url: &str) -> Result<()>;
}

/// Production [`ApiHelper`] talking to login.microsoftonline.com.
pub struct AzureApiHelper {
    client: reqwest::Client,
    rng: Mutex<StdRng>,
}

impl AzureApiHelper {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    fn next_state(&self) -> String {
        // A poisoned lock only means another thread panicked mid-draw; the
        // rng state is still usable.
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        random_string(&mut *rng, 10)
    }
}

impl Default for AzureApiHelper {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApiHelper for AzureApiHelper {
    async fn query_token(
        &self,
        data: Vec<(String, String)>,
        tenant_id: &str,
    ) -> Result<AzureToken> {
        let endpoint = token_endpoint(tenant_id);
        debug!("Requesting token from {}", endpoint);
        let response = self
            .client
            .post(&endpoint)
            .form(&data)
            .send()
            .await
            .context("token request failed")?;
        if !response.status().is_success() {
            anyhow::bail!(
                "error while renewing access token, status: {}",
                response.status()
            );
        }
        let token: AzureToken = response
            .json()
            .await
            .context("failed to parse token response")?;
        Ok(token)
    }

    async fn query_authorization_api(
        &self,
        authorization_url: &str,
        authorization_header: &str,
    ) -> Result<(Vec<u8>, u16)> {
        let response = self
            .client
            .get(authorization_url)
            .header(reqwest::header::AUTHORIZATION, authorization_header)
            .send()
            .await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), status))
    }

    async fn open_azure_login_page(&self, redirect_url: &str) -> Result<()> {
        let state = self.next_state();
        let auth_url = authorize_url(redirect_url, &state);
        if let Err(e) = open_browser(&auth_url) {
            warn!("Could not open a browser: {}", e);
            println!(
                "Could not automatically open a browser. To sign in, open this URL in a browser:\n{}",
                auth_url
            );
        }
        Ok(())
    }
}

fn token_endpoint(tenant_id: &str) -> String {
    format!("{}/{}/oauth2/v2.0/token", LOGIN_ENDPOINT, tenant_id)
}

fn authorize_url(redirect_url: &str, state: &str) -> String {
    format!(
        "{}/organizations/oauth2/v2.0/authorize?response_type=code&client_id={}&redirect_uri={}&state={}&prompt=select_account&response_mode=query&scope={}",
        LOGIN_ENDPOINT,
        CLIENT_ID,
        urlencoding::encode(redirect_url),
        state,
        urlencoding::encode(SCOPES)
    )
}

fn random_string(rng: &mut impl Rng, length: usize) -> String {
    (0..length)
        .map(|_| STATE_CHARSET[rng.gen_range(0..STATE_CHARSET.len())] as char)
        .collect()
}

fn open_browser(address: &str) -> Result<()> {
    let mut command = match std::env::consts::OS {
        "linux" => {
            if is_wsl() {
                Command::new("wslview")
            } else {
                Command::new("xdg-open")
            }
        }
        "windows" => {
            let mut c = Command::new("rundll32");
            c.arg("url.dll,FileProtocolHandler");
            c
        }
        "macos" => Command::new("open"),
        other => anyhow::bail!("unsupported platform: {}", other),
    };
    command
        .arg(address)
        .spawn()
        .context("failed to launch browser")?;
    Ok(())
}

fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}
