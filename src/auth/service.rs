use anyhow::anyhow;
use log::{debug, error, info};
use serde::Deserialize;
use std::future::Future;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::error::LoginError;
use super::helper::{ApiHelper, AzureApiHelper, CLIENT_ID, SCOPES, TENANTS_URL};
use super::local_server::{LocalServer, QueryValues};
use super::token_store::{get_token_store_path, OAuthToken, TokenInfo, TokenStore};

#[derive(Debug, Deserialize)]
struct TenantResult {
    value: Vec<TenantValue>,
}

#[derive(Debug, Deserialize)]
struct TenantValue {
    #[serde(rename = "tenantId")]
    tenant_id: String,
}

/// Interactive Azure login and cached-token retrieval.
///
/// The service itself is stateless across calls; every [`login`] invocation
/// runs a fresh browser round trip, and every other Azure operation goes
/// through [`get_valid_token`].
///
/// [`login`]: AzureLoginService::login
/// [`get_valid_token`]: AzureLoginService::get_valid_token
pub struct AzureLoginService {
    token_store: TokenStore,
    api_helper: Box<dyn ApiHelper>,
}

impl AzureLoginService {
    pub fn new() -> anyhow::Result<Self> {
        Self::from_path(get_token_store_path()?, Box::new(AzureApiHelper::new()))
    }

    pub fn from_path(
        token_store_path: PathBuf,
        api_helper: Box<dyn ApiHelper>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            token_store: TokenStore::new(token_store_path)?,
            api_helper,
        })
    }

    /// Perform an Azure login through a web browser.
    ///
    /// Waits for the identity provider to redirect the browser back to a
    /// local callback server, exchanges the authorization code, discovers the
    /// tenant, refreshes into a tenant-scoped token and persists it. The
    /// `cancel` future aborts the wait for the browser callback; cancellation
    /// is not an error. Once the code exchange has started the flow runs to
    /// completion or fails.
    pub async fn login(
        &self,
        requested_tenant_id: Option<&str>,
        cancel: impl Future<Output = ()> + Send,
    ) -> Result<(), LoginError> {
        let (query_tx, mut query_rx) = mpsc::channel::<QueryValues>(1);
        let mut server = match LocalServer::bind(query_tx).await {
            Ok(server) => server,
            Err(e) => {
                error!("Could not start the login callback server: {:#}", e);
                return Err(LoginError::EmptyRedirectUrl);
            }
        };
        server.serve();

        let redirect_url = server.addr();
        self.api_helper
            .open_azure_login_page(&redirect_url)
            .await
            .map_err(|e| LoginError::LoginFailed(format!("could not open login page: {:#}", e)))?;

        tokio::select! {
            _ = cancel => {
                debug!("Login cancelled while waiting for the browser callback");
                Ok(())
            }
            received = query_rx.recv() => {
                let values = received.ok_or(LoginError::NoLoginCode)?;
                self.complete_login(values, &redirect_url, requested_tenant_id).await
            }
        }
    }

    async fn complete_login(
        &self,
        values: QueryValues,
        redirect_url: &str,
        requested_tenant_id: Option<&str>,
    ) -> Result<(), LoginError> {
        if let Some(error_msg) = values.get("error") {
            return Err(LoginError::LoginFailed(error_msg.join(" ")));
        }
        let code = values
            .get("code")
            .and_then(|c| c.first())
            .ok_or(LoginError::NoLoginCode)?;

        let data = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("client_id".to_string(), CLIENT_ID.to_string()),
            ("code".to_string(), code.clone()),
            ("scope".to_string(), SCOPES.to_string()),
            ("redirect_uri".to_string(), redirect_url.to_string()),
        ];
        let token = self
            .api_helper
            .query_token(data, "organizations")
            .await
            .map_err(LoginError::TokenExchangeFailed)?;

        // The organizations-scoped token is only good for tenant discovery;
        // what gets persisted is the tenant-scoped refresh below.
        let (bits, status) = self
            .api_helper
            .query_authorization_api(TENANTS_URL, &format!("Bearer {}", token.access_token))
            .await
            .map_err(LoginError::TenantDiscoveryFailed)?;
        if status != 200 {
            return Err(LoginError::TenantDiscoveryFailed(anyhow!(
                "unable to login status code {}: {}",
                status,
                String::from_utf8_lossy(&bits)
            )));
        }
        let tenants: TenantResult = serde_json::from_slice(&bits).map_err(|e| {
            LoginError::TenantDiscoveryFailed(anyhow!("unable to unmarshal tenant: {}", e))
        })?;
        let tenant_id = get_tenant_id(&tenants.value, requested_tenant_id)
            .map_err(LoginError::TenantDiscoveryFailed)?;

        let tenant_token = self
            .refresh_token(&token.refresh_token, &tenant_id)
            .await
            .map_err(LoginError::TokenRefreshFailed)?;

        self.token_store
            .write_login_info(&TokenInfo {
                tenant_id,
                token: tenant_token,
            })
            .map_err(LoginError::Persistence)?;
        info!("Login succeeded");
        Ok(())
    }

    /// Return the cached access token, refreshing it first if it has expired.
    ///
    /// The fast path for a still-valid token makes no network call and leaves
    /// the store untouched.
    pub async fn get_valid_token(&self) -> Result<OAuthToken, LoginError> {
        let login_info = self
            .token_store
            .read_token()
            .map_err(LoginError::NotLoggedIn)?;
        if login_info.token.valid() {
            return Ok(login_info.token);
        }

        debug!("Access token expired, refreshing");
        let token = self
            .refresh_token(&login_info.token.refresh_token, &login_info.tenant_id)
            .await
            .map_err(LoginError::RefreshRequiresReLogin)?;
        self.token_store
            .write_login_info(&TokenInfo {
                tenant_id: login_info.tenant_id,
                token: token.clone(),
            })
            .map_err(LoginError::Persistence)?;
        Ok(token)
    }

    async fn refresh_token(
        &self,
        current_refresh_token: &str,
        tenant_id: &str,
    ) -> anyhow::Result<OAuthToken> {
        let data = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("client_id".to_string(), CLIENT_ID.to_string()),
            ("scope".to_string(), SCOPES.to_string()),
            ("refresh_token".to_string(), current_refresh_token.to_string()),
        ];
        let token = self.api_helper.query_token(data, tenant_id).await?;
        Ok(token.into_oauth_token())
    }

    /// Remove the cached Azure login data.
    pub fn logout(&self) -> anyhow::Result<()> {
        match self.token_store.remove_data() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                anyhow::bail!("No Azure login data to be removed")
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read the stored login record without refreshing it.
    pub fn current_login(&self) -> anyhow::Result<TokenInfo> {
        self.token_store.read_token()
    }
}

fn get_tenant_id(tenant_values: &[TenantValue], requested: Option<&str>) -> anyhow::Result<String> {
    match requested {
        None => tenant_values
            .first()
            .map(|t| t.tenant_id.clone())
            .ok_or_else(|| anyhow!("could not find azure tenant")),
        Some(requested) => tenant_values
            .iter()
            .find(|t| t.tenant_id == requested)
            .map(|t| t.tenant_id.clone())
            .ok_or_else(|| anyhow!("could not find requested azure tenant {}", requested)),
    }
}
