use chrono::Utc;

use crate::auth::{AzureLoginService, LoginError, OAuthToken};

/// Access token shaped the way the Azure management SDK expects it, with the
/// remaining lifetime expressed both relative to now and absolute since the
/// Unix epoch.
#[derive(Debug, Clone)]
pub struct AdalToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub expires_on: i64,
    pub refresh_token: String,
    pub resource: String,
}

/// Credential attached to every outgoing management API request.
#[derive(Debug, Clone)]
pub struct BearerAuthorizer {
    token: AdalToken,
}

impl BearerAuthorizer {
    pub fn new(token: AdalToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &AdalToken {
        &self.token
    }

    /// Attach the `Authorization` header to an outgoing request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            reqwest::header::AUTHORIZATION,
            format!("{} {}", self.token.token_type, self.token.access_token),
        )
    }
}

/// Build a bearer authorizer from the cached login, refreshing the token
/// first if it has expired.
pub async fn new_authorizer_from_login(
    login: &AzureLoginService,
) -> Result<BearerAuthorizer, LoginError> {
    let token = login.get_valid_token().await?;
    Ok(BearerAuthorizer::new(to_adal_token(token)))
}

fn to_adal_token(token: OAuthToken) -> AdalToken {
    let now = Utc::now();
    AdalToken {
        expires_in: (token.expiry - now).num_seconds(),
        expires_on: token.expiry.timestamp(),
        access_token: token.access_token,
        token_type: token.token_type,
        refresh_token: String::new(),
        resource: String::new(),
    }
}
