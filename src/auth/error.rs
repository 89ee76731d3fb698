use thiserror::Error;

/// Failures of the Azure login flow and of token retrieval/refresh.
///
/// Network and parse failures are never retried automatically; the user is
/// expected to re-run `aci-cli login`.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("not logged in to azure, you need to run \"aci-cli login\" first")]
    NotLoggedIn(#[source] anyhow::Error),

    /// The identity provider returned an explicit error in the callback.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The callback carried neither a code nor an error.
    #[error("no login code received from the identity provider")]
    NoLoginCode,

    #[error("empty redirect URL")]
    EmptyRedirectUrl,

    #[error("access token request failed")]
    TokenExchangeFailed(#[source] anyhow::Error),

    #[error("could not determine azure tenant")]
    TenantDiscoveryFailed(#[source] anyhow::Error),

    #[error("unable to refresh token")]
    TokenRefreshFailed(#[source] anyhow::Error),

    /// The stored refresh token was rejected.
    #[error("access token request failed, maybe you need to run \"aci-cli login\" again")]
    RefreshRequiresReLogin(#[source] anyhow::Error),

    #[error("could not store login info")]
    Persistence(#[source] anyhow::Error),
}
