//! Azure browser login, token caching and refresh.

pub mod error;
pub mod helper;
pub mod local_server;
pub mod service;
pub mod token_store;

pub use error::LoginError;
pub use helper::{ApiHelper, AzureApiHelper, AzureToken, CLIENT_ID, SCOPES, TENANTS_URL};
pub use local_server::{LocalServer, QueryValues};
pub use service::AzureLoginService;
pub use token_store::{
    get_token_store_path, OAuthToken, TokenInfo, TokenStore, TOKEN_STORE_FILENAME,
};
