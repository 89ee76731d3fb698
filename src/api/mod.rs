//! Credentials for the Azure management API clients.

pub mod authorizer;

pub use authorizer::{new_authorizer_from_login, AdalToken, BearerAuthorizer};
