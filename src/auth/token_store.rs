use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const TOKEN_STORE_FILENAME: &str = "dockerAccessToken.json";

/// OAuth token pair with its expiry, as cached on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
}

impl OAuthToken {
    /// A token is usable as long as its expiry is still in the future.
    pub fn valid(&self) -> bool {
        !self.access_token.is_empty() && Utc::now() < self.expiry
    }
}

/// The single persisted login record: one token, scoped to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(rename = "oauthToken")]
    pub token: OAuthToken,
    #[serde(rename = "tenantId")]
    pub tenant_id: String,
}

/// File-backed store for exactly one [`TokenInfo`]. Writes replace the whole
/// file; there is a single writer (this CLI process), so no locking.
#[derive(Debug, Clone)]
pub struct TokenStore {
    file_path: PathBuf,
}

/// Default token file location, alongside the Azure CLI credential cache.
pub fn get_token_store_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("failed to get home directory")?;
    Ok(home.join(".azure").join(TOKEN_STORE_FILENAME))
}

impl TokenStore {
    pub fn new(file_path: PathBuf) -> Result<Self> {
        ensure_store_directory(&file_path)?;
        Ok(Self { file_path })
    }

    pub fn write_login_info(&self, info: &TokenInfo) -> Result<()> {
        debug!("Writing login info to {:?}", self.file_path);
        let bytes = serde_json::to_vec_pretty(info).context("failed to serialize login info")?;
        fs::write(&self.file_path, bytes)
            .with_context(|| format!("failed to write token file {:?}", self.file_path))?;
        Ok(())
    }

    pub fn read_token(&self) -> Result<TokenInfo> {
        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("failed to read token file {:?}", self.file_path))?;
        let info: TokenInfo = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse token file {:?}", self.file_path))?;
        Ok(info)
    }

    /// Delete the cached login data. Returns the raw io error so callers can
    /// distinguish "nothing to remove" from real failures.
    pub fn remove_data(&self) -> std::io::Result<()> {
        fs::remove_file(&self.file_path)
    }
}

fn ensure_store_directory(file_path: &Path) -> Result<()> {
    let parent = match file_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.exists() {
        if !parent.is_dir() {
            anyhow::bail!(
                "cannot use path {}; {} already exists and is not a directory",
                file_path.display(),
                parent.display()
            );
        }
        return Ok(());
    }
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create token store directory {:?}", parent))?;
    debug!("Created token store directory: {:?}", parent);
    Ok(())
}
