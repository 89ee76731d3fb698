use anyhow::Result;
use log::info;

use crate::auth::AzureLoginService;

pub async fn logout_command() -> Result<()> {
    info!("Removing azure login data");

    let login = AzureLoginService::new()?;
    login.logout()?;

    println!("✓ Removed Azure login data");
    Ok(())
}
