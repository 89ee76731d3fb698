use anyhow::Result;
use log::{error, info};

use crate::auth::AzureLoginService;

pub async fn login_command(tenant_id: Option<String>) -> Result<()> {
    info!("Starting azure login");

    let login = AzureLoginService::new()?;

    println!("A browser window will open for you to sign in to Azure.");
    println!("Press Ctrl+C to abort.");

    let cancel = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    match login.login(tenant_id.as_deref(), cancel).await {
        Ok(()) => {
            println!("✓ Login succeeded");
            Ok(())
        }
        Err(e) => {
            error!("Azure login failed: {}", e);
            println!("✗ Login failed: {}", e);
            Err(e.into())
        }
    }
}
