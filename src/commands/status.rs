use anyhow::Result;
use log::info;

use crate::auth::AzureLoginService;

pub async fn status_command() -> Result<()> {
    info!("Executing status command");

    let login = AzureLoginService::new()?;

    println!("Azure Login Status");
    println!("==================");

    match login.current_login() {
        Ok(info) => {
            println!("Tenant:  {}", info.tenant_id);
            println!("Expiry:  {}", info.token.expiry);
            if info.token.valid() {
                println!("✓ Access token is valid");
            } else {
                println!("⚠ Access token has expired; it will be refreshed on the next command");
            }
        }
        Err(_) => {
            println!("Not logged in.");
            println!("Run 'aci-cli login' to sign in to Azure.");
        }
    }

    Ok(())
}
