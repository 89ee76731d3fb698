use anyhow::Result;
use clap::Parser;
use log::info;

use aci_cli::cli::{Cli, Commands};
use aci_cli::commands::{login_command, logout_command, status_command};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env().init();

    let cli = Cli::parse();
    info!("Starting aci-cli");

    match cli.command {
        Commands::Login(args) => login_command(args.tenant_id).await,
        Commands::Logout => logout_command().await,
        Commands::Status => status_command().await,
    }
}
