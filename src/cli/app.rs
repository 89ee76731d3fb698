use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aci-cli")]
#[command(about = "A CLI tool for running Docker containers on Azure Container Instances")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in to Azure through a web browser
    Login(LoginArgs),
    /// Remove the cached Azure login data
    Logout,
    /// Show the current Azure login status
    Status,
}

#[derive(Args)]
pub struct LoginArgs {
    /// Tenant to log into; defaults to the first tenant of the account
    #[arg(long)]
    pub tenant_id: Option<String>,
}
