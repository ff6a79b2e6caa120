//! EDX CLI - ask about vegetation, moisture, burn, water and land cover across Indian states.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "edx-cli",
    version,
    about = "Environmental data explorer for Indian states"
)]
struct Cli {
    #[command(flatten)]
    settings: edx_cmd::config::Settings,

    #[command(subcommand)]
    command: edx_cmd::Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    edx_cmd::run(cli.command, cli.settings).await
}
