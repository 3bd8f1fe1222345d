use clap::Parser;
use webcam_stream::{cli::Cli, config, start_app, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = config::get_configuration()?;
    telemetry::init_subscriber(&config.log_level);

    start_app(config, cli.resolution()).await?;

    Ok(())
}
