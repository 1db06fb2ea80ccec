use clap::{Parser, Subcommand};
use dotenv::dotenv;
use horizon_feed::{get_asset_volume, get_network_overview, Config, HorizonFetcher, Result};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "horizon-feed", about = "Ledger volume and network health from a Horizon API")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Hourly volume of an asset
    Volume {
        /// Asset code, XLM for the native asset
        asset_code: String,

        #[arg(long, default_value_t = 24)]
        hours: u32,

        /// Issuer account for credit assets
        #[arg(long)]
        issuer: Option<String>,
    },
    /// Latest ledger and fee statistics
    Stats,
    /// Check that Horizon answers
    Ping,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    match args.command {
        Command::Volume { asset_code, hours, issuer } => {
            info!("Fetching {} volume over {}h", asset_code, hours);
            let volume = get_asset_volume(&asset_code, hours, issuer.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&volume)?);
        }
        Command::Stats => {
            let stats = get_network_overview().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Ping => {
            let config = Config::from_env()?;
            info!("Pinging {}", config.horizon_url);
            let fetcher = HorizonFetcher::new(config)?;
            if fetcher.test_connection().await {
                println!("connected");
            } else {
                println!("unreachable");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
