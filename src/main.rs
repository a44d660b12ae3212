use clap::Parser;
use paper_watch::cli::{Cli, Commands};
use paper_watch::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        toml::from_str(include_str!("../config.toml.example")).expect("Invalid default config")
    });

    if let Commands::Run(args) = &cli.command {
        if args.verbose {
            config.telemetry.log_level = "debug".to_string();
        }
    }

    // Initialize telemetry
    paper_watch::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Run(args) => {
            args.execute(&config).await?;
        }
        Commands::Config => {
            let monitor = &config.monitor;
            println!("Current configuration:");
            println!(
                "  Monitor: leverage={}x, margin={}, stop-loss=-{}, take-profit=+{}",
                monitor.leverage, monitor.margin_per_trade, monitor.max_loss, monitor.target_profit
            );
            println!(
                "  Polling: every {}s, {}s backoff after errors",
                monitor.poll_interval_secs, monitor.error_backoff_secs
            );
            println!("  Symbols: {}", monitor.symbols.join(", "));
            println!(
                "  Feed: {} (timeout {}s)",
                config.feed.base_url, config.feed.timeout_secs
            );
            println!(
                "  Telemetry: level={}, format={:?}, metrics_port={:?}",
                config.telemetry.log_level, config.telemetry.log_format, config.telemetry.metrics_port
            );
        }
    }

    Ok(())
}
