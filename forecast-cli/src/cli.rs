use anyhow::Context;
use clap::{Parser, Subcommand};
use forecast_core::{
    Config, Coordinate, ForecastProvider, ForecastScreen, Gateway, GatewayClient, JsonFileStore,
    OffsetClock, ScreenState, StaticLocation, provider::provider_from_config, render, server,
};
use inquire::{Confirm, Password, Text};
use std::{path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Forecast gateway and viewer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure the weather provider credential and the gateway address.
    Configure,

    /// Run the forecast gateway.
    Serve {
        /// Port to listen on.
        #[arg(long, env = "PORT")]
        port: Option<u16>,

        /// JSON file holding the search records.
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Fetch and show the forecast for a location through a gateway.
    Show {
        /// Latitude; falls back to the configured location.
        #[arg(long, allow_negative_numbers = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude; falls back to the configured location.
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lon: Option<f64>,

        /// Gateway base URL, e.g. http://127.0.0.1:3001.
        #[arg(long)]
        gateway: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Serve { port, store } => serve(port, store).await,
            Command::Show { lat, lon, gateway } => show(lat.zip(lon), gateway).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    let api_key = Password::new("Weatherbit API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    cfg.set_api_key(api_key);

    let gateway_url = Text::new("Gateway URL:")
        .with_default(&cfg.client.gateway_url)
        .prompt()
        .context("Failed to read gateway URL")?;
    cfg.client.gateway_url = gateway_url;

    cfg.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn serve(port: Option<u16>, store: Option<PathBuf>) -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let provider: Arc<dyn ForecastProvider> = Arc::from(provider_from_config(&cfg)?);
    let store_path = match store.or_else(|| cfg.server.store_path.clone()) {
        Some(path) => path,
        None => JsonFileStore::default_path()?,
    };
    info!(path = %store_path.display(), "using search store");
    let clock = OffsetClock::from_minutes(cfg.server.utc_offset_minutes)?;

    let gateway = Arc::new(Gateway::new(
        provider,
        Arc::new(JsonFileStore::new(store_path)),
        Arc::new(clock),
    ));

    let port = port.unwrap_or(cfg.server.port);
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    server::serve(listener, gateway, server::ctrl_c()).await?;
    Ok(())
}

async fn show(coords: Option<(f64, f64)>, gateway: Option<String>) -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let coordinate = coords
        .map(|(lat, lon)| Coordinate::new(lat, lon))
        .or_else(|| cfg.client.location());
    let gateway_url = gateway.unwrap_or_else(|| cfg.client.gateway_url.clone());

    let client = GatewayClient::new(&gateway_url)?;
    let mut screen = ForecastScreen::new(StaticLocation::granted(coordinate), client);

    println!("{}", render(screen.state()));
    screen.mount().await;
    println!("{}", render(screen.state()));

    while matches!(screen.state(), ScreenState::Failed(e) if e.is_retryable()) {
        let again = Confirm::new("Retry?").with_default(true).prompt()?;
        if !again {
            break;
        }
        screen.retry().await;
        println!("{}", render(screen.state()));
    }

    Ok(())
}
