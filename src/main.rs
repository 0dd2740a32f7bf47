mod api;
mod poi;
mod routing;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use crate::api::AppState;
use crate::poi::overpass::OverpassClient;
use crate::routing::providers::{GoogleProvider, OrsProvider, google, ors};

/// Route, matrix, and POI normalization service for trip planning.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0:3000")]
    bind: String,

    /// OpenRouteService base URL
    #[arg(long, default_value = ors::DEFAULT_BASE_URL)]
    ors_url: String,

    /// Google Maps base URL
    #[arg(long, default_value = google::DEFAULT_BASE_URL)]
    google_url: String,

    /// Overpass interpreter URL
    #[arg(long, default_value = crate::poi::overpass::DEFAULT_URL)]
    overpass_url: String,

    /// Upstream request timeout in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;

    // Credentials are read lazily per request class: a missing key only
    // fails the requests that need that provider.
    let ors_key = std::env::var("ORS_API_KEY").ok();
    let google_key = std::env::var("GOOGLE_MAPS_API_KEY").ok();
    if ors_key.is_none() {
        tracing::warn!("ORS_API_KEY not set; openrouteservice requests will fail");
    }
    if google_key.is_none() {
        tracing::warn!("GOOGLE_MAPS_API_KEY not set; google requests will fail");
    }

    let state = Arc::new(AppState {
        ors: OrsProvider::new(client.clone(), cli.ors_url, ors_key),
        google: GoogleProvider::new(client.clone(), cli.google_url, google_key),
        overpass: OverpassClient::new(client, cli.overpass_url),
    });

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(&cli.bind).await?;
    tracing::info!("listening on {}", cli.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
