// ntuity_exporter - Prometheus metrics exporter for the ntuity energy flow API
//
// Copyright 2024 The ntuity_exporter Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use clap::Parser;
use ntuity_exporter::client::NtuityClient;
use ntuity_exporter::http::RequestState;
use ntuity_exporter::metrics::EnergyFlowMetrics;
use ntuity_exporter::poller::EnergyFlowPoller;
use prometheus_client::registry::Registry;
use reqwest::Client;
use std::error::Error;
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 8080);
const DEFAULT_API_URL: &str = "https://api.ntuity.io/";
const POLL_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[clap(name = "ntuity_exporter", version = clap::crate_version!())]
struct NtuityExporterApplication {
    /// ID of the ntuity site to export energy flow metrics for
    #[clap(long)]
    site_id: String,

    /// API key for the ntuity API
    #[clap(long, env = "NTUITY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL for the ntuity API
    #[clap(long, default_value_t = DEFAULT_API_URL.into())]
    api_url: String,

    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Address to listen on. By default, ntuity_exporter will bind to public address since
    /// the purpose is to expose metrics to an external system (Prometheus or another
    /// agent for ingestion)
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    listen_address: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = NtuityExporterApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    if opts.site_id.trim().is_empty() {
        tracing::error!(message = "no site ID given");
        process::exit(1);
    }

    let api_key = match opts.api_key.as_deref() {
        Some(k) if !k.trim().is_empty() => k.to_owned(),
        _ => {
            tracing::error!(message = "no API key given, set NTUITY_API_KEY");
            process::exit(1)
        }
    };

    // No timeout, requests are bounded only by the HTTP client defaults
    let http_client = Client::builder().build().unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    let client = NtuityClient::new(http_client, &opts.api_url).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize ntuity client", error = %e);
        process::exit(1)
    });

    let mut registry = Registry::default();
    let metrics = EnergyFlowMetrics::new(&mut registry, &opts.site_id);
    let poller = EnergyFlowPoller::new(client, metrics, &opts.site_id, &api_key, POLL_INTERVAL);

    let site = opts.site_id.clone();
    let api_url = opts.api_url.clone();
    tokio::spawn(async move {
        tracing::info!(message = "energy flow polling started", api_url = %api_url, site = %site);

        let e = poller.run().await;
        tracing::error!(message = "failed to fetch energy flow, exiting", site = %site, error = %e);
        process::exit(1);
    });

    let state = Arc::new(RequestState::new(registry));
    let app = ntuity_exporter::http::router(state);
    let server = axum::Server::try_bind(&opts.listen_address)
        .unwrap_or_else(|e| {
            tracing::error!(message = "error binding to address", address = %opts.listen_address, error = %e);
            process::exit(1)
        })
        .serve(app.into_make_service());

    tracing::info!(message = "server started", address = %server.local_addr());
    server.await?;

    Ok(())
}
