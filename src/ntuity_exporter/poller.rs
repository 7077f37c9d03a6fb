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

use crate::client::{ClientError, NtuityClient};
use crate::metrics::EnergyFlowMetrics;
use std::time::Duration;
use tracing::{Instrument, Level};

/// Periodically fetch the energy flow of a site and update metrics from it.
///
/// There is no retry: the first failed fetch ends polling and is handed back to the caller.
pub struct EnergyFlowPoller {
    client: NtuityClient,
    metrics: EnergyFlowMetrics,
    site: String,
    api_key: String,
    interval: Duration,
}

impl EnergyFlowPoller {
    /// Create a poller for `site` that waits `interval` between fetches.
    pub fn new(client: NtuityClient, metrics: EnergyFlowMetrics, site: &str, api_key: &str, interval: Duration) -> Self {
        EnergyFlowPoller {
            client,
            metrics,
            site: site.to_owned(),
            api_key: api_key.to_owned(),
            interval,
        }
    }

    /// Fetch the latest energy flow and set metrics from it. Metrics are left as-is on error.
    pub async fn poll(&self) -> Result<(), ClientError> {
        let flow = self
            .client
            .energy_flow(&self.site, &self.api_key)
            .instrument(tracing::span!(Level::DEBUG, "ntuity_energy_flow", site = %self.site))
            .await?;

        self.metrics.observe(&flow);
        tracing::info!(
            message = "fetched new energy flow",
            site = %self.site,
            power_production = ?flow.power_production.value,
            power_consumption_calc = ?flow.power_consumption_calc.value,
        );

        Ok(())
    }

    /// Poll right away and then every `interval` until a fetch fails, returning the error.
    pub async fn run(self) -> ClientError {
        loop {
            if let Err(e) = self.poll().await {
                return e;
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
