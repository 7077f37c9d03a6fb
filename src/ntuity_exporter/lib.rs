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

//! Prometheus metrics exporter for the ntuity energy flow API
//!
//! ## Features
//!
//! `ntuity_exporter` fetches the latest energy flow for a particular ntuity site once a minute
//! and emits it as Prometheus metrics. Metrics without a current reading are reported as zero.
//!
//! * `ntuity_power_consumption_calc{site=$SITE}` - Calculated power of all consumers.
//! * `ntuity_power_production{site=$SITE}` - Power of all producers, e.g. PV systems.
//! * `ntuity_power_storage{site=$SITE}` - Power from (discharging, positive) or to (charging, negative) storages.
//! * `ntuity_power_grid{site=$SITE}` - Power from (positive) or to (negative) the grid.
//! * `ntuity_power_charging_stations{site=$SITE}` - Power of all charging stations.
//! * `ntuity_power_heating{site=$SITE}` - Power of all heating devices.
//! * `ntuity_power_appliances{site=$SITE}` - Power of all other appliances.
//! * `ntuity_state_of_charge{site=$SITE}` - State of charge of all storages.
//! * `ntuity_self_sufficiency{site=$SITE}` - Self sufficiency of the current energy flow.
//!
//! ## Build
//!
//! `ntuity_exporter` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Run
//!
//! `ntuity_exporter` needs the ID of the site to export and an ntuity API key. The key is read
//! from the `NTUITY_API_KEY` environment variable.
//!
//! ```text
//! NTUITY_API_KEY=... ./ntuity_exporter --site-id 5f0c1a2b-0000-0000-0000-000000000000
//! ```
//!
//! Any failure to fetch or decode the energy flow causes `ntuity_exporter` to exit with a
//! non-zero status. Run it under a supervisor that restarts it, such as Systemd using the
//! [provided unit file](ext/ntuity_exporter.service).
//!
//! ```text
//! sudo cp target/release/ntuity_exporter /usr/local/bin/ntuity_exporter
//! sudo cp ext/ntuity_exporter.service /etc/systemd/system/ntuity_exporter.service
//! sudo systemctl edit ntuity_exporter.service   # set NTUITY_API_KEY and --site-id
//! sudo systemctl daemon-reload
//! sudo systemctl enable --now ntuity_exporter.service
//! ```
//!
//! ### Prometheus
//!
//! Prometheus metrics are exposed on port `8080` at `/metrics`. Once `ntuity_exporter`
//! is running, configure scrapes of it by your Prometheus server.
//!
//! ```yaml
//! scrape_configs:
//! - job_name: ntuity_exporter
//!   static_configs:
//!   - targets: ['example:8080']
//! ```
//!

pub mod client;
pub mod http;
pub mod metrics;
pub mod poller;
