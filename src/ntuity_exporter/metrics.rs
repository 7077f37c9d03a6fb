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

use crate::client::{EnergyFlow, MetricValue};
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use std::sync::atomic::AtomicU64;

const NAMESPACE: &str = "ntuity";

/// Labels shared by every metric, identifying the site being polled.
#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct SiteLabels {
    pub site: String,
}

type SiteGauge = Family<SiteLabels, Gauge<f64, AtomicU64>>;

/// Holder for metrics that can be set from an `EnergyFlow` response.
///
/// All metrics are created and registered upon call to `EnergyFlowMetrics::new()`. Metrics
/// all share the prefix "ntuity_" and have a "site" label set to the site being polled.
/// The label is created with a value of zero right away so that scrapes made before the
/// first successful poll see every metric.
///
/// Clones share the same underlying gauges.
#[derive(Debug, Clone)]
pub struct EnergyFlowMetrics {
    labels: SiteLabels,
    power_consumption_calc: SiteGauge,
    power_production: SiteGauge,
    power_storage: SiteGauge,
    power_grid: SiteGauge,
    power_charging_stations: SiteGauge,
    power_heating: SiteGauge,
    power_appliances: SiteGauge,
    state_of_charge: SiteGauge,
    self_sufficiency: SiteGauge,
}

impl EnergyFlowMetrics {
    /// Create a new `EnergyFlowMetrics` for `site` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry, site: &str) -> Self {
        let reg = reg.sub_registry_with_prefix(NAMESPACE);

        let power_consumption_calc = SiteGauge::default();
        reg.register(
            "power_consumption_calc",
            "Calculated power of all consumers, e.g. appliances, charging points, heat pumps",
            power_consumption_calc.clone(),
        );

        let power_production = SiteGauge::default();
        reg.register(
            "power_production",
            "Power of all producers, e.g. PV systems",
            power_production.clone(),
        );

        let power_storage = SiteGauge::default();
        reg.register(
            "power_storage",
            "Power from (+, discharging) or to (-, charging) the storages",
            power_storage.clone(),
        );

        let power_grid = SiteGauge::default();
        reg.register("power_grid", "Power from (+) or to (-) the grid", power_grid.clone());

        let power_charging_stations = SiteGauge::default();
        reg.register(
            "power_charging_stations",
            "Power of all charging stations",
            power_charging_stations.clone(),
        );

        let power_heating = SiteGauge::default();
        reg.register("power_heating", "Power of all heating devices", power_heating.clone());

        let power_appliances = SiteGauge::default();
        reg.register(
            "power_appliances",
            "Power of all appliances (total consumption minus all other sub-consumers)",
            power_appliances.clone(),
        );

        let state_of_charge = SiteGauge::default();
        reg.register(
            "state_of_charge",
            "State of charge of all storages",
            state_of_charge.clone(),
        );

        let self_sufficiency = SiteGauge::default();
        reg.register(
            "self_sufficiency",
            "Performance value of the current energy flow, based on power",
            self_sufficiency.clone(),
        );

        let metrics = Self {
            labels: SiteLabels { site: site.to_owned() },
            power_consumption_calc,
            power_production,
            power_storage,
            power_grid,
            power_charging_stations,
            power_heating,
            power_appliances,
            state_of_charge,
            self_sufficiency,
        };

        for gauge in metrics.gauges() {
            let _ = gauge.get_or_create(&metrics.labels);
        }

        metrics
    }

    /// Set every metric from the provided energy flow.
    ///
    /// If the energy flow doesn't contain a value for a particular metric, the metric will
    /// be set to zero.
    pub fn observe(&self, flow: &EnergyFlow) {
        self.set_from_metric(&self.power_consumption_calc, &flow.power_consumption_calc);
        self.set_from_metric(&self.power_production, &flow.power_production);
        self.set_from_metric(&self.power_storage, &flow.power_storage);
        self.set_from_metric(&self.power_grid, &flow.power_grid);
        self.set_from_metric(&self.power_charging_stations, &flow.power_charging_stations);
        self.set_from_metric(&self.power_heating, &flow.power_heating);
        self.set_from_metric(&self.power_appliances, &flow.power_appliances);
        self.set_from_metric(&self.state_of_charge, &flow.state_of_charge);
        self.set_from_metric(&self.self_sufficiency, &flow.self_sufficiency);
    }

    fn gauges(&self) -> [&SiteGauge; 9] {
        [
            &self.power_consumption_calc,
            &self.power_production,
            &self.power_storage,
            &self.power_grid,
            &self.power_charging_stations,
            &self.power_heating,
            &self.power_appliances,
            &self.state_of_charge,
            &self.self_sufficiency,
        ]
    }

    fn set_from_metric(&self, gauge: &SiteGauge, metric: &MetricValue) {
        gauge.get_or_create(&self.labels).set(metric.value.unwrap_or(0.0));
    }
}
