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

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Deserializer, Serialize};
use std::error;
use std::fmt;

/// Errors fetching or decoding the energy flow of a site.
#[derive(Debug)]
pub enum ClientError {
    InvalidUrl(String),
    Transport(reqwest::Error),
    Decode(StatusCode, serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl(u) => write!(f, "invalid API URL {}", u),
            Self::Transport(e) => write!(f, "{}", e),
            Self::Decode(status, e) => write!(f, "unable to decode response with status {}: {}", status, e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Decode(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Client for the energy flow endpoint of the ntuity API.
///
/// The status code of responses is deliberately not inspected: whatever the API returns is
/// handed to the JSON decoder, so an authentication failure or server error shows up as a
/// `ClientError::Decode` carrying the status.
#[derive(Debug)]
pub struct NtuityClient {
    client: Client,
    base_url: Url,
}

impl NtuityClient {
    const USER_AGENT: &'static str = concat!("ntuity_exporter/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_owned()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(NtuityClient { client, base_url })
    }

    pub async fn energy_flow(&self, site: &str, api_key: &str) -> Result<EnergyFlow, ClientError> {
        let request_url = self.energy_flow_url(site);
        tracing::debug!(message = "making latest energy flow request", url = %request_url);

        let res = self
            .client
            .get(request_url)
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = res.status();
        let body = res.bytes().await.map_err(ClientError::Transport)?;
        tracing::debug!(message = "received energy flow response", status = %status, num_bytes = body.len());

        decode_energy_flow(status, &body)
    }

    fn energy_flow_url(&self, site: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            // Checked by the constructor, base URLs can always have path segments
            url.path_segments_mut()
                .map(|mut p| {
                    p.clear()
                        .push("v1")
                        .push("sites")
                        .push(site)
                        .push("energy-flow")
                        .push("latest");
                })
                .expect("unable to modify energy flow URL path segments");
        }

        url
    }
}

fn decode_energy_flow(status: StatusCode, body: &[u8]) -> Result<EnergyFlow, ClientError> {
    serde_json::from_slice::<EnergyFlow>(body).map_err(|e| ClientError::Decode(status, e))
}

/// Treat an explicit JSON `null` the same way as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Latest energy flow of a single site.
///
/// Only the `MetricValue` fields other than `power_consumption` are exported as metrics. The
/// raw consumption and the device counts are decoded so that the entire response is available
/// to callers but nothing is done with them.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct EnergyFlow {
    #[serde(default, deserialize_with = "nullable")]
    pub power_consumption: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_consumption_calc: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_production: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_storage: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_grid: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_charging_stations: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_heating: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub power_appliances: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub state_of_charge: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub self_sufficiency: MetricValue,
    #[serde(default, deserialize_with = "nullable")]
    pub consumers_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub consumers_online_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub producers_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub producers_online_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub storages_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub storages_online_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub heatings_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub heatings_online_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub charging_points_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub charging_points_online_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub grids_total_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub grids_online_count: i64,
}

/// A single reading and when it was measured, either may be absent.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct MetricValue {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod test {
    use super::{decode_energy_flow, ClientError, NtuityClient};
    use chrono::{TimeZone, Utc};
    use reqwest::{Client, StatusCode};

    #[test]
    fn test_new_invalid_url() {
        let res = NtuityClient::new(Client::new(), "not a url");
        assert!(matches!(res, Err(ClientError::InvalidUrl(_))));

        let res = NtuityClient::new(Client::new(), "mailto:someone@example.com");
        assert!(matches!(res, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_energy_flow_url() {
        let client = NtuityClient::new(Client::new(), "https://api.ntuity.io/").unwrap();
        let url = client.energy_flow_url("2a3b-site");
        assert_eq!("https://api.ntuity.io/v1/sites/2a3b-site/energy-flow/latest", url.as_str());
    }

    #[test]
    fn test_energy_flow_url_replaces_base_path() {
        let client = NtuityClient::new(Client::new(), "http://localhost:8080/some/prefix").unwrap();
        let url = client.energy_flow_url("site");
        assert_eq!("http://localhost:8080/v1/sites/site/energy-flow/latest", url.as_str());
    }

    #[test]
    fn test_energy_flow_url_encodes_site() {
        let client = NtuityClient::new(Client::new(), "https://api.ntuity.io/").unwrap();
        let url = client.energy_flow_url("a/b c");
        assert_eq!("https://api.ntuity.io/v1/sites/a%2Fb%20c/energy-flow/latest", url.as_str());
    }

    #[test]
    fn test_decode_full_payload() {
        let body = r#"{
            "power_consumption": {"value": 1200.5, "time": "2024-01-01T00:00:00Z"},
            "power_consumption_calc": {"value": 1180.0, "time": "2024-01-01T00:00:00Z"},
            "power_production": {"value": 5.2, "time": "2024-01-01T00:00:00Z"},
            "power_storage": {"value": null, "time": "2024-01-01T00:00:00Z"},
            "power_grid": {"value": -340.25, "time": "2024-01-01T00:00:00Z"},
            "power_charging_stations": {"value": 0, "time": "2024-01-01T00:00:00Z"},
            "power_heating": {"value": 800, "time": "2024-01-01T00:00:00Z"},
            "power_appliances": {"value": 380.0, "time": "2024-01-01T00:00:00Z"},
            "state_of_charge": {"value": 87.5, "time": "2024-01-01T00:00:00Z"},
            "self_sufficiency": {"value": 0.42, "time": "2024-01-01T00:00:00Z"},
            "consumers_total_count": 4,
            "consumers_online_count": 3,
            "producers_total_count": 1,
            "producers_online_count": 1,
            "storages_total_count": 1,
            "storages_online_count": 0,
            "heatings_total_count": 1,
            "heatings_online_count": 1,
            "charging_points_total_count": 2,
            "charging_points_online_count": 2,
            "grids_total_count": 1,
            "grids_online_count": 1
        }"#;

        let flow = decode_energy_flow(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(Some(1200.5), flow.power_consumption.value);
        assert_eq!(Some(5.2), flow.power_production.value);
        assert_eq!(None, flow.power_storage.value);
        assert_eq!(Some(-340.25), flow.power_grid.value);
        assert_eq!(Some(800.0), flow.power_heating.value);
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            flow.self_sufficiency.time
        );
        assert_eq!(4, flow.consumers_total_count);
        assert_eq!(0, flow.storages_online_count);
        assert_eq!(2, flow.charging_points_online_count);
    }

    #[test]
    fn test_decode_missing_and_null_fields() {
        let body = r#"{
            "power_production": {"value": 5.2},
            "power_grid": null,
            "grids_total_count": null,
            "some_new_field": {"nested": true}
        }"#;

        let flow = decode_energy_flow(StatusCode::OK, body.as_bytes()).unwrap();
        assert_eq!(Some(5.2), flow.power_production.value);
        assert_eq!(None, flow.power_production.time);
        assert_eq!(None, flow.power_grid.value);
        assert_eq!(None, flow.state_of_charge.value);
        assert_eq!(0, flow.grids_total_count);
    }

    #[test]
    fn test_decode_malformed_body() {
        let res = decode_energy_flow(StatusCode::OK, b"{\"power_production\": {\"value\": ");
        assert!(matches!(res, Err(ClientError::Decode(StatusCode::OK, _))));
    }

    #[test]
    fn test_decode_wrong_shape() {
        let res = decode_energy_flow(StatusCode::OK, b"{\"power_production\": {\"value\": \"lots\"}}");
        assert!(matches!(res, Err(ClientError::Decode(_, _))));

        let res = decode_energy_flow(StatusCode::OK, b"[1, 2, 3]");
        assert!(matches!(res, Err(ClientError::Decode(_, _))));
    }

    #[test]
    fn test_decode_invalid_time() {
        let res = decode_energy_flow(
            StatusCode::OK,
            br#"{"power_production": {"value": 5.2, "time": "not-a-time"}}"#,
        );
        assert!(matches!(res, Err(ClientError::Decode(StatusCode::OK, _))));
    }

    #[test]
    fn test_decode_time_with_offset() {
        let body = br#"{"power_production": {"value": 5.2, "time": "2024-01-01T01:30:00+01:00"}}"#;
        let flow = decode_energy_flow(StatusCode::OK, body).unwrap();
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap()),
            flow.power_production.time
        );
    }

    #[test]
    fn test_decode_null_time() {
        let body = br#"{"power_production": {"value": 5.2, "time": null}}"#;
        let flow = decode_energy_flow(StatusCode::OK, body).unwrap();
        assert_eq!(None, flow.power_production.time);
    }

    #[test]
    fn test_decode_error_status_not_special_cased() {
        let res = decode_energy_flow(StatusCode::UNAUTHORIZED, b"");
        assert!(matches!(res, Err(ClientError::Decode(StatusCode::UNAUTHORIZED, _))));

        // A non-2xx response with a body that happens to decode is still a snapshot
        let flow = decode_energy_flow(StatusCode::INTERNAL_SERVER_ERROR, b"{}").unwrap();
        assert_eq!(None, flow.power_production.value);
    }
}
