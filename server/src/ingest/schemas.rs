//! Baseline metric schemas and their normalization rules.
//!
//! Clients push flat key/value pairs; the stored documents nest related
//! fields (location, transport data) the way the downstream consumers
//! expect them.

use common::types::{
    METRIC_CELLULAR_SESSION, METRIC_CONNECTION_REPORT, METRIC_DEVICE_INFO, METRIC_NETWORK_QUALITY,
    METRIC_USAGE_HOURLY, METRIC_WIFI_SESSION,
};
use common::{Result, TelemetryError};
use serde_json::{Map, Value};

use super::MetricSchema;

const TRANSPORT_WIFI: &str = "wifi";
const TRANSPORT_CELLULAR: &str = "cellular";

pub fn baseline_schemas() -> Vec<MetricSchema> {
    vec![
        MetricSchema {
            metric_name: METRIC_WIFI_SESSION,
            collection: METRIC_WIFI_SESSION,
            validate: no_validation,
            normalize: nest_location,
        },
        MetricSchema {
            metric_name: METRIC_CELLULAR_SESSION,
            collection: METRIC_CELLULAR_SESSION,
            validate: no_validation,
            normalize: nest_location,
        },
        MetricSchema {
            metric_name: METRIC_DEVICE_INFO,
            collection: METRIC_DEVICE_INFO,
            validate: no_validation,
            normalize: keep_as_is,
        },
        MetricSchema {
            metric_name: METRIC_CONNECTION_REPORT,
            collection: METRIC_CONNECTION_REPORT,
            validate: validate_transport_type,
            normalize: normalize_connection_report,
        },
        MetricSchema {
            metric_name: METRIC_USAGE_HOURLY,
            collection: METRIC_USAGE_HOURLY,
            validate: validate_transport_type,
            normalize: keep_as_is,
        },
        MetricSchema {
            metric_name: METRIC_NETWORK_QUALITY,
            collection: METRIC_NETWORK_QUALITY,
            validate: validate_transport_type,
            normalize: keep_as_is,
        },
    ]
}

fn no_validation(_metrics: &Map<String, Value>) -> Result<()> {
    Ok(())
}

fn keep_as_is(_metrics: &mut Map<String, Value>) {}

/// `transportType`, when present, must be one of the known transports.
fn validate_transport_type(metrics: &Map<String, Value>) -> Result<()> {
    match metrics.get("transportType") {
        None => Ok(()),
        Some(Value::String(transport))
            if transport == TRANSPORT_WIFI || transport == TRANSPORT_CELLULAR =>
        {
            Ok(())
        }
        Some(other) => Err(TelemetryError::ValidationError(format!(
            "invalid transportType: {}",
            other
        ))),
    }
}

/// Merges flat `longitude`/`latitude` into a `location` sub-document. The
/// flat keys are removed even when only one of the two was pushed.
pub fn nest_location(metrics: &mut Map<String, Value>) {
    let longitude = metrics.remove("longitude");
    let latitude = metrics.remove("latitude");

    if let (Some(longitude), Some(latitude)) = (longitude, latitude) {
        let mut location = Map::new();
        location.insert("longitude".to_string(), longitude);
        location.insert("latitude".to_string(), latitude);
        metrics.insert("location".to_string(), Value::Object(location));
    }
}

/// Folds the transport-specific flat fields into a `transportData`
/// sub-document keyed by `transportType`, then nests the location.
pub fn normalize_connection_report(metrics: &mut Map<String, Value>) {
    nest_location(metrics);

    let transport_fields: &[&str] = match metrics.get("transportType").and_then(Value::as_str) {
        Some(TRANSPORT_WIFI) => &["ssid", "bssid"],
        Some(TRANSPORT_CELLULAR) => &["networkType", "cellId"],
        _ => return,
    };

    let mut transport_data = Map::new();
    for field in transport_fields {
        if let Some(value) = metrics.remove(*field) {
            transport_data.insert((*field).to_string(), value);
        }
    }
    metrics.insert(
        "transportData".to_string(),
        Value::Object(transport_data),
    );
}
