use chrono::{Local, Offset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Baseline metric families share a fixed name between the agent and the
/// ingestion service; the storage collection carries the same name.
pub const METRIC_WIFI_SESSION: &str = "openschemaWifiSession";
pub const METRIC_CELLULAR_SESSION: &str = "openschemaCellularSession";
pub const METRIC_DEVICE_INFO: &str = "openschemaDeviceInfo";
pub const METRIC_CONNECTION_REPORT: &str = "openschemaConnectionReport";
pub const METRIC_USAGE_HOURLY: &str = "openschemaUsageHourly";
pub const METRIC_NETWORK_QUALITY: &str = "openschemaNetworkQuality";

pub const CLIENT_TYPE_ANDROID: &str = "android";
pub const CLIENT_TYPE_IOS: &str = "ios";

/// Identifies the client that collected a metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Identifier {
    pub client_type: String,
    pub uuid: String,
}

/// Collection moment of a metric. `offset_minutes` lets a consumer rebuild
/// the client's local time from the UTC millisecond timestamp.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricTimestamp {
    pub timestamp: i64,
    pub offset_minutes: i32,
}

impl MetricTimestamp {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            offset_minutes: Local::now().offset().fix().local_minus_utc() / 60,
        }
    }
}

/// One collected name/value pair, in the flat shape clients push.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricPair {
    pub first: String,
    pub second: Value,
}

impl MetricPair {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            first: name.into(),
            second: value.into(),
        }
    }
}

/// Body of `POST /metrics/push`. Deserializing through this struct trims the
/// request to the expected top-level keys; clients send either the flat
/// `metricsList` pairs or an already-nested `metrics` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPushRequest {
    pub metric_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_list: Option<Vec<MetricPair>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Map<String, Value>>,
    pub identifier: Identifier,
    pub timestamp: MetricTimestamp,
}

/// Body of `POST /register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub uuid: String,
    pub public_key: String,
}

/// Generic message envelope returned by the backend routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: None,
        }
    }

    pub fn with_error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(code.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_request_uses_wire_field_names() {
        let request = MetricPushRequest {
            metric_name: METRIC_WIFI_SESSION.to_string(),
            metrics_list: Some(vec![MetricPair::new("ssid", "net1")]),
            metrics: None,
            identifier: Identifier {
                client_type: CLIENT_TYPE_ANDROID.to_string(),
                uuid: "a-uuid".to_string(),
            },
            timestamp: MetricTimestamp {
                timestamp: 1_621_439_106_916,
                offset_minutes: -300,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["metricName"], json!("openschemaWifiSession"));
        assert_eq!(value["metricsList"][0]["first"], json!("ssid"));
        assert_eq!(value["identifier"]["clientType"], json!("android"));
        assert_eq!(value["timestamp"]["offsetMinutes"], json!(-300));
    }

    #[test]
    fn push_request_drops_unexpected_keys() {
        let body = json!({
            "metricName": "openschemaDeviceInfo",
            "metrics": {"model": "pixel"},
            "identifier": {"clientType": "android", "uuid": "u"},
            "timestamp": {"timestamp": 5, "offsetMinutes": 0},
            "unexpected": "dropped"
        });

        let parsed: MetricPushRequest = serde_json::from_value(body).unwrap();
        let round_trip = serde_json::to_value(&parsed).unwrap();
        assert!(round_trip.get("unexpected").is_none());
    }
}
