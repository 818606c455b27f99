//! Point-in-time metric collectors.
//!
//! Each collector is a stateless read over its info source, returning flat
//! name/value pairs with "Unknown" substituted for missing fields. No
//! caching, no validation.

use common::types::{
    MetricPair, METRIC_CELLULAR_SESSION, METRIC_DEVICE_INFO, METRIC_WIFI_SESSION,
};
use std::sync::Arc;

use super::sources::{CellularInfoSource, DeviceInfoSource, WifiInfoSource};

pub const UNKNOWN_VALUE: &str = "Unknown";

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN_VALUE.to_string())
}

pub struct CellularCollector {
    source: Arc<dyn CellularInfoSource>,
}

impl CellularCollector {
    pub fn new(source: Arc<dyn CellularInfoSource>) -> Self {
        Self { source }
    }

    pub fn metric_name(&self) -> &'static str {
        METRIC_CELLULAR_SESSION
    }

    pub fn collect(&self) -> Vec<MetricPair> {
        vec![
            MetricPair::new("carrierName", or_unknown(self.source.carrier_name())),
            MetricPair::new(
                "mobileNetworkCode",
                or_unknown(self.source.mobile_network_code()),
            ),
            MetricPair::new(
                "mobileCountryCode",
                or_unknown(self.source.mobile_country_code()),
            ),
            MetricPair::new("isoCountryCode", or_unknown(self.source.iso_country_code())),
            MetricPair::new("networkType", or_unknown(self.source.network_type())),
        ]
    }
}

pub struct WifiCollector {
    source: Arc<dyn WifiInfoSource>,
}

impl WifiCollector {
    pub fn new(source: Arc<dyn WifiInfoSource>) -> Self {
        Self { source }
    }

    pub fn metric_name(&self) -> &'static str {
        METRIC_WIFI_SESSION
    }

    pub fn collect(&self) -> Vec<MetricPair> {
        vec![
            MetricPair::new("ssid", or_unknown(self.source.ssid())),
            MetricPair::new("bssid", or_unknown(self.source.bssid())),
        ]
    }
}

pub struct DeviceCollector {
    source: Arc<dyn DeviceInfoSource>,
}

impl DeviceCollector {
    pub fn new(source: Arc<dyn DeviceInfoSource>) -> Self {
        Self { source }
    }

    pub fn metric_name(&self) -> &'static str {
        METRIC_DEVICE_INFO
    }

    pub fn collect(&self) -> Vec<MetricPair> {
        vec![
            MetricPair::new("osVersion", or_unknown(self.source.os_version())),
            MetricPair::new("model", or_unknown(self.source.model())),
            MetricPair::new("manufacturer", or_unknown(self.source.manufacturer())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyCellular;

    impl CellularInfoSource for EmptyCellular {
        fn carrier_name(&self) -> Option<String> {
            None
        }

        fn mobile_network_code(&self) -> Option<String> {
            None
        }

        fn mobile_country_code(&self) -> Option<String> {
            None
        }

        fn iso_country_code(&self) -> Option<String> {
            None
        }

        fn network_type(&self) -> Option<String> {
            None
        }
    }

    struct FixedWifi;

    impl WifiInfoSource for FixedWifi {
        fn ssid(&self) -> Option<String> {
            Some("net1".to_string())
        }

        fn bssid(&self) -> Option<String> {
            None
        }
    }

    #[test]
    fn missing_cellular_fields_become_unknown() {
        let collector = CellularCollector::new(Arc::new(EmptyCellular));
        let pairs = collector.collect();

        assert_eq!(pairs.len(), 5);
        assert!(pairs
            .iter()
            .all(|pair| pair.second == serde_json::json!(UNKNOWN_VALUE)));
    }

    #[test]
    fn wifi_pairs_carry_present_values() {
        let collector = WifiCollector::new(Arc::new(FixedWifi));
        let pairs = collector.collect();

        assert_eq!(pairs[0], MetricPair::new("ssid", "net1"));
        assert_eq!(pairs[1], MetricPair::new("bssid", UNKNOWN_VALUE));
    }
}
