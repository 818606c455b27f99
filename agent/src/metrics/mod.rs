//! Metric collection and delivery.

pub mod collect;
pub mod collectors;
pub mod push;
pub mod sources;

pub use collect::{gauge_family_from_pairs, CertifiedMetricsChannel};
pub use collectors::{CellularCollector, DeviceCollector, WifiCollector};
pub use push::MetricPushManager;
pub use sources::EnvInfoSource;
