//! Metric ingestion pipeline.
//!
//! Incoming pushes are trimmed to the expected keys at deserialization,
//! flattened from the pair list the mobile clients send, then dispatched
//! through a registered handler map. Unknown metric names are rejected
//! explicitly instead of falling through to a stub handler.

pub mod schemas;

use common::types::{MetricPair, MetricPushRequest, CLIENT_TYPE_ANDROID};
use common::{Result, TelemetryError};
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

use crate::store::DocumentStore;

/// Validation and normalization hooks for one known metric type. Persistence
/// goes through the shared document store with `collection` as the target.
pub struct MetricSchema {
    pub metric_name: &'static str,
    pub collection: &'static str,
    pub validate: fn(&Map<String, Value>) -> Result<()>,
    pub normalize: fn(&mut Map<String, Value>),
}

/// Metric-name to handler map, O(1) lookup.
pub struct HandlerRegistry {
    handlers: HashMap<&'static str, MetricSchema>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry preloaded with the six baseline metric schemas.
    pub fn baseline() -> Self {
        let mut registry = Self::new();
        for schema in schemas::baseline_schemas() {
            registry.register(schema);
        }
        registry
    }

    pub fn register(&mut self, schema: MetricSchema) {
        self.handlers.insert(schema.metric_name, schema);
    }

    pub fn get(&self, metric_name: &str) -> Option<&MetricSchema> {
        self.handlers.get(metric_name)
    }

    pub fn known_metrics(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Converts a numeric-looking string into a JSON number; anything else is
/// returned as the original string.
pub fn coerce_numeric(value: &str) -> Value {
    if let Ok(integer) = value.parse::<i64>() {
        json!(integer)
    } else {
        match value.parse::<f64>() {
            // NaN/infinity have no JSON number representation.
            Ok(float) if float.is_finite() => json!(float),
            _ => json!(value),
        }
    }
}

/// Flattens the client pair list into a plain key/value metrics object,
/// coercing numeric strings on the way.
pub fn flatten_metric_pairs(pairs: Vec<MetricPair>) -> Map<String, Value> {
    let mut metrics = Map::new();
    for pair in pairs {
        let value = match &pair.second {
            Value::String(s) => coerce_numeric(s),
            other => other.clone(),
        };
        metrics.insert(pair.first, value);
    }
    metrics
}

/// Runs one push through the registered handler for its metric name and
/// persists the resulting document. Fails with `UnknownMetric` when no
/// handler is registered for the name.
pub async fn process_push(
    registry: &HandlerRegistry,
    store: &dyn DocumentStore,
    request: MetricPushRequest,
) -> Result<()> {
    let MetricPushRequest {
        metric_name,
        metrics_list,
        metrics,
        identifier,
        timestamp,
    } = request;

    let schema = registry
        .get(&metric_name)
        .ok_or_else(|| TelemetryError::UnknownMetric(metric_name.clone()))?;

    // Android clients always push the flat pair list; other clients may
    // already send a nested metrics object.
    let mut metrics = if identifier.client_type == CLIENT_TYPE_ANDROID {
        flatten_metric_pairs(metrics_list.unwrap_or_default())
    } else if let Some(metrics) = metrics {
        metrics
    } else {
        flatten_metric_pairs(metrics_list.unwrap_or_default())
    };

    (schema.validate)(&metrics)?;
    (schema.normalize)(&mut metrics);

    let uuid = identifier.uuid.clone();
    let document = json!({
        "metrics": metrics,
        "identifier": identifier,
        "timestamp": timestamp,
    });

    debug!("Saving entry: {}", document);
    store.insert(schema.collection, &document).await?;
    info!("Stored {} entry for {}", schema.metric_name, uuid);

    Ok(())
}
