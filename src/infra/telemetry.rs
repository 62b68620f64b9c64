use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install the global tracing subscriber and register metric descriptions.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(InfraError::from)
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "konut_proximity_hit_total",
            Unit::Count,
            "Proximity reads answered from a stored cache row."
        );
        describe_counter!(
            "konut_proximity_miss_total",
            Unit::Count,
            "Proximity reads that had to compute the row."
        );
        describe_counter!(
            "konut_proximity_invalidated_total",
            Unit::Count,
            "Proximity cache rows removed by invalidation."
        );
        describe_counter!(
            "konut_proximity_compute_failed_total",
            Unit::Count,
            "Proximity computations that returned an error."
        );
        describe_histogram!(
            "konut_proximity_compute_ms",
            Unit::Milliseconds,
            "Latency of computing and storing one proximity cache row."
        );
        describe_histogram!(
            "konut_proximity_batch_ms",
            Unit::Milliseconds,
            "Latency of a full proximity recompute."
        );
        describe_counter!(
            "konut_distances_updated_total",
            Unit::Count,
            "Listings whose nearest distances were replaced."
        );
        describe_counter!(
            "konut_distances_failed_total",
            Unit::Count,
            "Listings whose nearest distance update failed."
        );
    });
}
