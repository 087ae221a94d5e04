//! Delivery counters, recorded when the `metrics` feature is enabled.

/// Metric names.
pub mod names {
    /// Targets that received a bridged operation.
    pub const DELIVERED_TOTAL: &str = "lightning_bridge_delivered_total";
    /// Targets whose plugin call failed.
    pub const FAILED_TOTAL: &str = "lightning_bridge_failed_total";
    /// Targets skipped without calling the plugin.
    pub const SKIPPED_TOTAL: &str = "lightning_bridge_skipped_total";
}

#[cfg(feature = "metrics")]
pub(crate) fn record(report: &crate::report::BridgeReport) {
    use {crate::report::TargetResult, ::metrics::counter};

    for outcome in &report.outcomes {
        let name = match outcome.result {
            TargetResult::Delivered { .. } => names::DELIVERED_TOTAL,
            TargetResult::Skipped { .. } => names::SKIPPED_TOTAL,
            TargetResult::Failed { .. } => names::FAILED_TOTAL,
        };
        counter!(
            name,
            "platform" => outcome.platform.clone(),
            "action" => report.action.as_str()
        )
        .increment(1);
    }
}

#[cfg(not(feature = "metrics"))]
pub(crate) fn record(_report: &crate::report::BridgeReport) {}
