//! ## mockreactor-telemetry::metrics
//! **Prometheus counters for the tick loop**
//!
//! Everything is counted in virtual terms: ticks, callbacks, and simulated
//! milliseconds the loop skipped instead of waiting.

use prometheus::{IntCounter, IntGauge, Registry};

#[derive(Debug, Clone)]
pub struct ReactorMetrics {
    pub registry: Registry,
    pub ticks: IntCounter,
    pub callbacks_executed: IntCounter,
    pub cancelled_skips: IntCounter,
    pub handled_faults: IntCounter,
    pub skipped_virtual_ms: IntGauge,
}

impl Default for ReactorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorMetrics {
    /// # Panics
    /// Only if the static metric definitions are malformed.
    pub fn new() -> Self {
        let registry = Registry::new();
        let ticks = IntCounter::new("mockreactor_ticks_total", "Tick loop iterations").unwrap();
        let callbacks_executed = IntCounter::new(
            "mockreactor_callbacks_total",
            "Callbacks executed, entry callback included",
        )
        .unwrap();
        let cancelled_skips = IntCounter::new(
            "mockreactor_cancelled_skips_total",
            "Queued timer tasks skipped because their handle was cancelled",
        )
        .unwrap();
        let handled_faults = IntCounter::new(
            "mockreactor_handled_faults_total",
            "Callback faults delivered to the error handler",
        )
        .unwrap();
        let skipped_virtual_ms = IntGauge::new(
            "mockreactor_skipped_virtual_ms",
            "Virtual milliseconds jumped over while idle",
        )
        .unwrap();

        registry.register(Box::new(ticks.clone())).unwrap();
        registry
            .register(Box::new(callbacks_executed.clone()))
            .unwrap();
        registry.register(Box::new(cancelled_skips.clone())).unwrap();
        registry.register(Box::new(handled_faults.clone())).unwrap();
        registry
            .register(Box::new(skipped_virtual_ms.clone()))
            .unwrap();

        Self {
            registry,
            ticks,
            callbacks_executed,
            cancelled_skips,
            handled_faults,
            skipped_virtual_ms,
        }
    }

    pub fn gather_metrics(&self) -> Result<String, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::<u8>::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }

    pub fn record_tick(&self) {
        self.ticks.inc();
    }

    pub fn record_callback(&self) {
        self.callbacks_executed.inc();
    }

    pub fn record_cancelled_skip(&self) {
        self.cancelled_skips.inc();
    }

    pub fn record_handled_fault(&self) {
        self.handled_faults.inc();
    }

    pub fn record_idle_jump(&self, delta_ms: u64) {
        self.skipped_virtual_ms
            .add(i64::try_from(delta_ms).unwrap_or(i64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_render_in_exposition() {
        let metrics = ReactorMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_callback();
        metrics.record_idle_jump(1500);

        assert_eq!(metrics.ticks.get(), 2);
        assert_eq!(metrics.skipped_virtual_ms.get(), 1500);

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("mockreactor_ticks_total 2"));
        assert!(text.contains("mockreactor_callbacks_total 1"));
    }

    #[test]
    fn clones_share_counters() {
        let metrics = ReactorMetrics::new();
        let shared = metrics.clone();
        shared.record_cancelled_skip();
        shared.record_handled_fault();
        assert_eq!(metrics.cancelled_skips.get(), 1);
        assert_eq!(metrics.handled_faults.get(), 1);
    }
}
