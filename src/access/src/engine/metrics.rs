//! Prometheus-style metrics for access-limits resolution

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Engine counters and latency summary
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Access-limits requests
    pub total_requests: u64,

    /// Requests answered by the administrator override
    pub admin_overrides: u64,

    /// Results that deny all reading (deny-all filter or empty ROI)
    pub denied_results: u64,

    /// Security-token requests
    pub token_requests: u64,

    /// Configuration reloads accepted / rejected
    pub reloads: u64,
    pub rejected_reloads: u64,

    /// Latency percentiles (p50, p90, p95, p99, p99.9)
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
    pub latency_p999_ms: f64,

    pub avg_latency_ms: f64,

    pub error_count: u64,
}

impl EngineMetrics {
    /// Share of requests that ended in a deny-all result
    pub fn deny_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.denied_results as f64 / self.total_requests as f64
        }
    }
}

/// Metrics collector
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,

    /// Recent latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record a resolved access-limits request
    pub async fn record_request(&self, admin_override: bool, denied: bool) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        if admin_override {
            metrics.admin_overrides += 1;
        }
        if denied {
            metrics.denied_results += 1;
        }
    }

    pub async fn record_token_request(&self) {
        self.metrics.write().await.token_requests += 1;
    }

    pub async fn record_reload(&self, accepted: bool) {
        let mut metrics = self.metrics.write().await;
        if accepted {
            metrics.reloads += 1;
        } else {
            metrics.rejected_reloads += 1;
        }
    }

    pub async fn record_error(&self) {
        self.metrics.write().await.error_count += 1;
    }

    /// Record request latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }

        let mut metrics = self.metrics.write().await;

        let sum: f64 = samples.iter().sum();
        metrics.avg_latency_ms = sum / samples.len() as f64;

        let mut sorted = samples.clone();
        sorted.sort_by(f64::total_cmp);

        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p90_ms = Self::percentile(&sorted, 0.90);
        metrics.latency_p95_ms = Self::percentile(&sorted, 0.95);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
        metrics.latency_p999_ms = Self::percentile(&sorted, 0.999);
    }

    /// Current metrics snapshot
    pub async fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = EngineMetrics::default();
        self.latency_samples.write().await.clear();
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.metrics.read().await;

        format!(
            r#"# HELP access_requests_total Access-limits requests
# TYPE access_requests_total counter
access_requests_total {}

# HELP access_admin_overrides_total Requests answered by the administrator override
# TYPE access_admin_overrides_total counter
access_admin_overrides_total {}

# HELP access_denied_total Results denying all reads
# TYPE access_denied_total counter
access_denied_total {}

# HELP access_token_requests_total Security-token requests
# TYPE access_token_requests_total counter
access_token_requests_total {}

# HELP access_reloads_total Configuration reloads
# TYPE access_reloads_total counter
access_reloads_total{{result="accepted"}} {}
access_reloads_total{{result="rejected"}} {}

# HELP access_latency_seconds Request latency percentiles
# TYPE access_latency_seconds summary
access_latency_seconds{{quantile="0.5"}} {}
access_latency_seconds{{quantile="0.9"}} {}
access_latency_seconds{{quantile="0.95"}} {}
access_latency_seconds{{quantile="0.99"}} {}
access_latency_seconds{{quantile="0.999"}} {}

# HELP access_errors_total Error count
# TYPE access_errors_total counter
access_errors_total {}
"#,
            metrics.total_requests,
            metrics.admin_overrides,
            metrics.denied_results,
            metrics.token_requests,
            metrics.reloads,
            metrics.rejected_reloads,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p95_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
            metrics.latency_p999_ms / 1000.0,
            metrics.error_count,
        )
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
