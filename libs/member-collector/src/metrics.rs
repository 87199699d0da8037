use crate::error::Error;

use kube::ResourceExt;
use opentelemetry::trace::TraceId;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::{
    counter::Counter, exemplar::HistogramWithExemplars, family::Family, histogram::Histogram,
};
use prometheus_client::registry::{Registry, Unit};
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FailureReasonLabel {
    pub reason: String,
}

#[derive(Clone)]
pub struct Metrics {
    pub reconcile: ReconcileMetrics,
    pub collections_succeeded: Counter,
    /// Collection failures broken down by `Error::metric_label`.
    pub collections_failed: Family<FailureReasonLabel, Counter>,
    /// Latency of the `workload_health` query itself, distinct from overall
    /// reconcile duration (which also covers the status-patch round trip).
    pub query_duration: Histogram,
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Registers the collector's metrics into an already-created registry,
    /// so they are exposed on the same `/metrics` page as the kube-client's
    /// HTTP metrics registered into it by the caller.
    pub fn new(mut registry: Registry) -> Self {
        let reconcile = ReconcileMetrics::default().register(&mut registry);

        let collections_succeeded = Counter::default();
        registry.register(
            "collections_succeeded",
            "successful metrics-endpoint collection ticks",
            collections_succeeded.clone(),
        );

        let collections_failed = Family::<FailureReasonLabel, Counter>::default();
        registry.register(
            "collections_failed",
            "failed metrics-endpoint collection ticks, by reason",
            collections_failed.clone(),
        );

        let query_duration = Histogram::new([0.05, 0.1, 0.5, 1., 5., 10.].into_iter());
        registry.register_with_unit(
            "query_duration",
            "workload_health query latency",
            Unit::Seconds,
            query_duration.clone(),
        );

        Self {
            registry: Arc::new(registry),
            reconcile,
            collections_succeeded,
            collections_failed,
            query_duration,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(Registry::with_prefix("fleet_approval_collector"))
    }
}

#[derive(Clone, Hash, PartialEq, Eq, EncodeLabelSet, Debug, Default)]
pub struct TraceLabel {
    pub id: String,
}
impl TryFrom<&TraceId> for TraceLabel {
    type Error = Error;

    fn try_from(id: &TraceId) -> Result<TraceLabel, Self::Error> {
        if std::matches!(id, &TraceId::INVALID) {
            Err(Error::InvalidTraceId)
        } else {
            Ok(Self { id: id.to_string() })
        }
    }
}

#[derive(Clone)]
pub struct ReconcileMetrics {
    pub runs: Family<(), Counter>,
    pub failures: Family<ErrorLabels, Counter>,
    pub duration: HistogramWithExemplars<TraceLabel>,
}

impl Default for ReconcileMetrics {
    fn default() -> Self {
        Self {
            runs: Family::<(), Counter>::default(),
            failures: Family::<ErrorLabels, Counter>::default(),
            duration: HistogramWithExemplars::new([0.1, 0.5, 1., 5., 10.].into_iter()),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    pub instance: String,
    pub error: String,
}

impl ReconcileMetrics {
    pub fn register(self, r: &mut Registry) -> Self {
        r.register_with_unit(
            "duration",
            "reconcile duration",
            Unit::Seconds,
            self.duration.clone(),
        );
        r.register("failures", "reconciliation errors", self.failures.clone());
        r.register("runs", "reconciliations", self.runs.clone());
        self
    }

    pub fn set_failure<K: ResourceExt>(&self, obj: &Arc<K>, e: &Error) {
        self.failures
            .get_or_create(&ErrorLabels {
                instance: obj.name_any(),
                error: e.metric_label(),
            })
            .inc();
    }

    pub fn count_and_measure(&self, trace_id: &TraceId) -> ReconcileMeasurer {
        self.runs.get_or_create(&()).inc();
        ReconcileMeasurer {
            start: Instant::now(),
            labels: trace_id.try_into().ok(),
            metric: self.duration.clone(),
        }
    }
}

pub struct ReconcileMeasurer {
    start: Instant,
    labels: Option<TraceLabel>,
    metric: HistogramWithExemplars<TraceLabel>,
}

impl Drop for ReconcileMeasurer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        let labels = self.labels.take();
        self.metric.observe(duration, labels);
    }
}
