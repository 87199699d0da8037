use crate::error::Error;

use kube::ResourceExt;
use opentelemetry::trace::TraceId;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::{
    counter::Counter, exemplar::HistogramWithExemplars, family::Family, gauge::Gauge,
};
use prometheus_client::registry::{Registry, Unit};
use std::sync::Arc;
use tokio::time::Instant;

#[derive(Clone)]
pub struct Metrics {
    pub reconcile: ReconcileMetrics,
    pub approvals_granted: Counter,
    /// Currently-provisioned `MetricReport` count: incremented by the
    /// provisioner, decremented on purge.
    pub reports_provisioned: Gauge,
    /// `MetricReport` objects deleted during cleanup.
    pub reports_purged: Gauge,
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Registers the hub's reconciler metrics into an already-created
    /// registry, so they are exposed on the same `/metrics` page as the
    /// kube-client's HTTP metrics registered into it by the caller.
    pub fn new(mut registry: Registry) -> Self {
        let reconcile = ReconcileMetrics::default().register(&mut registry);

        let approvals_granted = Counter::default();
        registry.register(
            "approvals_granted",
            "approval-requests set to Approved=True",
            approvals_granted.clone(),
        );

        let reports_provisioned = Gauge::default();
        registry.register(
            "metric_reports_provisioned",
            "MetricReport objects currently provisioned by the provisioner",
            reports_provisioned.clone(),
        );

        let reports_purged = Gauge::default();
        registry.register(
            "metric_reports_purged",
            "MetricReport objects deleted during cleanup",
            reports_purged.clone(),
        );

        Self {
            registry: Arc::new(registry),
            reconcile,
            approvals_granted,
            reports_provisioned,
            reports_purged,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new(Registry::with_prefix("fleet_approval_hub"))
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

/// Relies on `Drop` to calculate duration and register the observation.
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
