use crate::controller::Context;
use crate::error::{Error, Result};
use crate::query_client;
use crate::telemetry;

use std::sync::Arc;

use chrono::Utc;
use fleet_approval_types::{metric_report_name, MetricReport, METRICS_COLLECTED_CONDITION_TYPE};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use serde_json::json;
use tokio::time::Duration;
use tracing::{field, info, instrument, warn, Span};

const FIELD_MANAGER: &str = "fleet-member-collector";
const REASON_COLLECTION_SUCCEEDED: &str = "CollectionSucceeded";
const REASON_COLLECTION_FAILED: &str = "CollectionFailed";

#[instrument(skip(ctx, report), fields(trace_id))]
pub async fn reconcile(report: Arc<MetricReport>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    Span::current().record("trace_id", field::display(&trace_id));
    let _timer = ctx.metrics.reconcile.count_and_measure(&trace_id);

    // MetricReport is a namespaced kind; every instance this collector sees
    // was listed from its own namespace, so `namespace()` is always `Some`.
    let namespace = report.namespace().expect("MetricReport is namespaced");
    let name = report.name_any();
    let api: Api<MetricReport> = Api::namespaced(ctx.client.clone(), &namespace);
    let generation = report.metadata.generation.unwrap_or_default();

    let query_started = tokio::time::Instant::now();
    let outcome = query_client::query(&ctx.http_client, &report.spec.prometheus_url, &ctx.auth).await;
    ctx.metrics
        .query_duration
        .observe(query_started.elapsed().as_secs_f64());

    let mut status = json!({
        "lastCollectionTime": Time(Utc::now()),
    });

    let condition = match outcome {
        Ok(samples) => {
            ctx.metrics.collections_succeeded.inc();
            info!(msg = "collected workload health", name = %name, count = samples.len());
            status["collectedMetrics"] = serde_json::to_value(&samples).expect("samples serialize");
            status["workloadsMonitored"] = json!(samples.len());
            fleet_approval_types::conditions::build_condition(
                METRICS_COLLECTED_CONDITION_TYPE,
                true,
                REASON_COLLECTION_SUCCEEDED,
                "collected workload_health samples",
                generation,
            )
        }
        Err(e) => {
            ctx.metrics
                .collections_failed
                .get_or_create(&crate::metrics::FailureReasonLabel { reason: e.metric_label() })
                .inc();
            warn!(msg = "metrics collection failed", name = %name, error = %e);
            // samples and workloadsMonitored are deliberately left untouched:
            // a stale successful read must outlive a transient outage.
            fleet_approval_types::conditions::build_condition(
                METRICS_COLLECTED_CONDITION_TYPE,
                false,
                REASON_COLLECTION_FAILED,
                e.to_string(),
                generation,
            )
        }
    };
    status["conditions"] = json!([condition]);

    let patch = json!({ "status": status });
    api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .map_err(Error::KubeError)?;

    Ok(Action::requeue(Duration::from_secs(30)))
}

pub fn error_policy(report: Arc<MetricReport>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(msg = "reconcile failed", name = %report.name_any(), %error);
    ctx.metrics.reconcile.set_failure(&report, error);
    Action::requeue(Duration::from_secs(30))
}

/// The name a report for a given update run / stage pair is expected to
/// carry; used by tests constructing fixtures that mirror C2's naming rule.
#[cfg(test)]
pub(crate) fn expected_name(update_run: &str, stage: &str) -> String {
    metric_report_name(update_run, stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_name_follows_naming_rule() {
        assert_eq!(expected_name("run-a", "s1"), "mc-run-a-s1");
    }
}
