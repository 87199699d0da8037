use crate::aggregate::{self, ClusterObservation, Evaluation};
use crate::controller::Context;
use crate::error::{Error, Result};
use crate::provision;
use crate::telemetry;

use std::sync::Arc;

use fleet_approval_types::{
    fleet_member_namespace, metric_report_name, ApprovalRequestKind, ApprovalRequestResource,
    MetricReport, ScopedApi, StagedUpdateRunResource, WorkloadTrackerResource,
    APPROVED_CONDITION_TYPE, REASON_ALL_WORKLOADS_HEALTHY,
};

use kube::api::{Api, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event as FinalizerEvent};
use kube::{Resource, ResourceExt};
use serde_json::json;
use tokio::time::Duration;
use tracing::{field, info, instrument, warn, Span};

pub const APPROVAL_FINALIZER: &str = "placement.kubernetes-fleet.io/metric-collector-report-cleanup";
const FIELD_MANAGER: &str = "fleet-hub-controller";

#[instrument(skip(ctx, obj), fields(trace_id))]
pub async fn reconcile<K: ApprovalRequestKind>(obj: Arc<K>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    Span::current().record("trace_id", field::display(&trace_id));
    let _timer = ctx.metrics.reconcile.count_and_measure(&trace_id);

    let namespace = obj.namespace();
    let api: Api<K> = K::api_for(ctx.client.clone(), namespace.as_deref());

    finalizer(&api, APPROVAL_FINALIZER, obj, |event| async {
        match event {
            FinalizerEvent::Apply(obj) => apply(obj, ctx.clone()).await,
            FinalizerEvent::Cleanup(obj) => cleanup(obj, ctx.clone()).await,
        }
    })
    .await
    .map_err(|e| Error::FinalizerError(Box::new(e)))
}

pub fn error_policy<K: ApprovalRequestKind>(obj: Arc<K>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!(msg = "reconcile failed", name = %obj.name_any(), %error);
    ctx.metrics.reconcile.set_failure(&obj, error);
    Action::requeue(Duration::from_secs(5 * 60))
}

/// S1 (terminal check) through S4 (provision & poll).
async fn apply<K: ApprovalRequestKind>(obj: Arc<K>, ctx: Arc<Context>) -> Result<Action> {
    // S5: already approved, nothing left to do.
    if obj
        .approved_condition()
        .is_some_and(|c| c.status == "True")
    {
        return Ok(Action::await_change());
    }

    let name = obj.name_any();
    let namespace = obj.namespace();
    let update_run_name = obj.target_update_run();
    let stage_name = obj.target_stage();

    // S3: resolve stage.
    let update_run_api: Api<K::UpdateRun> = K::UpdateRun::api_for(ctx.client.clone(), namespace.as_deref());
    let update_run = update_run_api
        .get(update_run_name)
        .await
        .map_err(|e| match &e {
            kube::Error::Api(ae) if ae.code == 404 => {
                Error::MissingUpdateRun(update_run_name.to_string())
            }
            _ => Error::KubeError(e),
        })?;
    let clusters = update_run
        .stage_clusters(stage_name)
        .ok_or_else(|| Error::MissingStage(update_run_name.to_string(), stage_name.to_string()))?;

    if clusters.is_empty() {
        info!(msg = "stage has no target clusters", name = %name, stage = %stage_name);
        return Ok(Action::requeue(Duration::from_secs(15)));
    }

    // S4: provision, then poll.
    provision::ensure(
        ctx.client.clone(),
        &ctx.metric_report_prometheus_url,
        &name,
        update_run_name,
        stage_name,
        &clusters,
    )
    .await?;
    ctx.metrics.reports_provisioned.inc_by(clusters.len() as i64);

    let tracker_api: Api<K::Tracker> = K::Tracker::api_for(ctx.client.clone(), namespace.as_deref());
    let tracker = tracker_api.get_opt(update_run_name).await.map_err(Error::KubeError)?;

    let mut reports = Vec::with_capacity(clusters.len());
    for cluster in &clusters {
        let report_namespace = fleet_member_namespace(cluster);
        let report_api: Api<MetricReport> = Api::namespaced(ctx.client.clone(), &report_namespace);
        let report_name = metric_report_name(update_run_name, stage_name);
        let report = report_api.get_opt(&report_name).await.map_err(Error::KubeError)?;
        reports.push((cluster.clone(), report));
    }
    let observations: Vec<ClusterObservation> = reports
        .iter()
        .map(|(cluster, report)| ClusterObservation {
            cluster: cluster.clone(),
            report: report.as_ref().and_then(|r| r.status.as_ref()),
        })
        .collect();

    match aggregate::evaluate(tracker.as_ref().map(|t| t.workloads()), &observations) {
        Evaluation::Healthy => {
            set_approved(&api, &name, &obj).await?;
            ctx.metrics.approvals_granted.inc();
            info!(msg = "approval granted", name = %name);
            Ok(Action::requeue(Duration::from_secs(15)))
        }
        Evaluation::Pending(reason) | Evaluation::Missing(reason) => {
            info!(msg = "stage not yet healthy", name = %name, reason = %reason);
            Ok(Action::requeue(Duration::from_secs(15)))
        }
    }
}

/// Double-fire guard: re-fetch-free here because the caller already observed
/// `Approved != True` earlier in this same pass; the finalizer helper's
/// read-modify-write loop means a stale write is merely redundant, not unsafe.
async fn set_approved<K: ApprovalRequestKind>(api: &Api<K>, name: &str, obj: &K) -> Result<()> {
    let condition = fleet_approval_types::conditions::build_condition(
        APPROVED_CONDITION_TYPE,
        true,
        REASON_ALL_WORKLOADS_HEALTHY,
        "all tracked workloads report healthy",
        obj.meta().generation.unwrap_or_default(),
    );
    let patch = json!({ "status": { "conditions": [condition] } });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .map_err(Error::KubeError)?;
    Ok(())
}

/// Deletion-safe cleanup: if the update-run or its stage has already
/// disappeared, there is nothing left to clean up — the finalizer is removed
/// regardless so deletion of the approval-request is never wedged.
async fn cleanup<K: ApprovalRequestKind>(obj: Arc<K>, ctx: Arc<Context>) -> Result<Action> {
    let namespace = obj.namespace();
    let update_run_name = obj.target_update_run();
    let stage_name = obj.target_stage();

    let update_run_api: Api<K::UpdateRun> = K::UpdateRun::api_for(ctx.client.clone(), namespace.as_deref());
    let clusters = match update_run_api.get_opt(update_run_name).await.map_err(Error::KubeError)? {
        Some(run) => run.stage_clusters(stage_name).unwrap_or_default(),
        None => Vec::new(),
    };

    if !clusters.is_empty() {
        provision::purge(ctx.client.clone(), update_run_name, stage_name, &clusters).await?;
        ctx.metrics.reports_provisioned.dec_by(clusters.len() as i64);
        ctx.metrics.reports_purged.inc_by(clusters.len() as i64);
    }

    Ok(Action::await_change())
}
