use crate::metrics::Metrics;
use crate::reconcile;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_approval_types::{ApprovalRequestKind, MetricReport};
use futures::{StreamExt, TryStreamExt};
use kube::api::{Api, ListParams};
use kube::client::Client;
use kube::runtime::{
    controller::Controller,
    events::Reporter,
    predicates,
    reflector::{self, ObjectRef},
    watcher::{self, Config},
    WatchStreamExt,
};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, trace};

/// Diagnostics exposed by the web server alongside metrics.
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: "fleet-hub-controller".into(),
        }
    }
}

/// State shared between every kind's controller task and the web server.
#[derive(Clone, Default)]
pub struct State {
    diagnostics: Arc<RwLock<Diagnostics>>,
    metrics: Arc<Metrics>,
    metric_report_prometheus_url: Arc<String>,
}

impl State {
    /// Builds state around a registry the caller already registered
    /// kube-client HTTP metrics into, so both show up on one `/metrics` page.
    pub fn new(registry: prometheus_client::registry::Registry, metric_report_prometheus_url: String) -> Self {
        Self {
            diagnostics: Arc::new(RwLock::new(Diagnostics::default())),
            metrics: Arc::new(Metrics::new(registry)),
            metric_report_prometheus_url: Arc::new(metric_report_prometheus_url),
        }
    }

    pub fn metrics(&self) -> String {
        let mut buffer = String::new();
        prometheus_client::encoding::text::encode(&mut buffer, &self.metrics.registry).unwrap();
        buffer
    }

    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }

    pub fn to_context(&self, client: Client) -> Arc<Context> {
        Arc::new(Context {
            client,
            diagnostics: self.diagnostics.clone(),
            metrics: self.metrics.clone(),
            metric_report_prometheus_url: self.metric_report_prometheus_url.clone(),
        })
    }
}

/// Context injected into every `reconcile`/`error_policy` invocation.
pub struct Context {
    pub client: Client,
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    pub metrics: Arc<Metrics>,
    pub metric_report_prometheus_url: Arc<String>,
}

/// Fails fast if `kind` isn't queryable, so a missing CRD is caught before
/// the reconcile loop ever starts rather than surfacing as a stream of
/// per-object reconcile errors.
async fn probe<R>(client: Client, kind: &str)
where
    R: kube::Resource<DynamicType = ()> + Clone + std::fmt::Debug + for<'de> serde::Deserialize<'de> + Send + Sync + 'static,
{
    let api = Api::<R>::all(client);
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("{kind} CRD is not queryable; {e:?}. Is the CRD installed?");
        std::process::exit(1);
    }
}

/// Runs the approval-reconciler for one `ApprovalRequestKind` to completion
/// (i.e. until shutdown). Both `ClusterApprovalRequest` and `ApprovalRequest`
/// are driven by this same generic loop.
pub async fn run<K>(state: State, client: Client)
where
    K: ApprovalRequestKind,
{
    probe::<K>(client.clone(), "approval-request").await;
    probe::<K::UpdateRun>(client.clone(), "staged-update-run").await;
    probe::<K::Tracker>(client.clone(), "workload-tracker").await;
    probe::<MetricReport>(client.clone(), "metric-report").await;

    trace!("init approval-request controller");
    let api = Api::<K>::all(client.clone());
    let (reader, writer) = reflector::store();
    let trigger = watcher::watcher(api, Config::default().any_semantic())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation)
        .map_ok(|obj| ObjectRef::from_obj(&obj));

    Controller::for_stream(trigger, reader)
        .shutdown_on_signal()
        .run(reconcile::reconcile::<K>, reconcile::error_policy::<K>, state.to_context(client))
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
