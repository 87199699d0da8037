use crate::metrics::Metrics;
use crate::query_client::AuthConfig;
use crate::reconcile;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_approval_types::{fleet_member_namespace, MetricReport};
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
            reporter: "fleet-member-collector".into(),
        }
    }
}

#[derive(Clone, Default)]
pub struct State {
    diagnostics: Arc<RwLock<Diagnostics>>,
    metrics: Arc<Metrics>,
}

impl State {
    /// Builds state around a registry the caller already registered
    /// kube-client HTTP metrics into, so both show up on one `/metrics` page.
    pub fn new(registry: prometheus_client::registry::Registry) -> Self {
        Self {
            diagnostics: Arc::new(RwLock::new(Diagnostics::default())),
            metrics: Arc::new(Metrics::new(registry)),
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

    pub fn to_context(&self, client: Client, http_client: reqwest::Client, auth: AuthConfig) -> Arc<Context> {
        Arc::new(Context {
            client,
            http_client,
            auth,
            diagnostics: self.diagnostics.clone(),
            metrics: self.metrics.clone(),
        })
    }
}

pub struct Context {
    pub client: Client,
    pub http_client: reqwest::Client,
    pub auth: AuthConfig,
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    pub metrics: Arc<Metrics>,
}

/// Runs the collector, scoped to exactly the `fleet-member-<member_cluster_name>`
/// namespace on the hub — this is both the correctness boundary (a collector
/// must not report for another cluster) and the RBAC boundary.
pub async fn run(
    state: State,
    client: Client,
    http_client: reqwest::Client,
    auth: AuthConfig,
    member_cluster_name: &str,
) {
    let namespace = fleet_member_namespace(member_cluster_name);
    let api = Api::<MetricReport>::namespaced(client.clone(), &namespace);
    if let Err(e) = api.list(&ListParams::default().limit(1)).await {
        error!("CRD is not queryable in {namespace}; {e:?}. Is the CRD installed?");
        std::process::exit(1);
    }

    trace!(msg = "init metric-report collector", namespace = %namespace);
    let (reader, writer) = reflector::store();
    let trigger = watcher::watcher(api, Config::default().any_semantic())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicates::generation)
        .map_ok(|obj| ObjectRef::from_obj(&obj));

    Controller::for_stream(trigger, reader)
        .shutdown_on_signal()
        .run(
            reconcile::reconcile,
            reconcile::error_policy,
            state.to_context(client, http_client, auth),
        )
        .filter_map(|x| async move { std::result::Result::ok(x) })
        .for_each(|_| futures::future::ready(()))
        .await;
}
