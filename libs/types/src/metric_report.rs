use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const METRICS_COLLECTED_CONDITION_TYPE: &str = "MetricsCollected";

/// The hub-side rendezvous object a member cluster's collector writes into.
/// Always namespaced: it lives in the per-cluster `fleet-member-<cluster>`
/// namespace so a compromised or misbehaving member can only ever write its
/// own report.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "MetricReport",
    namespaced,
    status = "MetricReportStatus",
    shortname = "mr"
)]
pub struct MetricReportSpec {
    pub prometheus_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct MetricReportStatus {
    #[serde(default)]
    pub workloads_monitored: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_collection_time: Option<Time>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collected_metrics: Vec<WorkloadSample>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct WorkloadSample {
    pub namespace: String,
    pub workload_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_name: Option<String>,
    pub health: bool,
}

/// Name a hub controller gives the `MetricReport` it provisions for a given
/// update run / stage pair, and the one a collector looks up by the same
/// rule.
pub fn metric_report_name(update_run: &str, stage: &str) -> String {
    format!("mc-{update_run}-{stage}")
}

/// Namespace a member cluster's `MetricReport` and collector config live in.
pub fn fleet_member_namespace(cluster: &str) -> String {
    format!("fleet-member-{cluster}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_report_name_follows_naming_rule() {
        assert_eq!(metric_report_name("run-1", "canary"), "mc-run-1-canary");
    }

    #[test]
    fn fleet_member_namespace_follows_naming_rule() {
        assert_eq!(fleet_member_namespace("cluster-a"), "fleet-member-cluster-a");
    }
}
