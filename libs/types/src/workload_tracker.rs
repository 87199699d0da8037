use crate::scope::ScopedApi;

use kube::{Api, Client, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shared contract for the two workload-tracker variants. Operator-authored
/// input; the engine only reads it.
pub trait WorkloadTrackerResource:
    kube::Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Send
    + Sync
    + 'static
    + Serialize
    + for<'de> Deserialize<'de>
{
    fn workloads(&self) -> &[WorkloadRef];
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct WorkloadRef {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub healthy_replicas: i32,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterStagedWorkloadTracker",
    shortname = "cswt"
)]
pub struct ClusterStagedWorkloadTrackerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<WorkloadRef>,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "StagedWorkloadTracker",
    namespaced,
    shortname = "swt"
)]
pub struct StagedWorkloadTrackerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub workloads: Vec<WorkloadRef>,
}

impl WorkloadTrackerResource for ClusterStagedWorkloadTracker {
    fn workloads(&self) -> &[WorkloadRef] {
        &self.spec.workloads
    }
}

impl WorkloadTrackerResource for StagedWorkloadTracker {
    fn workloads(&self) -> &[WorkloadRef] {
        &self.spec.workloads
    }
}

impl ScopedApi for ClusterStagedWorkloadTracker {
    const CLUSTER_SCOPED: bool = true;

    fn api_for(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}

impl ScopedApi for StagedWorkloadTracker {
    const CLUSTER_SCOPED: bool = false;

    fn api_for(client: Client, namespace: Option<&str>) -> Api<Self> {
        Api::namespaced(
            client,
            namespace.expect("StagedWorkloadTracker is namespaced"),
        )
    }
}
