use crate::scope::ScopedApi;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::{Api, Client, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const APPROVED_CONDITION_TYPE: &str = "Approved";
pub const REASON_ALL_WORKLOADS_HEALTHY: &str = "AllWorkloadsHealthy";

/// Shared contract for the two approval-request variants (§3, §9
/// "Polymorphic approval-request"). A small trait rather than an enum: each
/// variant is still its own `kube::Resource` / `CustomResource` kind, since
/// that is what lets `kube::Controller` watch it, but reconcile code is
/// written once against this trait and instantiated for both kinds.
pub trait ApprovalRequestResource:
    kube::Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Send
    + Sync
    + 'static
    + Serialize
    + for<'de> Deserialize<'de>
{
    fn target_update_run(&self) -> &str;
    fn target_stage(&self) -> &str;
    fn approved_condition(&self) -> Option<&Condition>;
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterApprovalRequest",
    status = "ApprovalRequestStatus",
    shortname = "car"
)]
pub struct ClusterApprovalRequestSpec {
    pub target_update_run: String,
    pub target_stage: String,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ApprovalRequest",
    namespaced,
    status = "ApprovalRequestStatus",
    shortname = "ar"
)]
pub struct ApprovalRequestSpec {
    pub target_update_run: String,
    pub target_stage: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct ApprovalRequestStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl ApprovalRequestResource for ClusterApprovalRequest {
    fn target_update_run(&self) -> &str {
        &self.spec.target_update_run
    }

    fn target_stage(&self) -> &str {
        &self.spec.target_stage
    }

    fn approved_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| crate::conditions::find_condition(&s.conditions, APPROVED_CONDITION_TYPE))
    }
}

impl ApprovalRequestResource for ApprovalRequest {
    fn target_update_run(&self) -> &str {
        &self.spec.target_update_run
    }

    fn target_stage(&self) -> &str {
        &self.spec.target_stage
    }

    fn approved_condition(&self) -> Option<&Condition> {
        self.status
            .as_ref()
            .and_then(|s| crate::conditions::find_condition(&s.conditions, APPROVED_CONDITION_TYPE))
    }
}

impl ScopedApi for ClusterApprovalRequest {
    const CLUSTER_SCOPED: bool = true;

    fn api_for(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}

impl ScopedApi for ApprovalRequest {
    const CLUSTER_SCOPED: bool = false;

    fn api_for(client: Client, namespace: Option<&str>) -> Api<Self> {
        // safe unwrap: callers always pass the object's own namespace for a
        // namespaced kind.
        Api::namespaced(client, namespace.expect("ApprovalRequest is namespaced"))
    }
}
