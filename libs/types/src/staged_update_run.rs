use crate::scope::ScopedApi;

use kube::{Api, Client, CustomResource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shared contract for the two staged-update-run variants. Read-only input:
/// the engine never writes to this kind.
pub trait StagedUpdateRunResource:
    kube::Resource<DynamicType = ()>
    + Clone
    + std::fmt::Debug
    + Send
    + Sync
    + 'static
    + Serialize
    + for<'de> Deserialize<'de>
{
    /// The member clusters for a named stage, or `None` if the stage does
    /// not exist in this update run's status yet.
    fn stage_clusters(&self, stage_name: &str) -> Option<Vec<String>>;
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "ClusterStagedUpdateRun",
    status = "StagedUpdateRunStatus",
    shortname = "csur"
)]
pub struct ClusterStagedUpdateRunSpec {}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "placement.kubernetes-fleet.io",
    version = "v1beta1",
    kind = "StagedUpdateRun",
    namespaced,
    status = "StagedUpdateRunStatus",
    shortname = "sur"
)]
pub struct StagedUpdateRunSpec {}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct StagedUpdateRunStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages_status: Vec<StageStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct StageStatus {
    pub stage_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<StageClusterStatus>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct StageClusterStatus {
    pub cluster_name: String,
}

fn stage_clusters(status: Option<&StagedUpdateRunStatus>, stage_name: &str) -> Option<Vec<String>> {
    status?
        .stages_status
        .iter()
        .find(|s| s.stage_name == stage_name)
        .map(|s| s.clusters.iter().map(|c| c.cluster_name.clone()).collect())
}

impl StagedUpdateRunResource for ClusterStagedUpdateRun {
    fn stage_clusters(&self, stage_name: &str) -> Option<Vec<String>> {
        stage_clusters(self.status.as_ref(), stage_name)
    }
}

impl StagedUpdateRunResource for StagedUpdateRun {
    fn stage_clusters(&self, stage_name: &str) -> Option<Vec<String>> {
        stage_clusters(self.status.as_ref(), stage_name)
    }
}

impl ScopedApi for ClusterStagedUpdateRun {
    const CLUSTER_SCOPED: bool = true;

    fn api_for(client: Client, _namespace: Option<&str>) -> Api<Self> {
        Api::all(client)
    }
}

impl ScopedApi for StagedUpdateRun {
    const CLUSTER_SCOPED: bool = false;

    fn api_for(client: Client, namespace: Option<&str>) -> Api<Self> {
        Api::namespaced(client, namespace.expect("StagedUpdateRun is namespaced"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_clusters_missing_status_is_none() {
        assert_eq!(stage_clusters(None, "s1"), None);
    }

    #[test]
    fn stage_clusters_missing_stage_is_none() {
        let status = StagedUpdateRunStatus {
            stages_status: vec![StageStatus {
                stage_name: "s1".into(),
                clusters: vec![],
            }],
        };
        assert_eq!(stage_clusters(Some(&status), "s2"), None);
    }

    #[test]
    fn stage_clusters_found_maps_names() {
        let status = StagedUpdateRunStatus {
            stages_status: vec![StageStatus {
                stage_name: "s1".into(),
                clusters: vec![
                    StageClusterStatus {
                        cluster_name: "c1".into(),
                    },
                    StageClusterStatus {
                        cluster_name: "c2".into(),
                    },
                ],
            }],
        };
        assert_eq!(
            stage_clusters(Some(&status), "s1"),
            Some(vec!["c1".to_string(), "c2".to_string()])
        );
    }
}
