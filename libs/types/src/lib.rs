pub mod approval_request;
pub mod conditions;
pub mod metric_report;
pub mod scope;
pub mod staged_update_run;
pub mod workload_tracker;

pub use approval_request::{
    ApprovalRequest, ApprovalRequestResource, ApprovalRequestSpec, ApprovalRequestStatus,
    ClusterApprovalRequest, ClusterApprovalRequestSpec, APPROVED_CONDITION_TYPE,
    REASON_ALL_WORKLOADS_HEALTHY,
};
pub use metric_report::{
    fleet_member_namespace, metric_report_name, MetricReport, MetricReportSpec,
    MetricReportStatus, WorkloadSample, METRICS_COLLECTED_CONDITION_TYPE,
};
pub use scope::ScopedApi;
pub use staged_update_run::{
    ClusterStagedUpdateRun, ClusterStagedUpdateRunSpec, StageClusterStatus, StageStatus,
    StagedUpdateRun, StagedUpdateRunResource, StagedUpdateRunSpec, StagedUpdateRunStatus,
};
pub use workload_tracker::{
    ClusterStagedWorkloadTracker, ClusterStagedWorkloadTrackerSpec, StagedWorkloadTracker,
    StagedWorkloadTrackerSpec, WorkloadRef, WorkloadTrackerResource,
};

/// Ties one `ApprovalRequest` variant to its corresponding `StagedUpdateRun`
/// and workload-tracker variants, so a single generic `reconcile` can drive
/// both the cluster-scoped and namespaced controllers (§9 "Polymorphic
/// approval-request").
pub trait ApprovalRequestKind: ApprovalRequestResource + ScopedApi {
    type UpdateRun: StagedUpdateRunResource + ScopedApi;
    type Tracker: WorkloadTrackerResource + ScopedApi;
}

impl ApprovalRequestKind for ClusterApprovalRequest {
    type UpdateRun = ClusterStagedUpdateRun;
    type Tracker = ClusterStagedWorkloadTracker;
}

impl ApprovalRequestKind for ApprovalRequest {
    type UpdateRun = StagedUpdateRun;
    type Tracker = StagedWorkloadTracker;
}
