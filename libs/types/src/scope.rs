use kube::{Api, Client, Resource};

/// Resolves the right [`Api`] handle for a kind whose scope (cluster vs.
/// namespace) is a compile-time property of the Rust type rather than a
/// runtime branch.
///
/// `ClusterApprovalRequest` and friends ignore `namespace`; `ApprovalRequest`
/// and friends require it. Centralizing the `Api::all` vs `Api::namespaced`
/// choice here is what lets the reconcile code in `fleet-approval-hub` stay
/// generic over both variants instead of duplicating the reconcile loop.
pub trait ScopedApi: Resource<DynamicType = ()> + Clone + std::fmt::Debug + Send + Sync + 'static {
    /// `true` for the cluster-scoped variant of a kind pair.
    const CLUSTER_SCOPED: bool;

    fn api_for(client: Client, namespace: Option<&str>) -> Api<Self>
    where
        Self: Sized;
}
