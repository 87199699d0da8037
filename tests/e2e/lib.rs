#[cfg(all(test, feature = "e2e-tests"))]
mod test {
    use std::time::Duration;

    use fleet_approval_types::{
        fleet_member_namespace, metric_report_name, ClusterApprovalRequest,
        ClusterApprovalRequestSpec, ClusterStagedUpdateRun, ClusterStagedUpdateRunSpec,
        ClusterStagedWorkloadTracker, ClusterStagedWorkloadTrackerSpec, MetricReport,
        MetricReportSpec, WorkloadRef, APPROVED_CONDITION_TYPE, METRICS_COLLECTED_CONDITION_TYPE,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
    use kube::api::{Api, Patch, PatchParams, PostParams};
    use kube::client::Client;
    use kube::runtime::wait::{await_condition, conditions, Condition as WaitCondition};
    use kube::ResourceExt;
    use serde_json::json;
    use tokio::time::timeout;

    const FIELD_MANAGER: &str = "fleet-e2e-tests";

    fn has_condition(type_: &'static str, status: &'static str) -> impl Fn(&[Condition]) -> bool {
        move |conditions| conditions.iter().any(|c| c.type_ == type_ && c.status == status)
    }

    fn is_approved() -> impl WaitCondition<ClusterApprovalRequest> {
        |obj: Option<&ClusterApprovalRequest>| {
            obj.and_then(|o| o.status.as_ref())
                .map(|s| has_condition(APPROVED_CONDITION_TYPE, "True")(&s.conditions))
                .unwrap_or(false)
        }
    }

    fn has_report() -> impl WaitCondition<MetricReport> {
        |obj: Option<&MetricReport>| obj.is_some()
    }

    fn is_collection_failed() -> impl WaitCondition<MetricReport> {
        |obj: Option<&MetricReport>| {
            obj.and_then(|o| o.status.as_ref())
                .map(|s| has_condition(METRICS_COLLECTED_CONDITION_TYPE, "False")(&s.conditions))
                .unwrap_or(false)
        }
    }

    async fn wait_for<R, C>(api: Api<R>, name: &str, condition: C)
    where
        R: kube::Resource
            + Clone
            + std::fmt::Debug
            + for<'de> k8s_openapi::serde::Deserialize<'de>
            + 'static
            + Send,
        C: WaitCondition<R>,
    {
        timeout(Duration::from_secs(45), await_condition(api, name, condition))
            .await
            .unwrap()
            .unwrap();
    }

    async fn create_update_run(client: &Client, name: &str, stage: &str, clusters: &[&str]) {
        let api = Api::<ClusterStagedUpdateRun>::all(client.clone());
        let run = ClusterStagedUpdateRun::new(name, ClusterStagedUpdateRunSpec {});
        api.create(&PostParams::default(), &run).await.unwrap();

        let status = json!({
            "status": {
                "stagesStatus": [{
                    "stageName": stage,
                    "clusters": clusters.iter().map(|c| json!({ "clusterName": c })).collect::<Vec<_>>(),
                }]
            }
        });
        api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&status))
            .await
            .unwrap();
    }

    async fn create_tracker(client: &Client, name: &str, workloads: Vec<WorkloadRef>) {
        let api = Api::<ClusterStagedWorkloadTracker>::all(client.clone());
        let tracker =
            ClusterStagedWorkloadTracker::new(name, ClusterStagedWorkloadTrackerSpec { workloads });
        api.create(&PostParams::default(), &tracker).await.unwrap();
    }

    async fn create_approval_request(
        client: &Client,
        name: &str,
        run: &str,
        stage: &str,
    ) -> Api<ClusterApprovalRequest> {
        let api = Api::<ClusterApprovalRequest>::all(client.clone());
        let request = ClusterApprovalRequest::new(
            name,
            ClusterApprovalRequestSpec {
                target_update_run: run.to_string(),
                target_stage: stage.to_string(),
            },
        );
        api.create(&PostParams::default(), &request).await.unwrap();
        api
    }

    /// Patches a MetricReport's status directly, standing in for a real
    /// member cluster's Prometheus-backed collector: this exercises C1/C3
    /// (the approval state machine and health aggregation) in isolation.
    /// C4/C5 themselves are exercised separately in `sc6` below.
    async fn patch_report_samples(
        client: &Client,
        cluster: &str,
        run: &str,
        stage: &str,
        samples: Vec<serde_json::Value>,
    ) {
        let namespace = fleet_member_namespace(cluster);
        let name = metric_report_name(run, stage);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        wait_for(api.clone(), &name, has_report()).await;

        let status = json!({ "status": { "collectedMetrics": samples, "workloadsMonitored": samples.len() } });
        api.patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&status))
            .await
            .unwrap();
    }

    fn sample(ns: &str, name: &str, kind: &str, healthy: bool) -> serde_json::Value {
        json!({
            "namespace": ns,
            "workloadName": name,
            "workloadKind": kind,
            "health": healthy,
        })
    }

    #[tokio::test]
    async fn sc1_happy_path_cluster_scoped() {
        let client = Client::try_default().await.unwrap();
        let run = "run-sc1";
        create_update_run(&client, run, "s1", &["c1"]).await;
        create_tracker(
            &client,
            run,
            vec![WorkloadRef {
                name: "app".into(),
                namespace: "ns".into(),
                kind: Some("Deployment".into()),
                healthy_replicas: 1,
            }],
        )
        .await;
        let requests = create_approval_request(&client, run, run, "s1").await;

        patch_report_samples(&client, "c1", run, "s1", vec![sample("ns", "app", "Deployment", true)]).await;

        wait_for(requests, run, is_approved()).await;
    }

    #[tokio::test]
    async fn sc2_missing_tracker() {
        let client = Client::try_default().await.unwrap();
        let run = "run-sc2";
        create_update_run(&client, run, "s1", &["c1"]).await;
        let requests = create_approval_request(&client, run, run, "s1").await;

        let namespace = fleet_member_namespace("c1");
        let name = metric_report_name(run, "s1");
        let report_api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        wait_for(report_api, &name, has_report()).await;

        let current = requests.get(run).await.unwrap();
        assert!(!current
            .status
            .as_ref()
            .map(|s| has_condition(APPROVED_CONDITION_TYPE, "True")(&s.conditions))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn sc3_insufficient_replicas() {
        let client = Client::try_default().await.unwrap();
        let run = "run-sc3";
        create_update_run(&client, run, "s1", &["c1"]).await;
        create_tracker(
            &client,
            run,
            vec![WorkloadRef {
                name: "app".into(),
                namespace: "ns".into(),
                kind: Some("Deployment".into()),
                healthy_replicas: 2,
            }],
        )
        .await;
        let requests = create_approval_request(&client, run, run, "s1").await;

        patch_report_samples(
            &client,
            "c1",
            run,
            "s1",
            vec![
                sample("ns", "app", "Deployment", true),
                sample("ns", "app", "Deployment", false),
            ],
        )
        .await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        let current = requests.get(run).await.unwrap();
        assert!(!current
            .status
            .as_ref()
            .map(|s| has_condition(APPROVED_CONDITION_TYPE, "True")(&s.conditions))
            .unwrap_or(false));
    }

    #[tokio::test]
    async fn sc4_multi_cluster_partial_health() {
        let client = Client::try_default().await.unwrap();
        let run = "run-sc4";
        create_update_run(&client, run, "s2", &["c1", "c2"]).await;
        create_tracker(
            &client,
            run,
            vec![WorkloadRef {
                name: "app".into(),
                namespace: "ns".into(),
                kind: Some("Deployment".into()),
                healthy_replicas: 1,
            }],
        )
        .await;
        let requests = create_approval_request(&client, run, run, "s2").await;

        patch_report_samples(&client, "c1", run, "s2", vec![sample("ns", "app", "Deployment", true)]).await;
        patch_report_samples(&client, "c2", run, "s2", vec![sample("ns", "app", "Deployment", false)]).await;

        tokio::time::sleep(Duration::from_secs(20)).await;
        let current = requests.get(run).await.unwrap();
        assert!(!current
            .status
            .as_ref()
            .map(|s| has_condition(APPROVED_CONDITION_TYPE, "True")(&s.conditions))
            .unwrap_or(false));

        patch_report_samples(&client, "c2", run, "s2", vec![sample("ns", "app", "Deployment", true)]).await;
        wait_for(requests, run, is_approved()).await;
    }

    #[tokio::test]
    async fn sc5_deletion_while_pending() {
        let client = Client::try_default().await.unwrap();
        let run = "run-sc5";
        create_update_run(&client, run, "s1", &["c1"]).await;
        let requests = create_approval_request(&client, run, run, "s1").await;

        let namespace = fleet_member_namespace("c1");
        let report_name = metric_report_name(run, "s1");
        let report_api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        wait_for(report_api.clone(), &report_name, has_report()).await;

        let request = requests.get(run).await.unwrap();
        requests.delete(run, &Default::default()).await.unwrap();
        wait_for(requests, run, conditions::is_deleted(&request.uid().unwrap())).await;

        timeout(Duration::from_secs(10), async {
            loop {
                if report_api.get_opt(&report_name).await.unwrap().is_none() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        })
        .await
        .unwrap();
    }

    /// Exercises C4/C5 directly against a real collector process already
    /// watching `fleet-member-c1`: a MetricReport pointed at a `wiremock`
    /// endpoint that fails once should surface `MetricsCollected=False`
    /// without the reconciler erroring out permanently.
    #[tokio::test]
    async fn sc6_collection_outage_reports_condition() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::try_default().await.unwrap();
        let namespace = fleet_member_namespace("c1");
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        let name = "mc-run-sc6-s1";
        let report = MetricReport::new(name, MetricReportSpec { prometheus_url: server.uri() });
        api.create(&PostParams::default(), &report).await.unwrap();

        wait_for(api, name, is_collection_failed()).await;
    }
}
