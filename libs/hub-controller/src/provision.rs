use crate::error::{Error, Result};

use fleet_approval_types::{fleet_member_namespace, metric_report_name, MetricReport, MetricReportSpec};

use std::collections::BTreeMap;

use kube::api::{Api, DeleteParams, ObjectMeta, Patch, PatchParams};
use kube::client::Client;

const FIELD_MANAGER: &str = "fleet-hub-controller";

/// Substitutes `{namespace}` in the configured Prometheus URL template with
/// the target cluster's `fleet-member-<cluster>` namespace.
fn render_prometheus_url(template: &str, cluster: &str) -> String {
    template.replace("{namespace}", &fleet_member_namespace(cluster))
}

fn labels(approval_request: &str, update_run: &str, stage: &str, cluster: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("approval-request".to_string(), approval_request.to_string()),
        ("update-run".to_string(), update_run.to_string()),
        ("stage".to_string(), stage.to_string()),
        ("cluster".to_string(), cluster.to_string()),
    ])
}

/// Ensures exactly one MetricReport exists per target cluster. Idempotent: a
/// second call with the same inputs server-side-applies the same object.
pub async fn ensure(
    client: Client,
    prometheus_url_template: &str,
    approval_request: &str,
    update_run: &str,
    stage: &str,
    clusters: &[String],
) -> Result<()> {
    for cluster in clusters {
        let namespace = fleet_member_namespace(cluster);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        let name = metric_report_name(update_run, stage);

        let report = MetricReport {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(namespace),
                labels: Some(labels(approval_request, update_run, stage, cluster)),
                ..ObjectMeta::default()
            },
            spec: MetricReportSpec {
                prometheus_url: render_prometheus_url(prometheus_url_template, cluster),
            },
            status: None,
        };

        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&report),
        )
        .await
        .map_err(Error::KubeError)?;
    }

    Ok(())
}

/// Deletes every MetricReport for this approval-request's stage. `NotFound`
/// is treated as success so cleanup converges even on partial prior runs.
pub async fn purge(client: Client, update_run: &str, stage: &str, clusters: &[String]) -> Result<()> {
    for cluster in clusters {
        let namespace = fleet_member_namespace(cluster);
        let api: Api<MetricReport> = Api::namespaced(client.clone(), &namespace);
        let name = metric_report_name(update_run, stage);

        match api.delete(&name, &DeleteParams::default()).await {
            Ok(_) => {}
            Err(kube::Error::Api(e)) if e.code == 404 => {}
            Err(e) => return Err(Error::KubeError(e)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_prometheus_url_substitutes_namespace() {
        assert_eq!(
            render_prometheus_url("http://prometheus.{namespace}.svc.cluster.local:9090", "c1"),
            "http://prometheus.fleet-member-c1.svc.cluster.local:9090"
        );
    }

    #[test]
    fn labels_carry_all_four_identifiers() {
        let l = labels("ar-1", "run-a", "s1", "c1");
        assert_eq!(l.get("approval-request"), Some(&"ar-1".to_string()));
        assert_eq!(l.get("update-run"), Some(&"run-a".to_string()));
        assert_eq!(l.get("stage"), Some(&"s1".to_string()));
        assert_eq!(l.get("cluster"), Some(&"c1".to_string()));
    }
}
