use fleet_approval_types::{MetricReportStatus, WorkloadRef, WorkloadSample};

/// Outcome of evaluating one stage's health. A pure function of its inputs —
/// no I/O, so it is exercised entirely with `#[test]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Healthy,
    Pending(String),
    Missing(String),
}

/// One cluster's fetched MetricReport status, or `None` if the report does
/// not exist yet.
pub struct ClusterObservation<'a> {
    pub cluster: String,
    pub report: Option<&'a MetricReportStatus>,
}

/// Decides whether a stage is healthy given the tracker's workload list and
/// the MetricReport observed (or not) in every target cluster.
///
/// `tracker` is `None` when the `WorkloadTracker` object itself was not
/// found, and `Some(&[])` when it exists but declares no workloads.
pub fn evaluate(tracker: Option<&[WorkloadRef]>, clusters: &[ClusterObservation]) -> Evaluation {
    let workloads = match tracker {
        None => return Evaluation::Missing("tracker not found".to_string()),
        Some([]) => return Evaluation::Pending("tracker has no workloads".to_string()),
        Some(w) => w,
    };

    for observation in clusters {
        if let Err(reason) = cluster_healthy(workloads, observation.report) {
            return Evaluation::Pending(format!("cluster {}: {reason}", observation.cluster));
        }
    }

    Evaluation::Healthy
}

/// Evaluates one cluster: healthy iff every tracked workload is healthy.
fn cluster_healthy(workloads: &[WorkloadRef], report: Option<&MetricReportStatus>) -> Result<(), String> {
    let report = report.ok_or_else(|| "report not found".to_string())?;

    for workload in workloads {
        workload_healthy(workload, &report.collected_metrics)?;
    }

    Ok(())
}

/// Evaluates one tracked workload against the samples in a report, applying
/// the `healthyReplicas` count rule.
fn workload_healthy(workload: &WorkloadRef, samples: &[WorkloadSample]) -> Result<(), String> {
    let matched = samples.iter().filter(|s| matches(workload, s));
    let healthy_count = matched.filter(|s| s.health).count() as i32;

    if healthy_count >= workload.healthy_replicas {
        Ok(())
    } else if healthy_count == 0 && !samples.iter().any(|s| matches(workload, s)) {
        Err(format!(
            "workload {}/{} not found",
            workload.namespace, workload.name
        ))
    } else {
        Err(format!(
            "workload {}/{} insufficient healthy pods (got {healthy_count}, need {})",
            workload.namespace, workload.name, workload.healthy_replicas
        ))
    }
}

fn matches(workload: &WorkloadRef, sample: &WorkloadSample) -> bool {
    if sample.namespace != workload.namespace || sample.workload_name != workload.name {
        return false;
    }
    match &workload.kind {
        Some(kind) => sample
            .workload_kind
            .as_ref()
            .is_some_and(|sk| sk.eq_ignore_ascii_case(kind)),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(namespace: &str, name: &str, kind: Option<&str>, health: bool) -> WorkloadSample {
        WorkloadSample {
            namespace: namespace.to_string(),
            workload_name: name.to_string(),
            workload_kind: kind.map(str::to_string),
            pod_name: None,
            health,
        }
    }

    fn workload(namespace: &str, name: &str, kind: Option<&str>, healthy_replicas: i32) -> WorkloadRef {
        WorkloadRef {
            namespace: namespace.to_string(),
            name: name.to_string(),
            kind: kind.map(str::to_string),
            healthy_replicas,
        }
    }

    #[test]
    fn missing_tracker_is_missing() {
        let result = evaluate(None, &[]);
        assert_eq!(result, Evaluation::Missing("tracker not found".to_string()));
    }

    #[test]
    fn empty_tracker_is_pending() {
        let result = evaluate(Some(&[]), &[]);
        assert_eq!(
            result,
            Evaluation::Pending("tracker has no workloads".to_string())
        );
    }

    #[test]
    fn happy_path_single_cluster_healthy() {
        let workloads = vec![workload("ns", "app", Some("Deployment"), 1)];
        let status = MetricReportStatus {
            collected_metrics: vec![sample("ns", "app", Some("Deployment"), true)],
            ..Default::default()
        };
        let observations = vec![ClusterObservation {
            cluster: "c1".to_string(),
            report: Some(&status),
        }];

        assert_eq!(evaluate(Some(&workloads), &observations), Evaluation::Healthy);
    }

    #[test]
    fn insufficient_replicas_is_pending() {
        let workloads = vec![workload("ns", "app", None, 2)];
        let status = MetricReportStatus {
            collected_metrics: vec![
                sample("ns", "app", None, true),
                sample("ns", "app", None, false),
            ],
            ..Default::default()
        };
        let observations = vec![ClusterObservation {
            cluster: "c1".to_string(),
            report: Some(&status),
        }];

        let result = evaluate(Some(&workloads), &observations);
        assert!(matches!(result, Evaluation::Pending(_)));
    }

    #[test]
    fn missing_report_counts_unhealthy() {
        let workloads = vec![workload("ns", "app", None, 1)];
        let observations = vec![ClusterObservation {
            cluster: "c1".to_string(),
            report: None,
        }];

        let result = evaluate(Some(&workloads), &observations);
        assert_eq!(
            result,
            Evaluation::Pending("cluster c1: report not found".to_string())
        );
    }

    #[test]
    fn multi_cluster_partial_health_is_pending() {
        let workloads = vec![workload("ns", "app", None, 1)];
        let healthy_status = MetricReportStatus {
            collected_metrics: vec![sample("ns", "app", None, true)],
            ..Default::default()
        };
        let unhealthy_status = MetricReportStatus {
            collected_metrics: vec![sample("ns", "app", None, false)],
            ..Default::default()
        };
        let observations = vec![
            ClusterObservation {
                cluster: "c1".to_string(),
                report: Some(&healthy_status),
            },
            ClusterObservation {
                cluster: "c2".to_string(),
                report: Some(&unhealthy_status),
            },
        ];

        assert!(matches!(
            evaluate(Some(&workloads), &observations),
            Evaluation::Pending(_)
        ));
    }

    #[test]
    fn kind_match_is_case_insensitive() {
        let workloads = vec![workload("ns", "app", Some("deployment"), 1)];
        let status = MetricReportStatus {
            collected_metrics: vec![sample("ns", "app", Some("Deployment"), true)],
            ..Default::default()
        };
        let observations = vec![ClusterObservation {
            cluster: "c1".to_string(),
            report: Some(&status),
        }];

        assert_eq!(evaluate(Some(&workloads), &observations), Evaluation::Healthy);
    }

    #[test]
    fn boundary_value_one_point_zero_is_healthy() {
        // threshold semantics (gauge >= 1.0 => true) are applied by the
        // metrics-query client before a WorkloadSample is constructed; here
        // we confirm the aggregator only looks at the resulting `health` bool.
        let workloads = vec![workload("ns", "app", None, 1)];
        let status = MetricReportStatus {
            collected_metrics: vec![sample("ns", "app", None, true)],
            ..Default::default()
        };
        let observations = vec![ClusterObservation {
            cluster: "c1".to_string(),
            report: Some(&status),
        }];

        assert_eq!(evaluate(Some(&workloads), &observations), Evaluation::Healthy);
    }
}
