use crate::telemetry::LogFormat;

use clap::Parser;

/// Startup configuration for the hub approval controller, validated once by
/// `clap` and passed down rather than read from the environment ad hoc.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleet-hub-controller")]
pub struct Args {
    /// Address the metrics endpoint binds to.
    #[arg(long, default_value = "0.0.0.0:8080", env)]
    pub metrics_bind_address: String,

    /// Address the health-probe endpoint binds to.
    #[arg(long, default_value = "0.0.0.0:8081", env)]
    pub health_probe_bind_address: String,

    /// Lease name used for leader election among hub-controller replicas.
    #[arg(long, default_value = "fleet-hub-controller", env)]
    pub leader_election_id: String,

    /// Namespace leader-election leases are created in.
    #[arg(long, default_value = "default", env)]
    pub leader_election_namespace: String,

    /// URL template written into each provisioned `MetricReport.spec.prometheusURL`.
    /// `{namespace}` is replaced with the target cluster's `fleet-member-<cluster>`
    /// namespace before being written out.
    #[arg(
        long,
        default_value = "http://prometheus.{namespace}.svc.cluster.local:9090",
        env
    )]
    pub metric_report_prometheus_url: String,

    /// Set logging filter directive for `tracing_subscriber::filter::EnvFilter`.
    #[arg(long, default_value = "info", env)]
    pub log_filter: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env)]
    pub log_format: LogFormat,

    /// URL for the OpenTelemetry tracing endpoint; tracing is disabled if unset.
    #[arg(long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    pub tracing_url: Option<String>,

    /// Sampling ratio for tracing.
    #[arg(long, default_value_t = 0.1, env)]
    pub sample_ratio: f64,
}
