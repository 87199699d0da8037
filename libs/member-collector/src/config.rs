use crate::telemetry::LogFormat;

use clap::Parser;

/// Startup configuration for the member-side collector. `HUB_SERVER_URL`
/// and credentials point the collector's `kube::Client` at the *hub*
/// cluster's API server — the collector's own in-cluster identity is
/// irrelevant, since every object it reads or writes lives on the hub.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleet-member-collector")]
pub struct Args {
    /// Name of the member cluster this collector serves; it watches only
    /// the hub namespace `fleet-member-<member_cluster_name>`.
    #[arg(long, env)]
    pub member_cluster_name: String,

    /// Base URL of the hub cluster's Kubernetes API server.
    #[arg(long, env)]
    pub hub_server_url: String,

    /// Bearer token file used to authenticate to the hub API server.
    #[arg(long, env, conflicts_with_all = ["client_cert_file", "client_key_file"])]
    pub bearer_token_file: Option<String>,

    /// mTLS client certificate file (requires `client_key_file`).
    #[arg(long, env, requires = "client_key_file")]
    pub client_cert_file: Option<String>,

    /// mTLS client key file (requires `client_cert_file`).
    #[arg(long, env, requires = "client_cert_file")]
    pub client_key_file: Option<String>,

    /// Skip TLS certificate verification against the hub API server.
    #[arg(long, env, default_value_t = false)]
    pub tls_insecure: bool,

    /// Extra CA bundle file to trust for the hub API server.
    #[arg(long, env)]
    pub ca_bundle: Option<String>,

    /// Bearer token file used to authenticate to each member's Prometheus-shaped
    /// metrics endpoint. Mutually exclusive with the basic-auth username.
    #[arg(long, env, conflicts_with = "prometheus_basic_username")]
    pub prometheus_bearer_token_file: Option<String>,

    /// Basic-auth username for the metrics endpoint (requires the password file).
    #[arg(long, env, requires = "prometheus_basic_password_file")]
    pub prometheus_basic_username: Option<String>,

    /// Basic-auth password file for the metrics endpoint.
    #[arg(long, env, requires = "prometheus_basic_username")]
    pub prometheus_basic_password_file: Option<String>,

    /// Lease identifier used for leader election among collector replicas.
    #[arg(long, default_value = "fleet-member-collector", env)]
    pub leader_election_id: String,

    /// Namespace leader-election leases are created in.
    #[arg(long, default_value = "default", env)]
    pub leader_election_namespace: String,

    #[arg(long, default_value = "0.0.0.0:8080", env)]
    pub metrics_bind_address: String,

    #[arg(long, default_value = "0.0.0.0:8081", env)]
    pub health_probe_bind_address: String,

    #[arg(long, default_value = "info", env)]
    pub log_filter: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text, env)]
    pub log_format: LogFormat,

    #[arg(long, env = "OPENTELEMETRY_ENDPOINT_URL")]
    pub tracing_url: Option<String>,

    #[arg(long, default_value_t = 0.1, env)]
    pub sample_ratio: f64,
}
