use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};
use clap::Parser;
use fleet_approval_collector::config::Args;
use fleet_approval_collector::controller::{self, State};
use fleet_approval_collector::query_client::AuthConfig;
use fleet_approval_collector::telemetry;
use fleet_approval_k8s_util::new_client_with_metrics;

use kube::config::{AuthInfo, Cluster, Context as KubeContext, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};
use kube::{Client, Config};
use kube_leader_election::{LeaseLock, LeaseLockParams, LeaseLockResult};
use prometheus_client::registry::Registry;
use secrecy::SecretString;
use tokio::time::Duration;
use tracing::{error, info};

#[get("/metrics")]
async fn metrics(c: Data<State>, _req: HttpRequest) -> impl Responder {
    HttpResponse::Ok()
        .content_type("application/openmetrics-text; version=1.0.0; charset=utf-8")
        .body(c.metrics())
}

#[get("/health")]
async fn health(_: HttpRequest) -> impl Responder {
    HttpResponse::Ok().json("healthy")
}

/// Builds a `kube::Client` pointed at the hub cluster's API server. The
/// collector has no business talking to its own cluster's control plane —
/// every object it reads or writes lives on the hub — so this never calls
/// `Config::infer`.
async fn hub_client(args: &Args, registry: &mut Registry) -> anyhow::Result<Client> {
    let mut auth_info = AuthInfo::default();
    if let Some(path) = &args.bearer_token_file {
        auth_info.token_file = Some(path.clone());
    }
    if let (Some(cert), Some(key)) = (&args.client_cert_file, &args.client_key_file) {
        auth_info.client_certificate = Some(cert.clone());
        auth_info.client_key = Some(key.clone());
    }

    let cluster = Cluster {
        server: Some(args.hub_server_url.clone()),
        insecure_skip_tls_verify: Some(args.tls_insecure),
        certificate_authority: args.ca_bundle.clone(),
        ..Default::default()
    };

    let kubeconfig = Kubeconfig {
        clusters: vec![NamedCluster { name: "hub".into(), cluster: Some(cluster) }],
        auth_infos: vec![NamedAuthInfo { name: "collector".into(), auth_info: Some(auth_info) }],
        contexts: vec![NamedContext {
            name: "hub".into(),
            context: Some(KubeContext {
                cluster: "hub".into(),
                user: "collector".into(),
                namespace: None,
                extensions: None,
            }),
        }],
        current_context: Some("hub".into()),
        ..Default::default()
    };

    let kube_config = Config::from_custom_kubeconfig(kubeconfig, &Default::default()).await?;
    Ok(new_client_with_metrics(kube_config, registry).await?)
}

async fn resolve_prometheus_auth(args: &Args) -> anyhow::Result<AuthConfig> {
    if let Some(path) = &args.prometheus_bearer_token_file {
        let token = tokio::fs::read_to_string(path).await?;
        return Ok(AuthConfig::Bearer(SecretString::from(token.trim().to_string())));
    }
    if let Some(username) = &args.prometheus_basic_username {
        let path = args
            .prometheus_basic_password_file
            .as_ref()
            .expect("clap requires prometheus_basic_password_file alongside prometheus_basic_username");
        let password = tokio::fs::read_to_string(path).await?;
        return Ok(AuthConfig::Basic {
            username: username.clone(),
            password: SecretString::from(password.trim().to_string()),
        });
    }
    Ok(AuthConfig::None)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init(
        &args.log_filter,
        args.log_format,
        args.tracing_url.as_deref(),
        args.sample_ratio,
    )
    .await?;

    let mut registry = Registry::with_prefix("fleet_member_collector");
    let client = hub_client(&args, &mut registry).await?;
    let http_client = reqwest::Client::new();
    let auth = resolve_prometheus_auth(&args).await?;
    let state = State::new(registry);

    let server = HttpServer::new({
        let state = state.clone();
        move || {
            App::new()
                .app_data(Data::new(state.clone()))
                .wrap(middleware::Logger::default().exclude("/health"))
                .service(health)
                .service(metrics)
        }
    })
    .bind(&args.metrics_bind_address)?
    .shutdown_timeout(5);

    let holder_id = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("{}-{}", args.leader_election_id, std::process::id()));

    let leadership = LeaseLock::new(
        client.clone(),
        &args.leader_election_namespace,
        LeaseLockParams {
            holder_id,
            lease_name: format!("{}-lock", args.leader_election_id),
            lease_ttl: Duration::from_secs(15),
        },
    );

    let leader_loop = async move {
        let mut tick = tokio::time::interval(Duration::from_secs(5));
        let mut task: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tick.tick().await;
            let lease = match leadership.try_acquire_or_renew().await {
                Ok(l) => l,
                Err(e) => {
                    error!(msg = "leader election renew/acquire failed", %e);
                    if let Some(t) = task.take() {
                        t.abort();
                    }
                    continue;
                }
            };

            if matches!(lease, LeaseLockResult::Acquired(_)) {
                if task.is_none() {
                    info!("acquired leadership; starting collector controller");
                    let state = state.clone();
                    let client = client.clone();
                    let http_client = http_client.clone();
                    let auth = auth.clone();
                    let member_cluster_name = args.member_cluster_name.clone();
                    task = Some(tokio::spawn(async move {
                        controller::run(state, client, http_client, auth, &member_cluster_name).await;
                    }));
                }
            } else if let Some(t) = task.take() {
                info!("lost leadership; stopping collector controller");
                t.abort();
            }
        }
    };

    tokio::select! {
        res = server.run() => res?,
        _ = leader_loop => {},
    }

    Ok(())
}
