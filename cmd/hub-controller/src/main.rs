use actix_web::{get, middleware, web::Data, App, HttpRequest, HttpResponse, HttpServer, Responder};
use clap::Parser;
use fleet_approval_hub::config::Args;
use fleet_approval_hub::controller::{self, State};
use fleet_approval_hub::telemetry;
use fleet_approval_k8s_util::new_client_with_metrics;
use fleet_approval_types::{ApprovalRequest, ClusterApprovalRequest};

use kube::Config;
use kube_leader_election::{LeaseLock, LeaseLockParams, LeaseLockResult};
use prometheus_client::registry::Registry;
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

    let mut registry = Registry::with_prefix("fleet_hub_controller");
    let kube_config = Config::infer().await?;
    let client = new_client_with_metrics(kube_config, &mut registry).await?;
    let state = State::new(registry, args.metric_report_prometheus_url.clone());

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
        .unwrap_or_else(|_| format!("fleet-hub-controller-{}", std::process::id()));

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
        let mut controllers: Option<tokio::task::JoinHandle<()>> = None;

        loop {
            tick.tick().await;
            let lease = match leadership.try_acquire_or_renew().await {
                Ok(l) => l,
                Err(e) => {
                    error!(msg = "leader election renew/acquire failed", %e);
                    if let Some(task) = controllers.take() {
                        task.abort();
                    }
                    continue;
                }
            };

            if matches!(lease, LeaseLockResult::Acquired(_)) {
                if controllers.is_none() {
                    info!("acquired leadership; starting approval controllers");
                    let state = state.clone();
                    let client = client.clone();
                    controllers = Some(tokio::spawn(async move {
                        tokio::join!(
                            controller::run::<ClusterApprovalRequest>(state.clone(), client.clone()),
                            controller::run::<ApprovalRequest>(state, client),
                        );
                    }));
                }
            } else if let Some(task) = controllers.take() {
                info!("lost leadership; stopping approval controllers");
                task.abort();
            }
        }
    };

    tokio::select! {
        res = server.run() => res?,
        _ = leader_loop => {},
    }

    Ok(())
}
