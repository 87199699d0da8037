use crate::error::{Error, Result};

use std::time::Duration;

use fleet_approval_types::WorkloadSample;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

const QUERY: &str = "workload_health";
const TIMEOUT: Duration = Duration::from_secs(30);

/// Optional authentication against a member-local Prometheus endpoint.
/// Credentials are injected once at startup, never read from disk per call.
#[derive(Clone)]
pub enum AuthConfig {
    None,
    Bearer(SecretString),
    Basic { username: String, password: SecretString },
}

#[derive(Debug, Deserialize)]
struct PrometheusResponse {
    status: String,
    data: PrometheusData,
}

#[derive(Debug, Deserialize)]
struct PrometheusData {
    result: Vec<PrometheusResult>,
}

#[derive(Debug, Deserialize)]
struct PrometheusResult {
    metric: std::collections::HashMap<String, String>,
    value: (f64, String),
}

/// Executes the single canonical `workload_health` query against a member's
/// Prometheus-shaped metrics endpoint and parses the response into samples.
pub async fn query(client: &reqwest::Client, base_url: &str, auth: &AuthConfig) -> Result<Vec<WorkloadSample>> {
    let url = format!("{}/api/v1/query?query={QUERY}", base_url.trim_end_matches('/'));

    let mut request = client.get(&url).timeout(TIMEOUT);
    request = match auth {
        AuthConfig::None => request,
        AuthConfig::Bearer(token) => request.bearer_auth(token.expose_secret()),
        AuthConfig::Basic { username, password } => {
            request.basic_auth(username, Some(password.expose_secret()))
        }
    };

    let response = request
        .send()
        .await
        .map_err(|e| Error::QueryFailed(e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::QueryFailed(format!(
            "metrics endpoint returned {}",
            response.status()
        )));
    }

    let body: PrometheusResponse = response
        .json()
        .await
        .map_err(|e| Error::InvalidReport(e.to_string()))?;

    if body.status != "success" {
        return Err(Error::QueryFailed(format!(
            "metrics endpoint reported status {:?}",
            body.status
        )));
    }

    let samples = body
        .data
        .result
        .into_iter()
        .filter_map(|result| {
            let namespace = result.metric.get("namespace")?.clone();
            let workload_name = result.metric.get("app")?.clone();
            if namespace.is_empty() || workload_name.is_empty() {
                return None;
            }

            let value: f64 = result.value.1.parse().ok()?;
            Some(WorkloadSample {
                namespace,
                workload_name,
                workload_kind: result.metric.get("workload_kind").cloned(),
                pod_name: result.metric.get("pod").cloned(),
                health: value >= 1.0,
            })
        })
        .collect();

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response_with(results: Vec<serde_json::Value>) -> serde_json::Value {
        serde_json::json!({
            "status": "success",
            "data": { "resultType": "vector", "result": results }
        })
    }

    fn sample_result(namespace: &str, app: &str, kind: Option<&str>, pod: Option<&str>, value: &str) -> serde_json::Value {
        let mut metric = serde_json::json!({ "namespace": namespace, "app": app });
        if let Some(k) = kind {
            metric["workload_kind"] = serde_json::json!(k);
        }
        if let Some(p) = pod {
            metric["pod"] = serde_json::json!(p);
        }
        serde_json::json!({ "metric": metric, "value": [1700000000.0, value] })
    }

    #[test]
    fn parses_prometheus_response_shape() {
        let body = response_with(vec![sample_result("ns", "app", Some("Deployment"), Some("app-0"), "1")]);
        let parsed: PrometheusResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.status, "success");
        assert_eq!(parsed.data.result.len(), 1);
    }

    #[test]
    fn value_exactly_one_is_healthy_boundary() {
        assert!("1".parse::<f64>().unwrap() >= 1.0);
        assert!("0.999999".parse::<f64>().unwrap() < 1.0);
    }

    #[tokio::test]
    async fn query_parses_retains_and_drops_results() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let body = response_with(vec![
            sample_result("ns", "app", Some("Deployment"), Some("app-0"), "1"),
            sample_result("ns", "app", None, None, "0"),
            serde_json::json!({ "metric": { "app": "no-namespace" }, "value": [1700000000.0, "1"] }),
        ]);
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .and(query_param("query", QUERY))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let samples = query(&client, &server.uri(), &AuthConfig::None).await.unwrap();

        assert_eq!(samples.len(), 2);
        assert!(samples.iter().any(|s| s.health));
        assert!(samples.iter().any(|s| !s.health));
    }

    #[tokio::test]
    async fn query_returns_error_on_server_failure() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/query"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let result = query(&client, &server.uri(), &AuthConfig::None).await;
        assert!(result.is_err());
    }
}
