// aiops-cli/src/backends.rs
// ============================================================================
// Module: HTTP Backend Clients
// Description: Blocking reqwest-backed implementations of the cluster API,
//              log, metrics, deploy-history, and action-execution seams
//              `aiops-collectors`/`aiops-dispatch` are generic over.
// Purpose: Wire the backend-agnostic pipeline against real HTTP endpoints
//          read from `aiops-config::BackendsConfig`.
// Dependencies: aiops-core, aiops-collectors, aiops-dispatch, reqwest, url,
//               serde_json
// ============================================================================

//! ## Overview
//! Every trait here follows the same shape as
//! `decision-gate-providers::http::HttpProvider`: one blocking
//! [`reqwest::blocking::Client`], bounded by a request timeout, issuing a GET
//! or POST against an endpoint built from `aiops-config::BackendsConfig` and
//! decoding the JSON response straight into the typed evidence payload the
//! caller expects. There is no real cluster/metrics/log backend behind these
//! endpoints in this repository; a deployment points `BackendsConfig` at its
//! own service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use aiops_collectors::ClusterApiClient;
use aiops_collectors::DeployHistoryClient;
use aiops_collectors::LogBackendClient;
use aiops_collectors::MetricsBackendClient;
use aiops_core::ActionBackend;
use aiops_core::ClusterEventReason;
use aiops_core::CollectorError;
use aiops_core::DeployHistoryData;
use aiops_core::ExecutionResult;
use aiops_core::ExecutorError;
use aiops_core::HpaStateData;
use aiops_core::LogsPatternData;
use aiops_core::MetricName;
use aiops_core::MetricSampleData;
use aiops_core::NodeStateData;
use aiops_core::PodStateData;
use aiops_core::RemediationAction;
use aiops_core::TimeWindow;
use reqwest::blocking::Client;
use url::Url;

/// Request timeout applied to every backend call (§6 default: 10s).
const BACKEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the shared blocking client every backend wrapper in this module
/// uses.
///
/// # Errors
///
/// Returns a [`reqwest::Error`] if the client cannot be constructed.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder().timeout(BACKEND_TIMEOUT).user_agent("aiops-cli/0.1").build()
}

/// Joins `path` onto `base`, failing closed on a malformed base or path
/// rather than silently falling back to a bare string.
fn join_url(base: &str, path: &str) -> Result<Url, CollectorError> {
    let base = Url::parse(base).map_err(|err| CollectorError::Backend {
        collector: "http".to_owned(),
        message: format!("invalid backend endpoint {base:?}: {err}"),
    })?;
    base.join(path).map_err(|err| CollectorError::Backend {
        collector: "http".to_owned(),
        message: format!("invalid backend path {path:?}: {err}"),
    })
}

// ============================================================================
// SECTION: Cluster API Client
// ============================================================================

/// Cluster API client backed by a read-only HTTP facade over the cluster
/// (§6's `cluster_api_endpoint`).
pub struct HttpClusterApiClient {
    /// Shared blocking HTTP client.
    client: Client,
    /// Cluster API base URL.
    endpoint: String,
}

impl HttpClusterApiClient {
    /// Builds a client against `endpoint`.
    #[must_use]
    pub const fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, CollectorError> {
        let url = join_url(&self.endpoint, path)?;
        self.client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| CollectorError::Backend { collector: "cluster-api".to_owned(), message: err.to_string() })?
            .json()
            .map_err(|err| CollectorError::Backend { collector: "cluster-api".to_owned(), message: err.to_string() })
    }
}

impl ClusterApiClient for HttpClusterApiClient {
    fn list_pod_states(
        &self,
        namespace: &str,
        service: Option<&str>,
    ) -> Result<Vec<(String, PodStateData)>, CollectorError> {
        let service = service.unwrap_or_default();
        self.get_json(&format!("/api/v1/namespaces/{namespace}/pods?service={service}"))
    }

    fn list_node_states(&self, namespace: &str) -> Result<Vec<(String, NodeStateData)>, CollectorError> {
        self.get_json(&format!("/api/v1/namespaces/{namespace}/nodes"))
    }

    fn hpa_state(&self, namespace: &str, service: Option<&str>) -> Result<Option<HpaStateData>, CollectorError> {
        let service = service.unwrap_or_default();
        self.get_json(&format!("/api/v1/namespaces/{namespace}/hpa?service={service}"))
    }

    fn list_events(&self, namespace: &str) -> Result<Vec<ClusterEventReason>, CollectorError> {
        self.get_json(&format!("/api/v1/namespaces/{namespace}/events"))
    }
}

// ============================================================================
// SECTION: Log Backend Client
// ============================================================================

/// Log backend client (§6's `log_backend_endpoint`).
pub struct HttpLogBackendClient {
    /// Shared blocking HTTP client.
    client: Client,
    /// Log backend base URL.
    endpoint: String,
}

impl HttpLogBackendClient {
    /// Builds a client against `endpoint`.
    #[must_use]
    pub const fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl LogBackendClient for HttpLogBackendClient {
    fn query_patterns(
        &self,
        namespace: &str,
        service: Option<&str>,
        window: TimeWindow,
    ) -> Result<LogsPatternData, CollectorError> {
        let service = service.unwrap_or_default();
        let start = window.start.as_unix_millis().unwrap_or_default();
        let end = window.end.as_unix_millis().unwrap_or_default();
        let path = format!("/query?namespace={namespace}&service={service}&start={start}&end={end}");
        let url = join_url(&self.endpoint, &path)?;
        self.client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| CollectorError::Backend { collector: "logs".to_owned(), message: err.to_string() })?
            .json()
            .map_err(|err| CollectorError::Backend { collector: "logs".to_owned(), message: err.to_string() })
    }
}

// ============================================================================
// SECTION: Metrics Backend Client
// ============================================================================

/// Metrics backend client (§6's `metrics_backend_endpoint`).
pub struct HttpMetricsBackendClient {
    /// Shared blocking HTTP client.
    client: Client,
    /// Metrics backend base URL.
    endpoint: String,
}

impl HttpMetricsBackendClient {
    /// Builds a client against `endpoint`.
    #[must_use]
    pub const fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl MetricsBackendClient for HttpMetricsBackendClient {
    fn sample(
        &self,
        namespace: &str,
        service: Option<&str>,
        metric: MetricName,
        window: TimeWindow,
    ) -> Result<MetricSampleData, CollectorError> {
        let service = service.unwrap_or_default();
        let start = window.start.as_unix_millis().unwrap_or_default();
        let end = window.end.as_unix_millis().unwrap_or_default();
        let path =
            format!("/query?namespace={namespace}&service={service}&metric={metric:?}&start={start}&end={end}");
        let url = join_url(&self.endpoint, &path)?;
        self.client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| CollectorError::Backend { collector: "metrics".to_owned(), message: err.to_string() })?
            .json()
            .map_err(|err| CollectorError::Backend { collector: "metrics".to_owned(), message: err.to_string() })
    }
}

// ============================================================================
// SECTION: Deploy History Client
// ============================================================================

/// Deploy-history client. `BackendsConfig` carries no endpoint of its own
/// for this; it reuses `cluster_api_endpoint`, the same facade the cluster
/// state collector queries (§6).
pub struct HttpDeployHistoryClient {
    /// Shared blocking HTTP client.
    client: Client,
    /// Cluster API base URL, reused for rollout history.
    endpoint: String,
}

impl HttpDeployHistoryClient {
    /// Builds a client against `endpoint`.
    #[must_use]
    pub const fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl DeployHistoryClient for HttpDeployHistoryClient {
    fn deploy_history(
        &self,
        namespace: &str,
        service: &str,
        lookback_ms: u64,
    ) -> Result<DeployHistoryData, CollectorError> {
        let path = format!("/api/v1/namespaces/{namespace}/services/{service}/deploy-history?lookback_ms={lookback_ms}");
        let url = join_url(&self.endpoint, &path)?;
        self.client
            .get(url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|err| CollectorError::Backend { collector: "deploy-diff".to_owned(), message: err.to_string() })?
            .json()
            .map_err(|err| CollectorError::Backend { collector: "deploy-diff".to_owned(), message: err.to_string() })
    }
}

// ============================================================================
// SECTION: Action Backend
// ============================================================================

/// The `k8s` scheme action backend: executes a remediation action against
/// the cluster API facade (§4.5, §6).
pub struct K8sActionBackend {
    /// Shared blocking HTTP client.
    client: Client,
    /// Cluster API base URL.
    endpoint: String,
}

impl K8sActionBackend {
    /// Builds a backend against `endpoint`.
    #[must_use]
    pub const fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

impl ActionBackend for K8sActionBackend {
    fn scheme(&self) -> &str {
        "k8s"
    }

    fn execute(&self, action: &RemediationAction) -> Result<ExecutionResult, ExecutorError> {
        let path = format!("/api/v1/namespaces/{}/actions", action.target_namespace);
        let url = join_url(&self.endpoint, &path).map_err(|err| ExecutorError::Transient(err.to_string()))?;
        let response = self
            .client
            .post(url)
            .json(action)
            .send()
            .map_err(|err| ExecutorError::Transient(err.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                let detail = response.text().unwrap_or_default();
                Ok(ExecutionResult::Succeeded { detail })
            }
            reqwest::StatusCode::NOT_FOUND => Err(ExecutorError::NotFound(action.target_resource.clone())),
            reqwest::StatusCode::FORBIDDEN => Err(ExecutorError::Forbidden(action.target_resource.clone())),
            status if status.is_server_error() => {
                Err(ExecutorError::Transient(format!("backend returned {status}")))
            }
            status => Err(ExecutorError::Transient(format!("unexpected backend status {status}"))),
        }
    }
}
