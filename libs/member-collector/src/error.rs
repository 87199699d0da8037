pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes reported error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("metrics query failed: {0}")]
    QueryFailed(String),

    #[error("invalid MetricReport response: {0}")]
    InvalidReport(String),

    #[error("invalid trace id")]
    InvalidTraceId,
}

impl Error {
    pub fn metric_label(&self) -> String {
        match self {
            Error::KubeError(_) => "kube".to_string(),
            Error::QueryFailed(_) => "query_failed".to_string(),
            Error::InvalidReport(_) => "invalid_report".to_string(),
            Error::InvalidTraceId => "invalid_trace_id".to_string(),
        }
    }
}
