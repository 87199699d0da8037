use kube::runtime::finalizer::Error as FinalizerError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Kubernetes reported error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("finalizer error: {0}")]
    FinalizerError(#[source] Box<FinalizerError<Error>>),

    #[error("staged update run {0} has no stage {1}")]
    MissingStage(String, String),

    #[error("staged update run {0} not found")]
    MissingUpdateRun(String),

    #[error("invalid trace id")]
    InvalidTraceId,
}

impl Error {
    /// Low-cardinality label for metrics; never includes object identity.
    pub fn metric_label(&self) -> String {
        match self {
            Error::KubeError(_) => "kube".to_string(),
            Error::FinalizerError(_) => "finalizer".to_string(),
            Error::MissingStage(..) => "missing_stage".to_string(),
            Error::MissingUpdateRun(_) => "missing_update_run".to_string(),
            Error::InvalidTraceId => "invalid_trace_id".to_string(),
        }
    }
}
