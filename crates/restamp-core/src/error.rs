#[derive(Debug, thiserror::Error)]
pub enum RestampError {
    #[error("not a valid PDF document: {0}")]
    DocumentFormat(String),

    #[error("no documents were processed")]
    NoDocumentsProcessed,

    #[error("unknown job: {0}")]
    JobNotFound(String),

    #[error("job {0} has no result yet (state: {1})")]
    ResultNotReady(String, String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("failed to serialize document: {0}")]
    Serialize(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
