use thiserror::Error;

/// Custom error types for the query engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsafe query rejected: {0}")]
    UnsafeQuery(String),
    #[error("SQL generation failed: {0}")]
    Generation(String),
    #[error("SQL execution failed: {message}")]
    Execution { sql: String, message: String },
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to AI provider: {0}")]
    AiRequest(reqwest::Error),
    #[error("Failed to deserialize AI provider response: {0}")]
    AiDeserialization(reqwest::Error),
    #[error("AI provider returned an error: {0}")]
    AiApi(String),
    #[error("AI provider is missing or misconfigured: {0}")]
    MissingAiProvider(String),
    #[error("Failed to connect to storage: {0}")]
    StorageConnection(String),
    #[error("Storage operation failed: {0}")]
    StorageOperationFailed(String),
    #[error("Query cache persistence failed: {0}")]
    CachePersistence(String),
    #[error("Training data could not be loaded: {0}")]
    Training(String),
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<turso::Error> for EngineError {
    fn from(err: turso::Error) -> Self {
        EngineError::StorageOperationFailed(err.to_string())
    }
}
