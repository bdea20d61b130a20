use thiserror::Error;

/// Result type for normalization operations.
pub type Result<T> = std::result::Result<T, NormalizeError>;

/// Errors surfaced by the normalization pipeline.
///
/// Unresolved references and unloadable mapping targets are soft conditions
/// and never appear here; the original value is left in place instead.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document contains a cycle that cannot be serialized")]
    CyclicDocument,
}
