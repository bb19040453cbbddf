use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrudError {
    #[error("{0} is not configured")]
    MissingRequest(&'static str),
    #[error("row index {index} is out of range for {len} rows")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("row context has no index")]
    MissingRowIndex,
    #[error("no editable row at index {0}")]
    EditableRowNotFound(usize),
    #[error("{operation} failed: {source:#}")]
    Request {
        operation: &'static str,
        source: anyhow::Error,
    },
    #[error("{hook} hook failed: {source:#}")]
    Hook {
        hook: &'static str,
        source: anyhow::Error,
    },
    #[error("failed to encode page query: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CrudError {
    pub fn request(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Request { operation, source }
    }

    pub fn hook(hook: &'static str, source: anyhow::Error) -> Self {
        Self::Hook { hook, source }
    }
}
