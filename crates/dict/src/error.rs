use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictError {
    #[error("failed to load dictionary data: {0:#}")]
    Fetch(#[source] anyhow::Error),
}
