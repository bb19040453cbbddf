use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::{config::DictSettings, service::DictRequest, Dict};

/// Dictionary request that GETs the dictionary url relative to a base url
/// and parses the body as JSON.
pub struct HttpDictRequest {
    http: Client,
    base_url: Url,
}

impl HttpDictRequest {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("invalid dictionary base url '{base_url}'"))?;
        Ok(Self {
            http: Client::new(),
            base_url,
        })
    }

    pub fn from_settings(settings: &DictSettings) -> Result<Option<Self>> {
        settings
            .request_base_url
            .as_deref()
            .map(Self::new)
            .transpose()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl DictRequest for HttpDictRequest {
    async fn request(&self, url: &str, _dict: &Dict) -> Result<Value> {
        let target = self
            .base_url
            .join(url)
            .with_context(|| format!("invalid dictionary url '{url}'"))?;
        debug!(url = %target, "requesting dictionary");
        let res = self
            .http
            .get(target.clone())
            .send()
            .await
            .with_context(|| format!("dictionary request to {target} failed"))?
            .error_for_status()?;
        let body: Value = res.json().await?;
        Ok(body)
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
