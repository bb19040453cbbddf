use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::{cache::DictCache, Dict, LoadDictOpts};

/// Application-wide dictionary request used by dictionaries that only
/// declare a `url`.
#[async_trait]
pub trait DictRequest: Send + Sync {
    async fn request(&self, url: &str, dict: &Dict) -> Result<Value>;
}

pub struct MissingDictRequest;

#[async_trait]
impl DictRequest for MissingDictRequest {
    async fn request(&self, url: &str, _dict: &Dict) -> Result<Value> {
        warn!(
            url,
            "no dictionary request configured; build the DictService with a DictRequest"
        );
        Ok(Value::Array(Vec::new()))
    }
}

pub struct DictFetchContext<'a> {
    pub url: Option<&'a str>,
    pub dict: &'a Dict,
    pub opts: &'a LoadDictOpts,
}

/// Per-dictionary data source, preferred over the service request.
#[async_trait]
pub trait DictDataSource: Send + Sync {
    async fn get_data(&self, ctx: DictFetchContext<'_>) -> Result<Value>;
}

/// Resolves only the nodes for the given values. Used by prototype
/// dictionaries too large to load whole.
#[async_trait]
pub trait NodesByValues: Send + Sync {
    async fn get_nodes_by_values(&self, values: &Value, opts: &LoadDictOpts) -> Result<Value>;
}

/// Dependencies shared by the dictionaries of one application.
#[derive(Clone)]
pub struct DictService {
    request: Arc<dyn DictRequest>,
    cache: Arc<DictCache>,
}

impl DictService {
    pub fn new(request: Arc<dyn DictRequest>) -> Self {
        Self::with_cache(request, DictCache::global())
    }

    pub fn with_cache(request: Arc<dyn DictRequest>, cache: Arc<DictCache>) -> Self {
        Self { request, cache }
    }

    pub fn request(&self) -> &dyn DictRequest {
        self.request.as_ref()
    }

    pub fn cache(&self) -> &DictCache {
        &self.cache
    }
}

impl Default for DictService {
    fn default() -> Self {
        Self::new(Arc::new(MissingDictRequest))
    }
}
