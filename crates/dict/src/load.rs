//! Dictionary loading: the per-instance Idle/Loading/Ready machine and the
//! cache-coordinated remote fetch.
//!
//! At most one remote fetch runs per dictionary instance, and at most one per
//! cache key across instances. Late callers queue a oneshot waiter and are
//! released in registration order with the data the single fetch produced.

use std::{mem, sync::Arc};

use anyhow::Result;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::{
    cache::{CachedDict, DictCache, RemoteRecord},
    dict::{map_key, Transient},
    service::{DictDataSource, DictFetchContext, NodesByValues},
    Dict, DictData, DictError, DictOptions, DictReadyContext, DictService, DictUrl,
    DictUrlContext, LoadDictOpts,
};

/// Creates a shared dictionary and, unless it is a prototype or not
/// `immediate`, starts loading it on the current tokio runtime.
pub fn dict(options: DictOptions, service: DictService) -> Arc<Dict> {
    let dict = Arc::new(Dict::new(options, service));
    if dict.options.prototype || !dict.options.immediate {
        return dict;
    }
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            let loading = Arc::clone(&dict);
            handle.spawn(async move {
                if let Err(err) = loading.load_dict(LoadDictOpts::default()).await {
                    warn!(error = %err, "immediate dictionary load failed");
                }
            });
        }
        Err(_) => {
            warn!("no tokio runtime available; dictionary will load on first use");
        }
    }
    dict
}

enum RemoteSource<'a> {
    DataSource(&'a dyn DictDataSource),
    Request(&'a str),
}

enum RemoteStep {
    Fetch(Arc<Mutex<RemoteRecord>>),
    Ready(Option<Value>),
    Wait(oneshot::Receiver<Option<Value>>),
}

/// Holds the instance in `Loading`; dropping it without `complete` releases
/// the state and discards queued waiters.
struct LoadingGuard<'a> {
    transient: &'a Mutex<Transient>,
    completed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(transient: &'a Mutex<Transient>) -> Self {
        Self {
            transient,
            completed: false,
        }
    }

    fn complete(mut self) -> Vec<oneshot::Sender<Option<DictData>>> {
        self.completed = true;
        let mut transient = self.transient.lock();
        transient.loading = false;
        mem::take(&mut transient.notifies)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut transient = self.transient.lock();
        transient.loading = false;
        transient.notifies.clear();
    }
}

/// Same contract as [`LoadingGuard`] for a cache coordination record.
struct RecordGuard {
    record: Arc<Mutex<RemoteRecord>>,
    completed: bool,
}

impl RecordGuard {
    fn complete(mut self, data: &Value) {
        self.completed = true;
        let callbacks = {
            let mut record = self.record.lock();
            record.data = Some(data.clone());
            record.loaded = true;
            record.loading = false;
            mem::take(&mut record.callback)
        };
        for callback in callbacks {
            let _ = callback.send(Some(data.clone()));
        }
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        let mut record = self.record.lock();
        record.loading = false;
        record.loaded = false;
        record.callback.clear();
    }
}

impl Dict {
    pub async fn load_dict(&self, opts: LoadDictOpts) -> Result<Option<DictData>, DictError> {
        if !opts.reload {
            if let Some(data) = self.data() {
                return Ok(Some(data));
            }
        }

        let remote = self.options.get_nodes_by_values.is_none() && self.original_data.is_none();
        let waiter = {
            let mut transient = self.transient.lock();
            if transient.loading {
                let (tx, rx) = oneshot::channel();
                transient.notifies.push(tx);
                Some(rx)
            } else {
                transient.loading = remote;
                None
            }
        };
        if let Some(rx) = waiter {
            debug!("dictionary is loading; waiting for the in-flight load");
            return Ok(rx.await.unwrap_or_else(|_| self.data()));
        }

        let mut loading = None;
        let data = if let Some(source) = &self.options.get_nodes_by_values {
            if !self.options.prototype {
                warn!("get_nodes_by_values is configured but the dictionary is not a prototype; set prototype = true");
                return Ok(Some(Arc::new(Vec::new())));
            }
            self.load_nodes_by_values(source.as_ref(), &opts).await?
        } else if let Some(original) = &self.original_data {
            Some(Arc::clone(original))
        } else {
            loading = Some(LoadingGuard::new(&self.transient));
            self.get_remote_dict_data(&opts).await?.and_then(into_dict_data)
        };

        self.set_data(data.clone());
        if let Some(on_ready) = &self.options.on_ready {
            on_ready(&DictReadyContext {
                dict: self,
                opts: &opts,
            });
        }

        let waiters = match loading {
            Some(guard) => guard.complete(),
            None => mem::take(&mut self.transient.lock().notifies),
        };
        for waiter in waiters {
            let _ = waiter.send(data.clone());
        }
        Ok(data)
    }

    pub async fn reload_dict(&self, opts: LoadDictOpts) -> Result<Option<DictData>, DictError> {
        self.load_dict(LoadDictOpts {
            reload: true,
            ..opts
        })
        .await
    }

    /// Fetches the remote items, coordinating through the dictionary cache
    /// when `cache` is enabled.
    ///
    /// With caching, a failed fetch is logged and yields `Ok(None)` for the
    /// caller and every queued waiter; the cache record is reset so that the
    /// next call fetches again. Without caching, fetch errors propagate.
    pub async fn get_remote_dict_data(
        &self,
        opts: &LoadDictOpts,
    ) -> Result<Option<Value>, DictError> {
        let url = self.resolve_url(opts);
        let source = match (&self.options.get_data, url.as_deref()) {
            (Some(source), _) => RemoteSource::DataSource(source.as_ref()),
            (None, Some(url)) => RemoteSource::Request(url),
            (None, None) => return Ok(Some(Value::Array(Vec::new()))),
        };

        let cache_key = url.as_deref().filter(|_| self.options.cache);
        let Some(cache_key) = cache_key else {
            return self
                .fetch_remote(&source, url.as_deref(), opts)
                .await
                .map(Some)
                .map_err(DictError::Fetch);
        };

        match remote_step(self.service.cache(), cache_key) {
            RemoteStep::Ready(data) => Ok(data),
            RemoteStep::Wait(rx) => {
                debug!(cache_key, "dictionary fetch in flight; waiting on cache record");
                Ok(rx.await.unwrap_or(None))
            }
            RemoteStep::Fetch(record) => {
                let guard = RecordGuard {
                    record,
                    completed: false,
                };
                match self.fetch_remote(&source, url.as_deref(), opts).await {
                    Ok(data) => {
                        guard.complete(&data);
                        Ok(Some(data))
                    }
                    Err(err) => {
                        drop(guard);
                        error!(cache_key, error = %err, "load dict error");
                        Ok(None)
                    }
                }
            }
        }
    }

    async fn load_nodes_by_values(
        &self,
        source: &dyn NodesByValues,
        opts: &LoadDictOpts,
    ) -> Result<Option<DictData>, DictError> {
        let Some(value) = opts.value.as_ref().filter(|value| is_truthy(value)) else {
            return Ok(None);
        };

        let cache_key = if self.options.cache {
            self.resolve_url(opts)
                .map(|url| format!("{url}{}", map_key(value)))
        } else {
            None
        };
        if let Some(key) = cache_key.as_deref() {
            if let Some(CachedDict::Nodes(nodes)) = self.service.cache().get(key) {
                debug!(cache_key = key, "dictionary nodes served from cache");
                return Ok(into_dict_data(nodes));
            }
        }

        let nodes = source
            .get_nodes_by_values(value, opts)
            .await
            .map_err(DictError::Fetch)?;
        if let Some(key) = cache_key {
            self.service
                .cache()
                .set(key, CachedDict::Nodes(nodes.clone()));
        }
        Ok(into_dict_data(nodes))
    }

    async fn fetch_remote(
        &self,
        source: &RemoteSource<'_>,
        url: Option<&str>,
        opts: &LoadDictOpts,
    ) -> Result<Value> {
        let data = match source {
            RemoteSource::DataSource(source) => {
                source
                    .get_data(DictFetchContext {
                        url,
                        dict: self,
                        opts,
                    })
                    .await?
            }
            RemoteSource::Request(url) => self.service.request().request(url, self).await?,
        };
        if !data.is_array() {
            warn!(data = %data, "dictionary data has an unexpected format, expected a list");
        }
        Ok(data)
    }

    fn resolve_url(&self, opts: &LoadDictOpts) -> Option<String> {
        let url = match self.options.url.as_ref()? {
            DictUrl::Static(url) => url.clone(),
            DictUrl::Dynamic(resolve) => resolve(&DictUrlContext { dict: self, opts }),
        };
        (!url.is_empty()).then_some(url)
    }
}

fn remote_step(cache: &DictCache, key: &str) -> RemoteStep {
    let started = || Arc::new(Mutex::new(RemoteRecord::started()));
    let (entry, created) =
        cache.get_or_insert_with(key, || CachedDict::Remote(started()));
    let record = match entry {
        CachedDict::Remote(record) => record,
        CachedDict::Nodes(_) => {
            let record = started();
            cache.set(key, CachedDict::Remote(Arc::clone(&record)));
            return RemoteStep::Fetch(record);
        }
    };
    if created {
        return RemoteStep::Fetch(record);
    }

    let mut state = record.lock();
    if state.loaded {
        return RemoteStep::Ready(state.data.clone());
    }
    if state.loading {
        let (tx, rx) = oneshot::channel();
        state.callback.push(tx);
        return RemoteStep::Wait(rx);
    }
    // A previous fetch failed; retry through the same record.
    state.loading = true;
    drop(state);
    RemoteStep::Fetch(record)
}

fn into_dict_data(value: Value) -> Option<DictData> {
    match value {
        Value::Array(items) => Some(Arc::new(items)),
        _ => None,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "tests/load_tests.rs"]
mod tests;
