use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

use crate::service::{DictDataSource, DictService, NodesByValues};

/// Loaded dictionary items. Shared so that every waiter of one load observes
/// the very same list.
pub type DictData = Arc<Vec<Value>>;

pub type DictUrlFn = Arc<dyn Fn(&DictUrlContext<'_>) -> String + Send + Sync>;
pub type OnReadyFn = Arc<dyn Fn(&DictReadyContext<'_>) + Send + Sync>;

pub struct DictUrlContext<'a> {
    pub dict: &'a Dict,
    pub opts: &'a LoadDictOpts,
}

pub struct DictReadyContext<'a> {
    pub dict: &'a Dict,
    pub opts: &'a LoadDictOpts,
}

#[derive(Clone)]
pub enum DictUrl {
    Static(String),
    /// Resolved per load, e.g. from the row a prototype dictionary is used in.
    Dynamic(DictUrlFn),
}

impl DictUrl {
    pub fn dynamic(f: impl Fn(&DictUrlContext<'_>) -> String + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }
}

impl From<&str> for DictUrl {
    fn from(value: &str) -> Self {
        Self::Static(value.to_string())
    }
}

impl From<String> for DictUrl {
    fn from(value: String) -> Self {
        Self::Static(value)
    }
}

impl fmt::Debug for DictUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictUrl::Static(url) => f.debug_tuple("Static").field(url).finish(),
            DictUrl::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Options passed to a single `load_dict` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadDictOpts {
    pub reload: bool,
    /// Value(s) to resolve through `get_nodes_by_values`.
    pub value: Option<Value>,
    /// Caller context (row, form, scope...) forwarded to url functions and data sources.
    pub extra: Map<String, Value>,
}

impl LoadDictOpts {
    pub fn reload() -> Self {
        Self {
            reload: true,
            ..Self::default()
        }
    }

    pub fn for_value(value: impl Into<Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone)]
pub struct DictOptions {
    pub url: Option<DictUrl>,
    pub get_data: Option<Arc<dyn DictDataSource>>,
    pub value: String,
    pub label: String,
    pub children: String,
    pub color: String,
    pub is_tree: bool,
    /// Share remote results process-wide through the dictionary cache.
    pub cache: bool,
    /// Cloned per usage site instead of shared.
    pub prototype: bool,
    /// Load as soon as the dictionary is created with [`crate::dict`].
    pub immediate: bool,
    pub get_nodes_by_values: Option<Arc<dyn NodesByValues>>,
    pub on_ready: Option<OnReadyFn>,
    pub custom: Value,
    /// Local items; no remote request is made.
    pub data: Option<Vec<Value>>,
}

impl DictOptions {
    pub fn with_url(url: impl Into<DictUrl>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_data(data: Vec<Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }
}

impl Default for DictOptions {
    fn default() -> Self {
        Self {
            url: None,
            get_data: None,
            value: "value".into(),
            label: "label".into(),
            children: "children".into(),
            color: "color".into(),
            is_tree: false,
            cache: false,
            prototype: false,
            immediate: true,
            get_nodes_by_values: None,
            on_ready: None,
            custom: Value::Object(Map::new()),
            data: None,
        }
    }
}

impl fmt::Debug for DictOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictOptions")
            .field("url", &self.url)
            .field("get_data", &self.get_data.is_some())
            .field("value", &self.value)
            .field("label", &self.label)
            .field("children", &self.children)
            .field("color", &self.color)
            .field("is_tree", &self.is_tree)
            .field("cache", &self.cache)
            .field("prototype", &self.prototype)
            .field("immediate", &self.immediate)
            .field("get_nodes_by_values", &self.get_nodes_by_values.is_some())
            .field("custom", &self.custom)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Default)]
pub(crate) struct DictState {
    pub(crate) data: Option<DictData>,
    pub(crate) data_map: HashMap<String, Value>,
}

/// In-flight load bookkeeping. Never copied by [`Dict::instantiate`].
#[derive(Default)]
pub(crate) struct Transient {
    pub(crate) loading: bool,
    pub(crate) notifies: Vec<oneshot::Sender<Option<DictData>>>,
}

pub struct Dict {
    pub(crate) options: DictOptions,
    pub(crate) original_data: Option<DictData>,
    pub(crate) state: RwLock<DictState>,
    pub(crate) transient: Mutex<Transient>,
    pub(crate) service: DictService,
}

impl Dict {
    pub fn new(mut options: DictOptions, service: DictService) -> Self {
        let original_data = options.data.take().map(Arc::new);
        let dict = Self {
            options,
            original_data: original_data.clone(),
            state: RwLock::new(DictState::default()),
            transient: Mutex::new(Transient::default()),
            service,
        };
        if original_data.is_some() {
            dict.set_data(original_data);
        }
        dict
    }

    pub fn options(&self) -> &DictOptions {
        &self.options
    }

    pub fn service(&self) -> &DictService {
        &self.service
    }

    pub fn custom(&self) -> &Value {
        &self.options.custom
    }

    pub fn is_loading(&self) -> bool {
        self.transient.lock().loading
    }

    /// Whether the dictionary depends on its usage context and must be
    /// instantiated per usage site.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.options.url, Some(DictUrl::Dynamic(_)))
            || self.options.get_data.is_some()
            || self.options.prototype
    }

    /// Per-usage-site copy of a prototype dictionary. Loading state, pending
    /// waiters and static data stay with the original.
    pub fn instantiate(&self) -> Dict {
        Dict {
            options: self.options.clone(),
            original_data: None,
            state: RwLock::new(self.state.read().clone()),
            transient: Mutex::new(Transient::default()),
            service: self.service.clone(),
        }
    }

    pub fn data(&self) -> Option<DictData> {
        self.state.read().data.clone()
    }

    pub fn data_map(&self) -> HashMap<String, Value> {
        self.state.read().data_map.clone()
    }

    /// Replaces the items and rebuilds the value index in one step.
    pub fn set_data(&self, data: Option<DictData>) {
        let mut data_map = HashMap::new();
        if let Some(items) = &data {
            self.build_map(&mut data_map, items);
        }
        let mut state = self.state.write();
        state.data = data;
        state.data_map = data_map;
    }

    /// Rebuilds the value index from the current items.
    pub fn to_map(&self) {
        let data = self.data();
        self.set_data(data);
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        state.data = None;
        state.data_map = HashMap::new();
    }

    fn build_map(&self, map: &mut HashMap<String, Value>, list: &[Value]) {
        for item in list {
            if let Some(value) = self.get_value(item) {
                map.insert(map_key(value), item.clone());
            }
            if !self.options.is_tree {
                continue;
            }
            if let Some(Value::Array(children)) = self.get_children(item) {
                if !children.is_empty() {
                    self.build_map(map, children);
                }
            }
        }
    }

    pub fn get_value<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        item.get(&self.options.value)
    }

    pub fn get_label<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        item.get(&self.options.label)
    }

    pub fn get_children<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        item.get(&self.options.children)
    }

    pub fn get_color<'a>(&self, item: &'a Value) -> Option<&'a Value> {
        item.get(&self.options.color)
    }

    pub fn get_node_by_value(&self, value: &Value) -> Option<Value> {
        self.state.read().data_map.get(&map_key(value)).cloned()
    }

    /// One node per requested value, in request order. Values missing from
    /// the index come back as `{ <value field>: value }`.
    pub fn get_nodes_from_data_map(&self, value: &Value) -> Vec<Value> {
        let values: Vec<&Value> = match value {
            Value::Null => return Vec::new(),
            Value::Array(values) => values.iter().collect(),
            single => vec![single],
        };
        let state = self.state.read();
        values
            .into_iter()
            .map(|value| match state.data_map.get(&map_key(value)) {
                Some(node) => node.clone(),
                None => {
                    let mut placeholder = Map::new();
                    placeholder.insert(self.options.value.clone(), (*value).clone());
                    Value::Object(placeholder)
                }
            })
            .collect()
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dict")
            .field("options", &self.options)
            .field("items", &self.data().map(|data| data.len()))
            .field("loading", &self.is_loading())
            .finish()
    }
}

/// Index key of a dictionary value. Strings key as themselves so that `1`
/// and `"1"` resolve to the same node.
pub(crate) fn map_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(values) => values.iter().map(map_key).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/dict_tests.rs"]
mod tests;
