pub mod cache;
pub mod config;
mod dict;
pub mod error;
pub mod http;
mod load;
pub mod service;

pub use cache::{CachedDict, DictCache};
pub use config::{load_settings, DictSettings};
pub use dict::{
    Dict, DictData, DictOptions, DictReadyContext, DictUrl, DictUrlContext, LoadDictOpts,
    OnReadyFn,
};
pub use error::DictError;
pub use http::HttpDictRequest;
pub use load::dict;
pub use service::{
    DictDataSource, DictFetchContext, DictRequest, DictService, MissingDictRequest, NodesByValues,
};
