//! Bound page state shared between the control surface and the UI layer.

use std::{fmt, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use shared::{
    domain::{CrudMode, FormMode, Pagination, Row, SortState},
    protocol::{AddRequest, EditRequest, InfoRequest, PageQuery, RowContext},
};

use crate::columns::ColumnDef;

/// Backend operations of one CRUD page.
#[async_trait]
pub trait CrudRequest: Send + Sync {
    /// Receives the (possibly transformed) page query and returns the raw
    /// page response, `{ records, total, currentPage?, pageSize? }` after
    /// `transform_res`.
    async fn page_request(&self, query: Value) -> Result<Value>;
    /// Returns the stored record.
    async fn add_request(&self, req: AddRequest) -> Result<Value>;
    async fn edit_request(&self, req: EditRequest) -> Result<Value>;
    async fn del_request(&self, ctx: RowContext) -> Result<Value>;
    /// Loads the full row before a dialog opens. `None` keeps the table row.
    async fn info_request(&self, _req: InfoRequest) -> Result<Option<Row>> {
        Ok(None)
    }
}

pub struct TransformResContext {
    pub res: Value,
    pub query: Value,
}

pub type TransformQuery = Arc<dyn Fn(PageQuery) -> Value + Send + Sync>;
pub type TransformRes = Arc<dyn Fn(TransformResContext) -> Value + Send + Sync>;
pub type RefreshedHook = Arc<dyn Fn(&[Row]) + Send + Sync>;
pub type RowHook = Arc<dyn Fn(RowContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;
pub type RemovedHook = Arc<dyn Fn(RemovedContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RemovedContext {
    pub context: RowContext,
    /// `del_request` result; `None` in local mode.
    pub res: Option<Value>,
}

#[derive(Clone, Default)]
pub struct RequestBinding {
    /// Without an api, refreshes are silently skipped.
    pub api: Option<Arc<dyn CrudRequest>>,
    pub transform_query: Option<TransformQuery>,
    pub transform_res: Option<TransformRes>,
}

#[derive(Clone, Default)]
pub struct RemoveOptions {
    pub confirm_title: Option<String>,
    pub confirm_message: Option<String>,
    /// Replaces the UI confirm dialog; an error cancels the removal.
    pub confirm_fn: Option<RowHook>,
    pub on_canceled: Option<RowHook>,
    pub on_removed: Option<RemovedHook>,
    /// Defaults to true when unset.
    pub show_success_notification: Option<bool>,
    /// Defaults to true when unset.
    pub refresh_table: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditableMode {
    #[default]
    Cell,
    Row,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditableOptions {
    pub enabled: bool,
    pub mode: EditableMode,
    pub extra: Row,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowHandleActive {
    #[default]
    Default,
    EditRow,
    Editable,
}

#[derive(Clone, Default)]
pub struct TableBinding {
    pub loading: bool,
    /// Overrides per-call remove options when set.
    pub remove: Option<RemoveOptions>,
    pub on_refreshed: Option<RefreshedHook>,
    pub editable: EditableOptions,
}

#[derive(Clone, Default)]
pub struct SearchBinding {
    pub form: Row,
    pub columns: Vec<ColumnDef>,
}

#[derive(Clone, Default)]
pub struct CrudBinding {
    pub data: Vec<Row>,
    pub pagination: Option<Pagination>,
    pub table: TableBinding,
    pub sort: SortState,
    pub mode: CrudMode,
    pub search: SearchBinding,
    pub columns: Vec<ColumnDef>,
    pub request: RequestBinding,
    pub row_handle: RowHandleActive,
    pub add_form: Row,
    pub edit_form: Row,
    pub view_form: Row,
}

impl CrudBinding {
    pub fn with_api(api: Arc<dyn CrudRequest>) -> Self {
        Self {
            pagination: Some(Pagination::default()),
            request: RequestBinding {
                api: Some(api),
                ..RequestBinding::default()
            },
            ..Self::default()
        }
    }

    pub fn form_options(&self, mode: FormMode) -> &Row {
        match mode {
            FormMode::Add => &self.add_form,
            FormMode::Edit => &self.edit_form,
            FormMode::View => &self.view_form,
        }
    }
}

impl fmt::Debug for CrudBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudBinding")
            .field("rows", &self.data.len())
            .field("pagination", &self.pagination)
            .field("loading", &self.table.loading)
            .field("sort", &self.sort)
            .field("mode", &self.mode)
            .field("has_api", &self.request.api.is_some())
            .finish_non_exhaustive()
    }
}
