use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared::{
    domain::Row,
    protocol::{AddRequest, EditRequest, InfoRequest, RowContext},
};

use crate::{
    binding::{CrudBinding, CrudRequest},
    editable::{EditableRow, EditableTable},
    expose::CrudExpose,
    ui::{ConfirmOptions, DefaultMessages, DialogOptions, FormWrapper, UiAdapter},
};

pub(crate) fn row(value: Value) -> Row {
    value.as_object().cloned().expect("object row")
}

pub(crate) fn users_page() -> Value {
    json!({
        "records": [{"id": 1, "name": "Ann"}, {"id": 2, "name": "Bob"}],
        "total": 12,
        "currentPage": 1,
        "pageSize": 2
    })
}

pub(crate) struct RecordingApi {
    pub page_response: Mutex<Result<Value, String>>,
    pub add_response: Value,
    pub info_response: Option<Row>,
    pub fail_del: bool,
    pub page_queries: Arc<Mutex<Vec<Value>>>,
    pub added: Arc<Mutex<Vec<AddRequest>>>,
    pub edited: Arc<Mutex<Vec<EditRequest>>>,
    pub deleted: Arc<Mutex<Vec<RowContext>>>,
    pub info_calls: Arc<Mutex<Vec<InfoRequest>>>,
}

impl RecordingApi {
    pub(crate) fn returning(page: Value) -> Self {
        Self {
            page_response: Mutex::new(Ok(page)),
            add_response: json!({"id": 100}),
            info_response: None,
            fail_del: false,
            page_queries: Arc::new(Mutex::new(Vec::new())),
            added: Arc::new(Mutex::new(Vec::new())),
            edited: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            info_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing(err: impl Into<String>) -> Self {
        let api = Self::returning(Value::Null);
        *api.page_response.lock() = Err(err.into());
        api
    }

    pub(crate) fn page_calls(&self) -> usize {
        self.page_queries.lock().len()
    }
}

#[async_trait]
impl CrudRequest for RecordingApi {
    async fn page_request(&self, query: Value) -> Result<Value> {
        self.page_queries.lock().push(query);
        self.page_response.lock().clone().map_err(|err| anyhow!(err))
    }

    async fn add_request(&self, req: AddRequest) -> Result<Value> {
        self.added.lock().push(req);
        Ok(self.add_response.clone())
    }

    async fn edit_request(&self, req: EditRequest) -> Result<Value> {
        self.edited.lock().push(req);
        Ok(Value::Null)
    }

    async fn del_request(&self, ctx: RowContext) -> Result<Value> {
        if self.fail_del {
            return Err(anyhow!("delete rejected"));
        }
        self.deleted.lock().push(ctx);
        Ok(json!({"deleted": true}))
    }

    async fn info_request(&self, req: InfoRequest) -> Result<Option<Row>> {
        self.info_calls.lock().push(req);
        Ok(self.info_response.clone())
    }
}

#[derive(Default)]
pub(crate) struct RecordingUi {
    pub decline: bool,
    pub confirms: Arc<Mutex<Vec<ConfirmOptions>>>,
    pub notifications: Arc<Mutex<Vec<String>>>,
}

impl RecordingUi {
    pub(crate) fn declining() -> Self {
        Self {
            decline: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl UiAdapter for RecordingUi {
    async fn confirm(&self, options: ConfirmOptions) -> Result<()> {
        self.confirms.lock().push(options);
        if self.decline {
            return Err(anyhow!("cancel"));
        }
        Ok(())
    }

    fn notify_success(&self, message: &str) {
        self.notifications.lock().push(message.to_string());
    }
}

#[derive(Default)]
pub(crate) struct RecordingFormWrapper {
    pub opened: Arc<Mutex<Vec<DialogOptions>>>,
}

#[async_trait]
impl FormWrapper for RecordingFormWrapper {
    async fn open(&self, options: DialogOptions) -> Result<()> {
        self.opened.lock().push(options);
        Ok(())
    }
}

pub(crate) struct TestRow {
    pub add: bool,
    pub data: Mutex<Row>,
    pub changed: Row,
    pub loading: Mutex<bool>,
    pub loading_history: Mutex<Vec<bool>>,
    pub inactive_calls: Mutex<u32>,
}

impl TestRow {
    pub(crate) fn new(add: bool, data: Value, changed: Value) -> Arc<Self> {
        Arc::new(Self {
            add,
            data: Mutex::new(row(data)),
            changed: row(changed),
            loading: Mutex::new(false),
            loading_history: Mutex::new(Vec::new()),
            inactive_calls: Mutex::new(0),
        })
    }
}

impl EditableRow for TestRow {
    fn is_add(&self) -> bool {
        self.add
    }

    fn is_loading(&self) -> bool {
        *self.loading.lock()
    }

    fn set_loading(&self, loading: bool) {
        *self.loading.lock() = loading;
        self.loading_history.lock().push(loading);
    }

    fn row_data(&self) -> Row {
        self.data.lock().clone()
    }

    fn changed(&self) -> Row {
        self.changed.clone()
    }

    fn set_data(&self, data: Row) {
        *self.data.lock() = data;
    }

    fn inactive(&self) {
        *self.inactive_calls.lock() += 1;
    }
}

#[derive(Default)]
pub(crate) struct TestTable {
    pub rows: Mutex<Vec<Arc<TestRow>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl TestTable {
    pub(crate) fn with_rows(rows: Vec<Arc<TestRow>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl EditableTable for TestTable {
    fn editable_row(&self, index: usize) -> Option<Arc<dyn EditableRow>> {
        self.rows
            .lock()
            .get(index)
            .map(|row| Arc::clone(row) as Arc<dyn EditableRow>)
    }

    fn active(&self) {
        self.calls.lock().push("active".into());
    }

    fn inactive(&self) {
        self.calls.lock().push("inactive".into());
    }

    fn resume(&self) {
        self.calls.lock().push("resume".into());
    }

    fn add_row(&self, _opts: Row) {
        self.calls.lock().push("add_row".into());
    }

    fn edit_col(&self, _opts: Row) {
        self.calls.lock().push("edit_col".into());
    }

    fn remove_row(&self, index: usize) {
        self.calls.lock().push(format!("remove_row:{index}"));
        let mut rows = self.rows.lock();
        if index < rows.len() {
            rows.remove(index);
        }
    }
}

pub(crate) struct Harness {
    pub expose: Arc<CrudExpose>,
    pub api: Arc<RecordingApi>,
    pub ui: Arc<RecordingUi>,
    pub table: Arc<TestTable>,
    pub forms: Arc<RecordingFormWrapper>,
}

impl Harness {
    pub(crate) fn new(api: RecordingApi, ui: RecordingUi, table: TestTable) -> Self {
        Self::with_binding(api, ui, table, |_| {})
    }

    pub(crate) fn with_binding(
        api: RecordingApi,
        ui: RecordingUi,
        table: TestTable,
        configure: impl FnOnce(&mut CrudBinding),
    ) -> Self {
        let api = Arc::new(api);
        let ui = Arc::new(ui);
        let table = Arc::new(table);
        let forms = Arc::new(RecordingFormWrapper::default());
        let mut binding = CrudBinding::with_api(api.clone());
        configure(&mut binding);
        let expose = CrudExpose::new_with_dependencies(
            binding,
            ui.clone(),
            Arc::new(DefaultMessages),
            table.clone(),
            forms.clone(),
        );
        Self {
            expose,
            api,
            ui,
            table,
            forms,
        }
    }
}
