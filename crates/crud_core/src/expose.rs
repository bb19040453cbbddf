//! Programmatic control surface of one CRUD page.

use std::sync::Arc;

use dict::LoadDictOpts;
use futures::future::join_all;
use parking_lot::Mutex;
use serde_json::Value;
use shared::{
    domain::{merge_row, FormMode, Row},
    error::CrudError,
    protocol::{InfoRequest, PageParams, PageQuery, PageRes, RowContext},
};
use tracing::{debug, warn};

use crate::{
    binding::{CrudBinding, TransformResContext},
    columns::{apply_value_builders, apply_value_resolves, for_each_column, ColumnDef},
    editable::{Editable, EditableTable, MissingEditableTable},
    ui::{
        DefaultMessages, DialogOptions, FormWrapper, MissingFormWrapper, MissingUiAdapter,
        Translate, UiAdapter,
    },
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    pub go_first_page: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub form: Option<Row>,
    pub go_first_page: bool,
    pub merge_form: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            form: None,
            go_first_page: true,
            merge_form: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetSearchFormOptions {
    pub form: Row,
    pub merge_form: bool,
    pub trigger_search: bool,
}

/// Sets `table.loading` for as long as it is alive, including when the
/// page request future is dropped.
struct TableLoading<'a> {
    binding: &'a Mutex<CrudBinding>,
}

impl<'a> TableLoading<'a> {
    fn start(binding: &'a Mutex<CrudBinding>) -> Self {
        binding.lock().table.loading = true;
        Self { binding }
    }
}

impl Drop for TableLoading<'_> {
    fn drop(&mut self) {
        self.binding.lock().table.loading = false;
    }
}

pub struct CrudExpose {
    pub(crate) binding: Arc<Mutex<CrudBinding>>,
    pub(crate) ui: Arc<dyn UiAdapter>,
    pub(crate) translate: Arc<dyn Translate>,
    pub(crate) table: Arc<dyn EditableTable>,
    form_wrapper: Arc<dyn FormWrapper>,
}

impl CrudExpose {
    pub fn new(binding: CrudBinding) -> Arc<Self> {
        Self::new_with_dependencies(
            binding,
            Arc::new(MissingUiAdapter),
            Arc::new(DefaultMessages),
            Arc::new(MissingEditableTable),
            Arc::new(MissingFormWrapper),
        )
    }

    pub fn new_with_dependencies(
        binding: CrudBinding,
        ui: Arc<dyn UiAdapter>,
        translate: Arc<dyn Translate>,
        table: Arc<dyn EditableTable>,
        form_wrapper: Arc<dyn FormWrapper>,
    ) -> Arc<Self> {
        Arc::new(Self {
            binding: Arc::new(Mutex::new(binding)),
            ui,
            translate,
            table,
            form_wrapper,
        })
    }

    /// The bound page state. Do not hold the lock across an `.await`.
    pub fn binding(&self) -> &Arc<Mutex<CrudBinding>> {
        &self.binding
    }

    pub fn editable(&self) -> Editable<'_> {
        Editable::new(self)
    }

    /// Reloads the current page through the page request.
    ///
    /// A missing api makes this a no-op. A null or malformed response is
    /// logged and leaves the table untouched; otherwise rows and pagination
    /// are replaced together.
    pub async fn do_refresh(&self, opts: RefreshOptions) -> Result<(), CrudError> {
        let (api, page, mut form, sort, search_columns, columns, request) = {
            let mut binding = self.binding.lock();
            let Some(api) = binding.request.api.clone() else {
                return Ok(());
            };
            let page = binding.pagination.as_mut().map(|pagination| {
                if opts.go_first_page {
                    pagination.current_page = 1;
                }
                PageParams {
                    current_page: pagination.current_page,
                    page_size: pagination.page_size,
                }
            });
            (
                api,
                page,
                binding.search.form.clone(),
                binding.sort.clone(),
                binding.search.columns.clone(),
                binding.columns.clone(),
                binding.request.clone(),
            )
        };
        debug!(?page, "do refresh");

        apply_value_resolves(&mut form, &search_columns);
        apply_value_resolves(&mut form, &columns);
        let page_query = PageQuery { page, form, sort };
        let query = match &request.transform_query {
            Some(transform) => transform(page_query),
            None => serde_json::to_value(page_query)?,
        };

        let res = {
            let _loading = TableLoading::start(&self.binding);
            debug!(query = %query, "page request");
            api.page_request(query.clone()).await
        }
        .map_err(|err| CrudError::request("pageRequest", err))?;
        if res.is_null() {
            warn!("page request returned nothing; table left unchanged");
            return Ok(());
        }

        let res = match &request.transform_res {
            Some(transform) => transform(TransformResContext { res, query }),
            None => res,
        };
        let Some(PageRes {
            mut records,
            total,
            current_page,
            page_size,
        }) = PageRes::from_value(&res)
        else {
            warn!(
                res = %res,
                "page response is malformed, expected {{currentPage, pageSize, total, records: []}}; configure transform_res"
            );
            return Ok(());
        };

        apply_value_builders(&mut records, &columns);

        let on_refreshed = {
            let mut binding = self.binding.lock();
            if let Some(pagination) = binding.pagination.as_mut() {
                pagination.current_page = current_page
                    .or(page.map(|page| page.current_page))
                    .unwrap_or(pagination.current_page);
                pagination.page_size = page_size
                    .or(page.map(|page| page.page_size))
                    .unwrap_or(pagination.page_size);
                pagination.total = if total == 0 {
                    records.len() as u64
                } else {
                    total
                };
            }
            binding.data = records.clone();
            binding.table.on_refreshed.clone()
        };
        if let Some(on_refreshed) = on_refreshed {
            on_refreshed(&records);
        }
        Ok(())
    }

    pub fn do_page_turn(&self, page: u64) {
        if let Some(pagination) = self.binding.lock().pagination.as_mut() {
            pagination.current_page = page;
        }
    }

    pub async fn do_search(&self, opts: SearchOptions) -> Result<(), CrudError> {
        debug!(?opts, "do search");
        if opts.go_first_page {
            self.do_page_turn(1);
        }
        if let Some(form) = opts.form {
            self.write_search_form(form, opts.merge_form);
        }
        self.do_refresh(RefreshOptions::default()).await
    }

    pub fn get_search_form_data(&self) -> Row {
        self.binding.lock().search.form.clone()
    }

    pub async fn set_search_form_data(&self, opts: SetSearchFormOptions) -> Result<(), CrudError> {
        self.write_search_form(opts.form, opts.merge_form);
        if opts.trigger_search {
            self.do_refresh(RefreshOptions::default()).await?;
        }
        Ok(())
    }

    fn write_search_form(&self, form: Row, merge: bool) {
        let mut binding = self.binding.lock();
        if merge {
            merge_row(&mut binding.search.form, &form);
        } else {
            binding.search.form = form;
        }
    }

    /// Runs value builders over `records`, using the bound columns unless
    /// `columns` is given.
    pub fn do_value_builder(&self, records: &mut [Row], columns: Option<&[ColumnDef]>) {
        match columns {
            Some(columns) => apply_value_builders(records, columns),
            None => {
                let columns = self.binding.lock().columns.clone();
                apply_value_builders(records, &columns);
            }
        }
    }

    pub fn do_value_resolve(&self, form: &mut Row, columns: Option<&[ColumnDef]>) {
        match columns {
            Some(columns) => apply_value_resolves(form, columns),
            None => {
                let columns = self.binding.lock().columns.clone();
                apply_value_resolves(form, &columns);
            }
        }
    }

    pub fn get_table_data(&self) -> Vec<Row> {
        self.binding.lock().data.clone()
    }

    pub fn set_table_data(&self, data: Vec<Row>) {
        self.binding.lock().data = data;
    }

    /// Inserts before `index`; indexes past the end append.
    pub fn insert_table_row(&self, index: usize, row: Row) {
        let mut binding = self.binding.lock();
        let index = index.min(binding.data.len());
        binding.data.insert(index, row);
    }

    pub fn update_table_row(&self, index: usize, row: Row, merge: bool) -> Result<(), CrudError> {
        let mut binding = self.binding.lock();
        let len = binding.data.len();
        let target = binding
            .data
            .get_mut(index)
            .ok_or(CrudError::IndexOutOfRange { index, len })?;
        if merge {
            merge_row(target, &row);
        } else {
            *target = row;
        }
        Ok(())
    }

    pub fn remove_table_row(&self, index: usize) -> Result<Row, CrudError> {
        let mut binding = self.binding.lock();
        let len = binding.data.len();
        if index >= len {
            return Err(CrudError::IndexOutOfRange { index, len });
        }
        Ok(binding.data.remove(index))
    }

    pub fn get_table_data_row(&self, index: usize) -> Result<Row, CrudError> {
        let binding = self.binding.lock();
        binding
            .data
            .get(index)
            .cloned()
            .ok_or(CrudError::IndexOutOfRange {
                index,
                len: binding.data.len(),
            })
    }

    pub async fn open_dialog(&self, options: DialogOptions) -> Result<(), CrudError> {
        self.form_wrapper
            .open(options)
            .await
            .map_err(|err| CrudError::request("openDialog", err))
    }

    pub async fn open_add(&self, context: RowContext, form_opts: Row) -> Result<(), CrudError> {
        self.open_form(FormMode::Add, context, form_opts).await
    }

    pub async fn open_edit(&self, context: RowContext, form_opts: Row) -> Result<(), CrudError> {
        self.open_form(FormMode::Edit, context, form_opts).await
    }

    pub async fn open_view(&self, context: RowContext, form_opts: Row) -> Result<(), CrudError> {
        self.open_form(FormMode::View, context, form_opts).await
    }

    async fn open_form(
        &self,
        mode: FormMode,
        context: RowContext,
        form_opts: Row,
    ) -> Result<(), CrudError> {
        let mut row = match (&context.row, context.index) {
            (Some(row), _) => Some(row.clone()),
            (None, Some(index)) => Some(self.get_table_data_row(index)?),
            (None, None) => None,
        };

        let (api, mut options) = {
            let binding = self.binding.lock();
            (
                binding.request.api.clone(),
                binding.form_options(mode).clone(),
            )
        };
        if let Some(api) = api {
            let info = api
                .info_request(InfoRequest {
                    mode,
                    row: row.clone(),
                })
                .await
                .map_err(|err| CrudError::request("infoRequest", err))?;
            if info.is_some() {
                row = info;
            }
        }

        if let Value::Object(context) = serde_json::to_value(&context)? {
            merge_row(&mut options, &context);
        }
        merge_row(&mut options, &form_opts);
        self.open_dialog(DialogOptions {
            mode,
            initial_form: row,
            index: context.index,
            options,
        })
        .await
    }

    /// Loads every non-prototype dictionary attached to a column. Failures
    /// are logged and do not stop the other loads.
    pub async fn load_dicts(&self) {
        let columns = self.binding.lock().columns.clone();
        let mut dicts = Vec::new();
        for_each_column(&columns, &mut |column| {
            if let Some(dict) = &column.dict {
                if !dict.options().prototype {
                    dicts.push((column.key.clone(), Arc::clone(dict)));
                }
            }
        });

        let results = join_all(
            dicts
                .iter()
                .map(|(_, dict)| dict.load_dict(LoadDictOpts::default())),
        )
        .await;
        for ((key, _), result) in dicts.iter().zip(results) {
            if let Err(err) = result {
                warn!(column = %key, error = %err, "column dictionary failed to load");
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/expose_tests.rs"]
mod tests;
