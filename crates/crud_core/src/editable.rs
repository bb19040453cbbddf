//! Inline (editable) table mode.

use std::{fmt, sync::Arc};

use serde_json::Value;
use shared::{
    domain::{merge_row, CrudMode, Row},
    error::CrudError,
    protocol::{AddRequest, EditRequest, RowContext},
};
use tracing::{debug, info, warn};

use crate::{
    binding::{EditableMode, EditableOptions, RowHandleActive},
    expose::{CrudExpose, RefreshOptions},
    ui::{ConfirmOptions, MessageType, REMOVE_CONFIRM_MESSAGE, REMOVE_CONFIRM_TITLE, REMOVE_SUCCESS},
};

/// One row of the table component while editable mode is on.
pub trait EditableRow: Send + Sync {
    /// True for rows created through `add_row` and not yet saved.
    fn is_add(&self) -> bool;
    fn is_loading(&self) -> bool;
    fn set_loading(&self, loading: bool);
    fn row_data(&self) -> Row;
    /// Only the cells the user changed.
    fn changed(&self) -> Row;
    fn set_data(&self, data: Row);
    fn inactive(&self);
}

/// Editing contract of the table component.
pub trait EditableTable: Send + Sync {
    fn editable_row(&self, index: usize) -> Option<Arc<dyn EditableRow>>;
    fn active(&self);
    fn inactive(&self);
    fn resume(&self);
    fn add_row(&self, opts: Row);
    fn edit_col(&self, opts: Row);
    fn remove_row(&self, index: usize);
}

pub struct MissingEditableTable;

impl EditableTable for MissingEditableTable {
    fn editable_row(&self, index: usize) -> Option<Arc<dyn EditableRow>> {
        warn!(index, "no table attached; editable row unavailable");
        None
    }

    fn active(&self) {
        warn!("no table attached; cannot activate editing");
    }

    fn inactive(&self) {
        warn!("no table attached; cannot deactivate editing");
    }

    fn resume(&self) {
        warn!("no table attached; cannot resume rows");
    }

    fn add_row(&self, _opts: Row) {
        warn!("no table attached; cannot add a row");
    }

    fn edit_col(&self, _opts: Row) {
        warn!("no table attached; cannot edit a column");
    }

    fn remove_row(&self, index: usize) {
        warn!(index, "no table attached; cannot remove a row");
    }
}

pub type OnEnabled = Arc<dyn Fn(&EditableOptions) + Send + Sync>;

#[derive(Clone, Default)]
pub struct EnableOptions {
    pub mode: Option<EditableMode>,
    /// Merged into the bound editable options.
    pub extra: Row,
    /// Replaces the default switch of the row handle.
    pub on_enabled: Option<OnEnabled>,
}

impl fmt::Debug for EnableOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnableOptions")
            .field("mode", &self.mode)
            .field("extra", &self.extra)
            .field("on_enabled", &self.on_enabled.is_some())
            .finish()
    }
}

struct RowLoading<'a> {
    row: &'a dyn EditableRow,
}

impl<'a> RowLoading<'a> {
    fn start(row: &'a dyn EditableRow) -> Self {
        row.set_loading(true);
        Self { row }
    }
}

impl Drop for RowLoading<'_> {
    fn drop(&mut self) {
        self.row.set_loading(false);
    }
}

pub struct Editable<'a> {
    expose: &'a CrudExpose,
}

impl<'a> Editable<'a> {
    pub(crate) fn new(expose: &'a CrudExpose) -> Self {
        Self { expose }
    }

    pub fn enable(&self, opts: EnableOptions) {
        let editable = {
            let mut binding = self.expose.binding.lock();
            let editable = &mut binding.table.editable;
            editable.enabled = true;
            if let Some(mode) = opts.mode {
                editable.mode = mode;
            }
            merge_row(&mut editable.extra, &opts.extra);
            let editable = editable.clone();
            if opts.on_enabled.is_none() {
                binding.row_handle = match editable.mode {
                    EditableMode::Row => RowHandleActive::EditRow,
                    EditableMode::Cell => RowHandleActive::Editable,
                };
            }
            editable
        };
        debug!(mode = ?editable.mode, "editable enabled");
        if let Some(on_enabled) = opts.on_enabled {
            on_enabled(&editable);
        }
    }

    pub fn disable(&self) {
        self.expose.table.resume();
        let mut binding = self.expose.binding.lock();
        binding.table.editable.enabled = false;
        binding.row_handle = RowHandleActive::Default;
    }

    pub fn active(&self) {
        self.expose.table.active();
    }

    pub fn inactive(&self) {
        self.expose.table.inactive();
    }

    pub fn add_row(&self, opts: Row) {
        self.expose.table.add_row(opts);
    }

    pub fn edit_col(&self, opts: Row) {
        self.expose.table.edit_col(opts);
    }

    /// Restores every row to its value before editing.
    pub fn resume(&self) {
        self.expose.table.resume();
    }

    pub fn remove_row(&self, index: usize) {
        self.expose.table.remove_row(index);
    }

    pub fn get_editable_row(&self, index: usize) -> Result<Arc<dyn EditableRow>, CrudError> {
        self.expose
            .table
            .editable_row(index)
            .ok_or(CrudError::EditableRowNotFound(index))
    }

    /// Persists one row. New rows go through the add request and take the
    /// stored record back; existing rows send only the changed cells.
    pub async fn do_save_row(&self, index: usize) -> Result<(), CrudError> {
        let row = self.get_editable_row(index)?;
        let (mode, api) = {
            let binding = self.expose.binding.lock();
            (binding.mode, binding.request.api.clone())
        };
        if mode == CrudMode::Local {
            return Ok(());
        }

        {
            let _loading = RowLoading::start(row.as_ref());
            if row.is_add() {
                let api = api.ok_or(CrudError::MissingRequest("addRequest"))?;
                let stored = api
                    .add_request(AddRequest {
                        form: row.changed(),
                    })
                    .await
                    .map_err(|err| CrudError::request("addRequest", err))?;
                match stored {
                    Value::Object(record) => row.set_data(record),
                    other => warn!(res = %other, "add request did not return a record; row data kept"),
                }
            } else {
                let api = api.ok_or(CrudError::MissingRequest("editRequest"))?;
                api.edit_request(EditRequest {
                    form: row.changed(),
                    row: Some(row.row_data()),
                })
                .await
                .map_err(|err| CrudError::request("editRequest", err))?;
            }
        }
        row.inactive();
        debug!(index, "editable row saved");
        Ok(())
    }

    pub async fn do_cancel_row(&self, index: usize) -> Result<(), CrudError> {
        self.get_editable_row(index)?.inactive();
        Ok(())
    }

    /// Removes one row after confirmation. Unsaved rows only touch the table;
    /// otherwise the delete request runs and the page is refreshed.
    ///
    /// Local mode also removes the row from the table component instead of
    /// doing nothing, so a confirmed removal never leaves the row on screen.
    /// No delete request is sent and the page is not refreshed.
    pub async fn do_remove_row(&self, index: usize) -> Result<(), CrudError> {
        let translate = &self.expose.translate;
        let confirmed = self
            .expose
            .ui
            .confirm(ConfirmOptions {
                title: translate.t(REMOVE_CONFIRM_TITLE),
                message: translate.t(REMOVE_CONFIRM_MESSAGE),
                kind: MessageType::Warn,
            })
            .await;
        if let Err(reason) = confirmed {
            info!(reason = %reason, index, "delete canceled");
            return Ok(());
        }

        let row = self.get_editable_row(index)?;
        let (mode, api) = {
            let binding = self.expose.binding.lock();
            (binding.mode, binding.request.api.clone())
        };
        if row.is_add() || mode == CrudMode::Local {
            self.remove_row(index);
        } else {
            let api = api.ok_or(CrudError::MissingRequest("delRequest"))?;
            api.del_request(RowContext::at(index).with_row(row.row_data()))
                .await
                .map_err(|err| CrudError::request("delRequest", err))?;
            self.expose.do_refresh(RefreshOptions::default()).await?;
        }
        self.expose.ui.notify_success(&translate.t(REMOVE_SUCCESS));
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/editable_tests.rs"]
mod tests;
