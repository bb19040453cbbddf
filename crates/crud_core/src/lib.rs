pub mod binding;
pub mod columns;
pub mod editable;
mod expose;
mod remove;
pub mod ui;

pub use binding::{
    CrudBinding, CrudRequest, EditableMode, EditableOptions, RefreshedHook, RemoveOptions,
    RemovedContext, RemovedHook, RequestBinding, RowHandleActive, RowHook, SearchBinding,
    TableBinding, TransformQuery, TransformRes, TransformResContext,
};
pub use columns::{ColumnDef, ValueBuilderContext, ValueResolveContext};
pub use editable::{
    Editable, EditableRow, EditableTable, EnableOptions, MissingEditableTable, OnEnabled,
};
pub use expose::{CrudExpose, RefreshOptions, SearchOptions, SetSearchFormOptions};
pub use ui::{
    ConfirmOptions, DefaultMessages, DialogOptions, FormWrapper, MessageType, MissingFormWrapper,
    MissingUiAdapter, Translate, UiAdapter,
};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
