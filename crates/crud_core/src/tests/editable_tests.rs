use serde_json::json;

use super::*;
use crate::{
    binding::CrudBinding,
    test_support::{row, users_page, Harness, RecordingApi, RecordingUi, TestRow, TestTable},
};

fn harness_with(rows: Vec<Arc<TestRow>>, ui: RecordingUi, mode: CrudMode) -> Harness {
    Harness::with_binding(
        RecordingApi::returning(users_page()),
        ui,
        TestTable::with_rows(rows),
        |binding| binding.mode = mode,
    )
}

#[test]
fn enable_switches_row_handle_by_mode() {
    let h = harness_with(Vec::new(), RecordingUi::default(), CrudMode::Server);
    let editable = h.expose.editable();

    editable.enable(EnableOptions {
        mode: Some(EditableMode::Row),
        extra: row(json!({"showAction": true})),
        ..EnableOptions::default()
    });
    {
        let binding = h.expose.binding().lock();
        assert!(binding.table.editable.enabled);
        assert_eq!(binding.table.editable.extra["showAction"], json!(true));
        assert_eq!(binding.row_handle, RowHandleActive::EditRow);
    }

    editable.enable(EnableOptions {
        mode: Some(EditableMode::Cell),
        ..EnableOptions::default()
    });
    assert_eq!(
        h.expose.binding().lock().row_handle,
        RowHandleActive::Editable
    );

    editable.disable();
    let binding = h.expose.binding().lock();
    assert!(!binding.table.editable.enabled);
    assert_eq!(binding.row_handle, RowHandleActive::Default);
    assert_eq!(h.table.calls(), vec!["resume"]);
}

#[test]
fn on_enabled_replaces_the_row_handle_switch() {
    let h = harness_with(Vec::new(), RecordingUi::default(), CrudMode::Server);
    let seen = Arc::new(parking_lot::Mutex::new(None));
    let recorder = Arc::clone(&seen);

    h.expose.editable().enable(EnableOptions {
        mode: Some(EditableMode::Row),
        on_enabled: Some(Arc::new(move |opts: &EditableOptions| {
            *recorder.lock() = Some(opts.mode);
        })),
        ..EnableOptions::default()
    });

    assert_eq!(*seen.lock(), Some(EditableMode::Row));
    assert_eq!(
        h.expose.binding().lock().row_handle,
        RowHandleActive::Default
    );
}

#[test]
fn table_operations_delegate_to_the_table() {
    let h = harness_with(Vec::new(), RecordingUi::default(), CrudMode::Server);
    let editable = h.expose.editable();

    editable.active();
    editable.add_row(Row::new());
    editable.edit_col(Row::new());
    editable.inactive();
    editable.resume();
    editable.remove_row(4);

    assert_eq!(
        h.table.calls(),
        vec!["active", "add_row", "edit_col", "inactive", "resume", "remove_row:4"]
    );
    assert!(matches!(
        editable.get_editable_row(0),
        Err(CrudError::EditableRowNotFound(0))
    ));
}

#[tokio::test]
async fn saving_a_new_row_writes_back_the_stored_record() {
    let new_row = TestRow::new(true, json!({"name": "Cy"}), json!({"name": "Cy"}));
    let h = harness_with(vec![new_row.clone()], RecordingUi::default(), CrudMode::Server);

    h.expose.editable().do_save_row(0).await.expect("save");

    let added = h.api.added.lock().clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].form, row(json!({"name": "Cy"})));
    assert_eq!(new_row.row_data(), row(json!({"id": 100})));
    assert_eq!(*new_row.loading_history.lock(), vec![true, false]);
    assert!(!new_row.is_loading());
    assert_eq!(*new_row.inactive_calls.lock(), 1);
}

#[tokio::test]
async fn saving_an_existing_row_sends_changes_and_row() {
    let existing = TestRow::new(
        false,
        json!({"id": 2, "name": "Bob", "age": 30}),
        json!({"age": 31}),
    );
    let h = harness_with(vec![existing.clone()], RecordingUi::default(), CrudMode::Server);

    h.expose.editable().do_save_row(0).await.expect("save");

    let edited = h.api.edited.lock().clone();
    assert_eq!(edited.len(), 1);
    assert_eq!(edited[0].form, row(json!({"age": 31})));
    assert_eq!(
        edited[0].row,
        Some(row(json!({"id": 2, "name": "Bob", "age": 30})))
    );
    assert!(h.api.added.lock().is_empty());
    assert_eq!(*existing.loading_history.lock(), vec![true, false]);
}

#[tokio::test]
async fn saving_in_local_mode_skips_requests() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({"id": 3}));
    let h = harness_with(vec![existing.clone()], RecordingUi::default(), CrudMode::Local);

    h.expose.editable().do_save_row(0).await.expect("save");

    assert!(h.api.edited.lock().is_empty());
    assert!(existing.loading_history.lock().is_empty());
}

#[tokio::test]
async fn failed_save_clears_loading_and_keeps_row_active() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({"id": 3}));
    let h = Harness::with_binding(
        RecordingApi::returning(users_page()),
        RecordingUi::default(),
        TestTable::with_rows(vec![existing.clone()]),
        |binding: &mut CrudBinding| binding.request.api = None,
    );

    let err = h
        .expose
        .editable()
        .do_save_row(0)
        .await
        .expect_err("no api");

    assert!(matches!(err, CrudError::MissingRequest("editRequest")));
    assert_eq!(*existing.loading_history.lock(), vec![true, false]);
    assert_eq!(*existing.inactive_calls.lock(), 0);
}

#[tokio::test]
async fn cancel_row_inactivates_it() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({}));
    let h = harness_with(vec![existing.clone()], RecordingUi::default(), CrudMode::Server);

    h.expose.editable().do_cancel_row(0).await.expect("cancel");

    assert_eq!(*existing.inactive_calls.lock(), 1);
}

#[tokio::test]
async fn removing_a_saved_row_deletes_and_refreshes() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({}));
    let h = harness_with(vec![existing], RecordingUi::default(), CrudMode::Server);

    h.expose.editable().do_remove_row(0).await.expect("remove");

    let deleted = h.api.deleted.lock().clone();
    assert_eq!(deleted, vec![RowContext::at(0).with_row(row(json!({"id": 2})))]);
    assert_eq!(h.api.page_calls(), 1);
    assert_eq!(h.ui.notifications.lock().clone(), vec!["Delete succeeded"]);
    assert!(h.table.calls().is_empty());
}

#[tokio::test]
async fn removing_an_unsaved_row_only_touches_the_table() {
    let new_row = TestRow::new(true, json!({}), json!({}));
    let h = harness_with(vec![new_row], RecordingUi::default(), CrudMode::Server);

    h.expose.editable().do_remove_row(0).await.expect("remove");

    assert!(h.api.deleted.lock().is_empty());
    assert_eq!(h.api.page_calls(), 0);
    assert_eq!(h.table.calls(), vec!["remove_row:0"]);
    assert_eq!(h.ui.notifications.lock().len(), 1);
}

#[tokio::test]
async fn removing_in_local_mode_skips_the_delete_request() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({}));
    let h = harness_with(vec![existing], RecordingUi::default(), CrudMode::Local);

    h.expose.editable().do_remove_row(0).await.expect("remove");

    assert!(h.api.deleted.lock().is_empty());
    assert_eq!(h.api.page_calls(), 0);
    assert_eq!(h.table.calls(), vec!["remove_row:0"]);
    assert_eq!(h.ui.notifications.lock().clone(), vec!["Delete succeeded"]);
}

#[tokio::test]
async fn declined_row_removal_changes_nothing() {
    let existing = TestRow::new(false, json!({"id": 2}), json!({}));
    let h = harness_with(vec![existing], RecordingUi::declining(), CrudMode::Server);

    h.expose.editable().do_remove_row(0).await.expect("declined");

    assert_eq!(h.ui.confirms.lock().len(), 1);
    assert!(h.api.deleted.lock().is_empty());
    assert!(h.ui.notifications.lock().is_empty());
}
