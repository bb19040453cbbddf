use shared::{domain::CrudMode, error::CrudError, protocol::RowContext};
use tracing::{debug, info};

use crate::{
    binding::{RemoveOptions, RemovedContext},
    expose::{CrudExpose, RefreshOptions},
    ui::{ConfirmOptions, MessageType, REMOVE_CONFIRM_MESSAGE, REMOVE_CONFIRM_TITLE, REMOVE_SUCCESS},
};

impl CrudExpose {
    /// Removes one row after confirmation.
    ///
    /// Remove options configured on the table take precedence over `opts`.
    /// A declined confirmation runs `on_canceled` and returns `Ok(())`.
    pub async fn do_remove(
        &self,
        context: RowContext,
        opts: Option<RemoveOptions>,
    ) -> Result<(), CrudError> {
        let (remove, mode, api) = {
            let binding = self.binding.lock();
            (
                binding.table.remove.clone().or(opts).unwrap_or_default(),
                binding.mode,
                binding.request.api.clone(),
            )
        };

        let confirmed = match &remove.confirm_fn {
            Some(confirm) => confirm(context.clone()).await,
            None => {
                self.ui
                    .confirm(ConfirmOptions {
                        title: remove
                            .confirm_title
                            .clone()
                            .unwrap_or_else(|| self.translate.t(REMOVE_CONFIRM_TITLE)),
                        message: remove
                            .confirm_message
                            .clone()
                            .unwrap_or_else(|| self.translate.t(REMOVE_CONFIRM_MESSAGE)),
                        kind: MessageType::Warn,
                    })
                    .await
            }
        };
        if let Err(reason) = confirmed {
            info!(reason = %reason, index = ?context.index, "remove canceled");
            if let Some(on_canceled) = &remove.on_canceled {
                on_canceled(context)
                    .await
                    .map_err(|err| CrudError::hook("onCanceled", err))?;
            }
            return Ok(());
        }

        let res = match mode {
            CrudMode::Local => {
                let index = context.index.ok_or(CrudError::MissingRowIndex)?;
                self.remove_table_row(index)?;
                None
            }
            CrudMode::Server => {
                let api = api.ok_or(CrudError::MissingRequest("delRequest"))?;
                let res = api
                    .del_request(context.clone())
                    .await
                    .map_err(|err| CrudError::request("delRequest", err))?;
                Some(res)
            }
        };
        debug!(index = ?context.index, "row removed");

        if remove.show_success_notification != Some(false) {
            self.ui.notify_success(&self.translate.t(REMOVE_SUCCESS));
        }
        if remove.refresh_table != Some(false) {
            self.do_refresh(RefreshOptions::default()).await?;
        }
        if let Some(on_removed) = &remove.on_removed {
            on_removed(RemovedContext { context, res })
                .await
                .map_err(|err| CrudError::hook("onRemoved", err))?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/remove_tests.rs"]
mod tests;
