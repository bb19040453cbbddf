//! UI collaborators: confirm dialogs, notifications, translations and the
//! form dialog host.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::{FormMode, Row};
use tracing::{info, warn};

pub const REMOVE_CONFIRM_TITLE: &str = "fs.rowHandle.remove.confirmTitle";
pub const REMOVE_CONFIRM_MESSAGE: &str = "fs.rowHandle.remove.confirmMessage";
pub const REMOVE_SUCCESS: &str = "fs.rowHandle.remove.success";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Info,
    Success,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOptions {
    pub title: String,
    pub message: String,
    pub kind: MessageType,
}

#[async_trait]
pub trait UiAdapter: Send + Sync {
    /// Resolves when the user accepts; any error means the user cancelled.
    async fn confirm(&self, options: ConfirmOptions) -> Result<()>;
    fn notify_success(&self, message: &str);
}

/// Used when no UI is attached. Every confirmation is treated as declined.
pub struct MissingUiAdapter;

#[async_trait]
impl UiAdapter for MissingUiAdapter {
    async fn confirm(&self, options: ConfirmOptions) -> Result<()> {
        Err(anyhow!("ui is unavailable to confirm \"{}\"", options.title))
    }

    fn notify_success(&self, message: &str) {
        info!(message, "notification");
    }
}

pub trait Translate: Send + Sync {
    fn t(&self, key: &str) -> String;
}

/// Built-in English strings; unknown keys are returned as-is.
pub struct DefaultMessages;

impl Translate for DefaultMessages {
    fn t(&self, key: &str) -> String {
        match key {
            REMOVE_CONFIRM_TITLE => "Notice",
            REMOVE_CONFIRM_MESSAGE => "Are you sure you want to delete this record?",
            REMOVE_SUCCESS => "Delete succeeded",
            other => other,
        }
        .to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogOptions {
    pub mode: FormMode,
    pub initial_form: Option<Row>,
    pub index: Option<usize>,
    /// Form options merged from the per-mode form config, the row context
    /// and the call site, later sources winning.
    pub options: Row,
}

#[async_trait]
pub trait FormWrapper: Send + Sync {
    async fn open(&self, options: DialogOptions) -> Result<()>;
}

pub struct MissingFormWrapper;

#[async_trait]
impl FormWrapper for MissingFormWrapper {
    async fn open(&self, options: DialogOptions) -> Result<()> {
        warn!(mode = options.mode.as_str(), "no form wrapper attached; dialog not opened");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_messages_translate_remove_keys() {
        let messages = DefaultMessages;

        assert_eq!(messages.t(REMOVE_CONFIRM_TITLE), "Notice");
        assert_eq!(messages.t(REMOVE_SUCCESS), "Delete succeeded");
        assert_eq!(messages.t("fs.unknown"), "fs.unknown");
    }

    #[tokio::test]
    async fn missing_ui_adapter_declines_confirmation() {
        let result = MissingUiAdapter
            .confirm(ConfirmOptions {
                title: "t".into(),
                message: "m".into(),
                kind: MessageType::Warn,
            })
            .await;

        assert!(result.is_err());
    }
}
