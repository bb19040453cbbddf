use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single table row or form value set.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrudMode {
    /// Rows come from and go back to the request functions.
    #[default]
    Server,
    /// Rows live only in the bound table data.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            page_size: 20,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prop: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
}

/// Dialog/form mode used when opening the row form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormMode {
    Add,
    Edit,
    View,
}

impl FormMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FormMode::Add => "add",
            FormMode::Edit => "edit",
            FormMode::View => "view",
        }
    }
}

/// Deep-merges `patch` into `target`; objects merge key by key, anything else is replaced.
pub fn merge_value(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => merge_row(target, patch),
        (target, patch) => *target = patch.clone(),
    }
}

pub fn merge_row(target: &mut Row, patch: &Row) {
    for (key, value) in patch {
        match target.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => {
                merge_value(existing, value)
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
