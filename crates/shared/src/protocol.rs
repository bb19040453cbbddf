use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FormMode, Row, SortState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub current_page: u64,
    pub page_size: u64,
}

/// Query handed to `transform_query` before the page request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PageParams>,
    pub form: Row,
    pub sort: SortState,
}

/// Page response after `transform_res`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRes {
    pub records: Vec<Row>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
}

impl PageRes {
    /// Accepts any response whose `records` is a list and whose `total` is a
    /// number. `currentPage` and `pageSize` are read when they are numbers
    /// and left unset otherwise. Non-object records are skipped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let records = value
            .get("records")?
            .as_array()?
            .iter()
            .filter_map(|record| record.as_object().cloned())
            .collect();
        let total = count(value.get("total")?)?;
        Some(Self {
            records,
            total,
            current_page: value.get("currentPage").and_then(count),
            page_size: value.get("pageSize").and_then(count),
        })
    }
}

/// Reads a non-negative count from an integer or float JSON number.
fn count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    })
}

/// Identifies the row a row-handle action was triggered on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<Row>,
}

impl RowContext {
    pub fn at(index: usize) -> Self {
        Self {
            index: Some(index),
            row: None,
        }
    }

    pub fn with_row(mut self, row: Row) -> Self {
        self.row = Some(row);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddRequest {
    pub form: Row,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    pub form: Row,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<Row>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoRequest {
    pub mode: FormMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<Row>,
}
