use std::{fmt, sync::Arc};

use dict::Dict;
use serde_json::Value;
use shared::domain::Row;
use tracing::debug;

pub struct ValueBuilderContext<'a> {
    pub key: &'a str,
    pub index: usize,
    pub row: &'a mut Row,
}

impl ValueBuilderContext<'_> {
    pub fn value(&self) -> Option<&Value> {
        self.row.get(self.key)
    }
}

pub struct ValueResolveContext<'a> {
    pub key: &'a str,
    pub form: &'a mut Row,
}

impl ValueResolveContext<'_> {
    pub fn value(&self) -> Option<&Value> {
        self.form.get(self.key)
    }
}

pub type ValueBuilder = Arc<dyn Fn(ValueBuilderContext<'_>) + Send + Sync>;
pub type ValueResolve = Arc<dyn Fn(ValueResolveContext<'_>) + Send + Sync>;

/// Declarative column. Group columns carry `children` and are never
/// transformed themselves.
#[derive(Clone, Default)]
pub struct ColumnDef {
    pub key: String,
    pub title: Option<String>,
    pub children: Vec<ColumnDef>,
    pub dict: Option<Arc<Dict>>,
    /// Applied to every fetched row before it is committed.
    pub value_builder: Option<ValueBuilder>,
    /// Applied to form values before they are submitted.
    pub value_resolve: Option<ValueResolve>,
}

impl ColumnDef {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn group(title: impl Into<String>, children: Vec<ColumnDef>) -> Self {
        Self {
            title: Some(title.into()),
            children,
            ..Self::default()
        }
    }

    pub fn with_dict(mut self, dict: Arc<Dict>) -> Self {
        self.dict = Some(dict);
        self
    }

    pub fn with_value_builder(
        mut self,
        builder: impl Fn(ValueBuilderContext<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.value_builder = Some(Arc::new(builder));
        self
    }

    pub fn with_value_resolve(
        mut self,
        resolve: impl Fn(ValueResolveContext<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.value_resolve = Some(Arc::new(resolve));
        self
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("children", &self.children)
            .field("dict", &self.dict.is_some())
            .field("value_builder", &self.value_builder.is_some())
            .field("value_resolve", &self.value_resolve.is_some())
            .finish()
    }
}

/// Visits every leaf column, descending into groups.
pub fn for_each_column<'a>(columns: &'a [ColumnDef], f: &mut impl FnMut(&'a ColumnDef)) {
    for column in columns {
        if column.children.is_empty() {
            f(column);
        } else {
            for_each_column(&column.children, f);
        }
    }
}

pub fn apply_value_builders(records: &mut [Row], columns: &[ColumnDef]) {
    let mut builders = Vec::new();
    for_each_column(columns, &mut |column| {
        if let Some(builder) = &column.value_builder {
            builders.push((column.key.as_str(), builder));
        }
    });
    if builders.is_empty() {
        return;
    }
    for (index, row) in records.iter_mut().enumerate() {
        for (key, builder) in &builders {
            builder(ValueBuilderContext {
                key,
                index,
                row: &mut *row,
            });
        }
    }
    debug!(records = records.len(), "value builders applied");
}

pub fn apply_value_resolves(form: &mut Row, columns: &[ColumnDef]) {
    let mut resolves = Vec::new();
    for_each_column(columns, &mut |column| {
        if let Some(resolve) = &column.value_resolve {
            resolves.push((column.key.as_str(), resolve));
        }
    });
    for (key, resolve) in resolves {
        resolve(ValueResolveContext {
            key,
            form: &mut *form,
        });
    }
}
