use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{display_value, Record};

/// Formats one cell. Must be a pure function of the value and its row.
pub type Renderer = fn(&Value, &Record) -> String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[default]
    Text,
    Number,
    Date,
}

/// How one field takes part in display, filtering and sorting.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub key: String,
    pub label: String,
    pub sortable: bool,
    pub filterable: bool,
    pub kind: ColumnKind,
    pub render: Option<Renderer>,
}

impl ColumnDescriptor {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            sortable: false,
            filterable: false,
            kind: ColumnKind::Text,
            render: None,
        }
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn render(mut self, render: Renderer) -> Self {
        self.render = Some(render);
        self
    }

    /// Display text of this column for `row`; the raw value when no renderer is set.
    pub fn cell(&self, row: &Record) -> String {
        let value = row.get(&self.key).unwrap_or(&Value::Null);
        match self.render {
            Some(render) => render(value, row),
            None => display_value(value),
        }
    }
}
