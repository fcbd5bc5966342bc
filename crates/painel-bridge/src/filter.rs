//! Server-side row filters in the `column=eq.value` form.

use std::str::FromStr;

use serde_json::Value;

use crate::change::Row;

/// Errors that can occur while parsing a [`RowFilter`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The filter has no `=` between the column and the operator.
    #[error("filter `{0}` is not in the `column=op.value` form")]
    Malformed(String),
    /// The column name is empty.
    #[error("filter `{0}` has an empty column name")]
    EmptyColumn(String),
    /// Only equality filters are supported.
    #[error("unsupported filter operator `{0}`")]
    UnsupportedOperator(String),
}

/// Equality predicate restricting which rows' changes reach a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowFilter {
    pub column: String,
    pub value: String,
}

impl RowFilter {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Returns whether the row's `column` equals the filter value. Numbers and
    /// booleans are compared through their textual form; a missing column or
    /// a `null` never matches.
    pub fn matches(&self, row: &Row) -> bool {
        match row.get(&self.column) {
            Some(Value::String(text)) => *text == self.value,
            Some(Value::Number(number)) => number.to_string() == self.value,
            Some(Value::Bool(flag)) => flag.to_string() == self.value,
            _ => false,
        }
    }
}

impl std::fmt::Display for RowFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=eq.{}", self.column, self.value)
    }
}

impl FromStr for RowFilter {
    type Err = FilterError;

    fn from_str(filter: &str) -> Result<Self, Self::Err> {
        let (column, predicate) = filter
            .split_once('=')
            .ok_or_else(|| FilterError::Malformed(filter.to_string()))?;
        if column.trim().is_empty() {
            return Err(FilterError::EmptyColumn(filter.to_string()));
        }

        let (operator, value) = predicate
            .split_once('.')
            .ok_or_else(|| FilterError::Malformed(filter.to_string()))?;
        if operator != "eq" {
            return Err(FilterError::UnsupportedOperator(operator.to_string()));
        }

        Ok(Self::eq(column.trim(), value))
    }
}
