use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{Column, DateValue, Record, Table};

/// A non-fatal observation about one cell of one source row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// 1-based data-row index in the source file
    pub row_index: usize,
    /// Column that triggered the finding
    pub field: Column,
    pub kind: FindingKind,
}

/// Kinds of findings reported by the validator and the date reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FindingKind {
    /// Required value is absent
    MissingValue,
    /// Quantity below zero
    NegativeQuantity,
    /// Unit price or total cost below zero
    NegativePrice,
    /// Date cell present but not a `YYYY-MM-DD` calendar date
    InvalidDate,
    /// Order and delivery dates were in reverse order and have been swapped
    DatesSwapped,
    /// Date pair could not be checked because one side is unknown
    UnreconciledDate,
}

impl Finding {
    pub fn new(row_index: usize, field: Column, kind: FindingKind) -> Self {
        Self {
            row_index,
            field,
            kind,
        }
    }
}

/// Scan the table for missing required values, negative numbers and bad
/// dates. The table is only borrowed; repairs happen in the repair stage.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn validate(table: &Table) -> Vec<Finding> {
    let mut findings = Vec::new();
    for row in table.rows() {
        findings.extend(check_record(row.source_row, &row.record));
    }
    info!("Validation produced {} findings", findings.len());
    findings
}

fn check_record(row: usize, record: &Record) -> Vec<Finding> {
    let mut findings = Vec::new();

    if record.product_name.is_none() {
        findings.push(Finding::new(row, Column::ProductName, FindingKind::MissingValue));
    }

    for (column, value) in [
        (Column::OrderDate, &record.order_date),
        (Column::DeliveryDate, &record.delivery_date),
    ] {
        if let Some(kind) = check_date(value) {
            findings.push(Finding::new(row, column, kind));
        }
    }

    match record.quantity {
        None => findings.push(Finding::new(row, Column::Quantity, FindingKind::MissingValue)),
        Some(q) if q < 0 => {
            findings.push(Finding::new(row, Column::Quantity, FindingKind::NegativeQuantity))
        }
        Some(_) => {}
    }

    if record.unit_price < 0.0 {
        findings.push(Finding::new(row, Column::UnitPrice, FindingKind::NegativePrice));
    }
    if record.total_cost < 0.0 {
        findings.push(Finding::new(row, Column::TotalCost, FindingKind::NegativePrice));
    }

    findings
}

fn check_date(value: &DateValue) -> Option<FindingKind> {
    match value {
        DateValue::Known(_) => None,
        v if v.is_missing() => Some(FindingKind::MissingValue),
        DateValue::Unknown(_) => Some(FindingKind::InvalidDate),
    }
}

/// Median of the present, non-negative quantities. Even-sized samples use the
/// midpoint of the two middle values. `None` when no such quantity exists.
pub fn median_quantity(table: &Table) -> Option<f64> {
    let mut values: Vec<i64> = table
        .records()
        .filter_map(|r| r.quantity)
        .filter(|q| *q >= 0)
        .collect();
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] as f64 + values[mid] as f64) / 2.0)
    } else {
        Some(values[mid] as f64)
    }
}
