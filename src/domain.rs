// Domain data shapes shared by every pipeline stage

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constants::DATE_FORMAT;

/// Declared type of a column, used by the loader to parse cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
    Date,
    Decimal,
}

/// The ten columns of an order-line file, in header order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    OrderId,
    ProductName,
    Category,
    OrderDate,
    DeliveryDate,
    Quantity,
    UnitPrice,
    TotalCost,
    Supplier,
    WarehouseLocation,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::OrderId,
        Column::ProductName,
        Column::Category,
        Column::OrderDate,
        Column::DeliveryDate,
        Column::Quantity,
        Column::UnitPrice,
        Column::TotalCost,
        Column::Supplier,
        Column::WarehouseLocation,
    ];

    /// Name as it appears in the file header
    pub fn header(self) -> &'static str {
        match self {
            Column::OrderId => "OrderID",
            Column::ProductName => "ProductName",
            Column::Category => "Category",
            Column::OrderDate => "OrderDate",
            Column::DeliveryDate => "DeliveryDate",
            Column::Quantity => "Quantity",
            Column::UnitPrice => "UnitPrice",
            Column::TotalCost => "TotalCost",
            Column::Supplier => "Supplier",
            Column::WarehouseLocation => "WarehouseLocation",
        }
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Column::OrderId | Column::Quantity => ColumnType::Integer,
            Column::OrderDate | Column::DeliveryDate => ColumnType::Date,
            Column::UnitPrice | Column::TotalCost => ColumnType::Decimal,
            Column::ProductName
            | Column::Category
            | Column::Supplier
            | Column::WarehouseLocation => ColumnType::Text,
        }
    }

    pub fn headers() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.header()).collect()
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = String;

    /// Accepts the header name or its snake_case form, case-insensitively
    /// (`OrderID`, `order_id`, `orderid`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.header().to_lowercase() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown column '{}', expected one of: {}",
                    s,
                    Column::headers().join(", ")
                )
            })
    }
}

/// A date cell. Cells that fail to parse keep their raw text so they can be
/// reported and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Known(NaiveDate),
    Unknown(String),
}

impl DateValue {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
            Ok(date) => DateValue::Known(date),
            Err(_) => DateValue::Unknown(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<NaiveDate> {
        match self {
            DateValue::Known(date) => Some(*date),
            DateValue::Unknown(_) => None,
        }
    }

    /// True when the source cell was empty
    pub fn is_missing(&self) -> bool {
        matches!(self, DateValue::Unknown(raw) if raw.is_empty())
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Known(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            DateValue::Unknown(raw) => f.write_str(raw),
        }
    }
}

impl From<NaiveDate> for DateValue {
    fn from(date: NaiveDate) -> Self {
        DateValue::Known(date)
    }
}

/// One order line
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub order_id: i64,
    pub product_name: Option<String>,
    pub category: String,
    pub order_date: DateValue,
    pub delivery_date: DateValue,
    pub quantity: Option<i64>,
    pub unit_price: f64,
    pub total_cost: f64,
    pub supplier: String,
    pub warehouse_location: String,
}

impl Record {
    /// Render one cell the way the exporter writes it
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::OrderId => self.order_id.to_string(),
            Column::ProductName => self.product_name.clone().unwrap_or_default(),
            Column::Category => self.category.clone(),
            Column::OrderDate => self.order_date.to_string(),
            Column::DeliveryDate => self.delivery_date.to_string(),
            Column::Quantity => self.quantity.map(|q| q.to_string()).unwrap_or_default(),
            Column::UnitPrice => self.unit_price.to_string(),
            Column::TotalCost => self.total_cost.to_string(),
            Column::Supplier => self.supplier.clone(),
            Column::WarehouseLocation => self.warehouse_location.clone(),
        }
    }

    /// Days between order and delivery, when both dates are known
    pub fn delay_days(&self) -> Option<i64> {
        let ordered = self.order_date.known()?;
        let delivered = self.delivery_date.known()?;
        Some((delivered - ordered).num_days())
    }
}

/// A record together with its 1-based data-row index in the source file
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub source_row: usize,
    pub record: Record,
}

/// Ordered in-memory table for one pipeline run. Stages take it by value and
/// hand it on, so a table is never shared between stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, source_row: usize, record: Record) {
        self.rows.push(Row { source_row, record });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().map(|row| &row.record)
    }

    /// Field-by-field comparison of the records, ignoring source row indexes
    pub fn same_records(&self, other: &Table) -> bool {
        self.len() == other.len() && self.records().zip(other.records()).all(|(a, b)| a == b)
    }
}

impl FromIterator<Record> for Table {
    /// Numbers the rows 1, 2, 3... in iteration order
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let rows = iter
            .into_iter()
            .enumerate()
            .map(|(i, record)| Row {
                source_row: i + 1,
                record,
            })
            .collect();
        Self { rows }
    }
}
