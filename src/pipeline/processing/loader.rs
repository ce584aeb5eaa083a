use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, ReaderBuilder, StringRecord};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::constants::DEFAULT_DELIMITER;
use crate::domain::{Column, ColumnType, DateValue, Record, Table};
use crate::error::{CleanerError, Result};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Options controlling how a delimited source is read
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Drop rows that do not match the header shape instead of aborting
    pub skip_malformed: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            skip_malformed: false,
        }
    }
}

/// A source row dropped because `skip_malformed` was set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct Loaded {
    pub table: Table,
    pub skipped: Vec<SkippedRow>,
}

/// Open `path` and load it with [`load`]
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<Loaded> {
    let file = File::open(path)?;
    load(file, options)
}

/// Parse a delimited byte stream into a [`Table`].
///
/// The header must name the ten order columns in order. Row indexes in errors
/// and in [`SkippedRow`] are 1-based and do not count the header. Dates that
/// fail to parse are kept as [`DateValue::Unknown`] and left to the validator.
/// A cell that is not valid UTF-8 is an [`CleanerError::InvalidValue`] and
/// follows the same skip policy as other bad rows.
///
/// Text cells are normalized: surrounding whitespace is trimmed, inner runs of
/// whitespace become one space, and an empty `ProductName` is absent. Exporting
/// a table and loading it back therefore gives the same records only when its
/// text is already in this form, as every table produced by `load` is.
#[instrument(skip(reader))]
pub fn load<R: Read>(reader: R, options: &LoadOptions) -> Result<Loaded> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    check_header(rdr.headers()?)?;

    let mut table = Table::new();
    let mut skipped = Vec::new();

    for (i, result) in rdr.byte_records().enumerate() {
        let row = i + 1;
        let raw = result?;
        match decode_row(row, raw).and_then(|raw| parse_row(row, &raw)) {
            Ok(record) => table.push(row, record),
            Err(e @ (CleanerError::MalformedRow { .. } | CleanerError::InvalidValue { .. }))
                if options.skip_malformed =>
            {
                warn!("Skipping row {}: {}", row, e);
                skipped.push(SkippedRow {
                    row,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    counter!("order_cleaner_rows_loaded_total").increment(table.len() as u64);
    counter!("order_cleaner_rows_skipped_total").increment(skipped.len() as u64);
    info!("Loaded {} rows ({} skipped)", table.len(), skipped.len());

    Ok(Loaded { table, skipped })
}

fn check_header(header: &StringRecord) -> Result<()> {
    let found: Vec<&str> = header.iter().map(str::trim).collect();
    let expected = Column::headers();
    if found != expected {
        return Err(CleanerError::HeaderMismatch {
            expected: expected.join(","),
            found: found.join(","),
        });
    }
    Ok(())
}

fn decode_row(row: usize, raw: ByteRecord) -> Result<StringRecord> {
    StringRecord::from_byte_record(raw).map_err(|e| {
        let field = e.utf8_error().field();
        let record = e.into_byte_record();
        match Column::ALL.get(field) {
            Some(column) => invalid(
                row,
                *column,
                &String::from_utf8_lossy(record.get(field).unwrap_or_default()),
            ),
            None => CleanerError::MalformedRow {
                row,
                expected: Column::ALL.len(),
                found: record.len(),
            },
        }
    })
}

fn parse_row(row: usize, raw: &StringRecord) -> Result<Record> {
    if raw.len() != Column::ALL.len() {
        return Err(CleanerError::MalformedRow {
            row,
            expected: Column::ALL.len(),
            found: raw.len(),
        });
    }

    let cell = |column: Column| raw.get(column as usize).unwrap_or("");

    let record = Record {
        order_id: parse_integer(row, Column::OrderId, cell(Column::OrderId))?
            .ok_or_else(|| invalid(row, Column::OrderId, ""))?,
        product_name: parse_text(cell(Column::ProductName)),
        category: parse_text(cell(Column::Category)).unwrap_or_default(),
        order_date: DateValue::parse(cell(Column::OrderDate)),
        delivery_date: DateValue::parse(cell(Column::DeliveryDate)),
        quantity: parse_integer(row, Column::Quantity, cell(Column::Quantity))?,
        unit_price: parse_decimal(row, Column::UnitPrice, cell(Column::UnitPrice))?,
        total_cost: parse_decimal(row, Column::TotalCost, cell(Column::TotalCost))?,
        supplier: parse_text(cell(Column::Supplier)).unwrap_or_default(),
        warehouse_location: parse_text(cell(Column::WarehouseLocation)).unwrap_or_default(),
    };
    debug!(row, order_id = record.order_id, "parsed row");
    Ok(record)
}

/// Trim and collapse internal whitespace; empty cells are absent
fn parse_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(WHITESPACE_RUN.replace_all(trimmed, " ").into_owned())
    }
}

fn parse_integer(row: usize, column: Column, raw: &str) -> Result<Option<i64>> {
    debug_assert_eq!(column.column_type(), ColumnType::Integer);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| invalid(row, column, trimmed))
}

fn parse_decimal(row: usize, column: Column, raw: &str) -> Result<f64> {
    debug_assert_eq!(column.column_type(), ColumnType::Decimal);
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(invalid(row, column, trimmed)),
    }
}

fn invalid(row: usize, column: Column, value: &str) -> CleanerError {
    CleanerError::InvalidValue {
        row,
        column,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::export::export;
    use chrono::NaiveDate;

    const HEADER: &str = "OrderID,ProductName,Category,OrderDate,DeliveryDate,Quantity,UnitPrice,TotalCost,Supplier,WarehouseLocation\n";

    fn load_str(body: &str, options: &LoadOptions) -> Result<Loaded> {
        load(format!("{HEADER}{body}").as_bytes(), options)
    }

    #[test]
    fn loads_typed_record() {
        let loaded = load_str(
            "1,  Desk   Lamp ,Lighting,2023-03-01,2023-03-04,3,19.99,59.97,Lumen Co,Austin\n",
            &LoadOptions::default(),
        )
        .unwrap();

        assert_eq!(loaded.table.len(), 1);
        let record = &loaded.table.rows()[0].record;
        assert_eq!(record.order_id, 1);
        assert_eq!(record.product_name.as_deref(), Some("Desk Lamp"));
        assert_eq!(
            record.order_date,
            DateValue::Known(NaiveDate::from_ymd_opt(2023, 3, 1).unwrap())
        );
        assert_eq!(record.quantity, Some(3));
        assert_eq!(record.unit_price, 19.99);
        assert_eq!(loaded.table.rows()[0].source_row, 1);
    }

    #[test]
    fn empty_cells_become_absent_or_unknown() {
        let loaded = load_str(
            "2,,Office,not-a-date,,,1.5,3,Paperly,Oslo\n",
            &LoadOptions::default(),
        )
        .unwrap();
        let record = &loaded.table.rows()[0].record;
        assert_eq!(record.product_name, None);
        assert_eq!(record.quantity, None);
        assert_eq!(record.order_date, DateValue::Unknown("not-a-date".to_string()));
        assert!(record.delivery_date.is_missing());
    }

    #[test]
    fn short_row_is_fatal_with_row_index() {
        let err = load_str(
            "1,A,C,2023-01-01,2023-01-02,1,1,1,S,W\n2,B,C,2023-01-01\n",
            &LoadOptions::default(),
        )
        .unwrap_err();
        match err {
            CleanerError::MalformedRow { row, expected, found } => {
                assert_eq!((row, expected, found), (2, 10, 4));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_rows_are_skipped_when_configured() {
        let options = LoadOptions {
            skip_malformed: true,
            ..LoadOptions::default()
        };
        let loaded = load_str(
            "1,A,C,2023-01-01,2023-01-02,1,1,1,S,W\n2,B\n3,C,C,2023-01-01,2023-01-02,x,1,1,S,W\n4,D,C,2023-01-01,2023-01-02,1,1,1,S,W\n",
            &options,
        )
        .unwrap();
        assert_eq!(loaded.table.len(), 2);
        let rows: Vec<usize> = loaded.skipped.iter().map(|s| s.row).collect();
        assert_eq!(rows, vec![2, 3]);
        assert_eq!(loaded.table.rows()[1].source_row, 4);
    }

    #[test]
    fn bad_number_is_invalid_value() {
        let err = load_str(
            "1,A,C,2023-01-01,2023-01-02,1,free,1,S,W\n",
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CleanerError::InvalidValue { row: 1, column: Column::UnitPrice, .. }
        ));
    }

    #[test]
    fn wrong_header_is_rejected() {
        let err = load("id,name\n1,A\n".as_bytes(), &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "HeaderMismatchError");
    }

    #[test]
    fn invalid_utf8_is_invalid_value() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"1,A,C,2023-01-01,2023-01-02,1,1,1,S,W\n2,Caf\xff,C,2023-01-01,2023-01-02,1,1,1,S,W\n");

        let err = load(bytes.as_slice(), &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "InvalidValueError");
        assert!(matches!(
            err,
            CleanerError::InvalidValue { row: 2, column: Column::ProductName, .. }
        ));

        let options = LoadOptions {
            skip_malformed: true,
            ..LoadOptions::default()
        };
        let loaded = load(bytes.as_slice(), &options).unwrap();
        assert_eq!(loaded.table.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].row, 2);
    }

    #[test]
    fn loader_output_survives_export_and_reload() {
        let loaded = load_str(
            "1,  Desk   Lamp ,Lighting,2023-03-01,2023-03-04,3,19.99,59.97, Lumen  Co ,Austin\n\
             2,,Office,not-a-date,,,1.5,3,Paperly,Oslo\n",
            &LoadOptions::default(),
        )
        .unwrap();

        let bytes = export(&loaded.table, b',').unwrap();
        let reloaded = load(bytes.as_slice(), &LoadOptions::default()).unwrap();
        assert!(reloaded.table.same_records(&loaded.table));
        assert_eq!(
            reloaded.table.rows()[0].record.supplier,
            "Lumen Co".to_string()
        );
    }

    #[test]
    fn honours_custom_delimiter() {
        let text = HEADER.replace(',', ";") + "9;A;C;2023-01-01;2023-01-02;1;1.25;1.25;S;W\n";
        let options = LoadOptions {
            delimiter: b';',
            ..LoadOptions::default()
        };
        let loaded = load(text.as_bytes(), &options).unwrap();
        assert_eq!(loaded.table.rows()[0].record.order_id, 9);
    }
}
