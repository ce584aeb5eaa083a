use std::collections::HashSet;
use std::hash::Hash;

use metrics::counter;
use tracing::{debug, info, instrument};

use crate::domain::{Column, Record, Table};

/// Keep the first record for each key and drop later repeats.
///
/// Survivors keep their relative order, so the output is a subsequence of
/// the input. Returns the deduplicated table and the number of rows removed.
pub fn dedupe<K, F>(table: Table, key_fn: F) -> (Table, usize)
where
    K: Eq + Hash,
    F: Fn(&Record) -> K,
{
    let before = table.len();
    let mut seen = HashSet::with_capacity(before);
    let rows: Vec<_> = table
        .into_rows()
        .into_iter()
        .filter(|row| {
            let first = seen.insert(key_fn(&row.record));
            if !first {
                debug!(row = row.source_row, "dropping duplicate");
            }
            first
        })
        .collect();
    let removed = before - rows.len();
    (Table::from_rows(rows), removed)
}

/// Deduplicate on `order_id`
pub fn dedupe_by_order_id(table: Table) -> (Table, usize) {
    dedupe(table, |r| r.order_id)
}

/// Deduplicate on the rendered text of one column
#[instrument(skip(table), fields(rows = table.len()))]
pub fn dedupe_by_column(table: Table, column: Column) -> (Table, usize) {
    let (table, removed) = match column {
        Column::OrderId => dedupe_by_order_id(table),
        other => dedupe(table, |r| r.cell(other)),
    };
    counter!("order_cleaner_duplicates_removed_total").increment(removed as u64);
    info!("Removed {} duplicate rows keyed on {}", removed, column);
    (table, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::record;

    fn ids(table: &Table) -> Vec<i64> {
        table.records().map(|r| r.order_id).collect()
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut late = record(1);
        late.category = "Later copy".to_string();
        let table: Table = vec![record(3), record(1), record(2), late, record(3)]
            .into_iter()
            .collect();

        let (out, removed) = dedupe_by_order_id(table);
        assert_eq!(ids(&out), vec![3, 1, 2]);
        assert_eq!(removed, 2);
        assert_eq!(out.rows()[1].record.category, "Hardware");
        let sources: Vec<usize> = out.rows().iter().map(|r| r.source_row).collect();
        assert_eq!(sources, vec![1, 2, 3]);
    }

    #[test]
    fn output_keys_are_unique_subsequence() {
        let input: Vec<i64> = vec![5, 5, 1, 2, 1, 9, 5, 2, 7];
        let table: Table = input.iter().map(|id| record(*id)).collect();
        let (out, _) = dedupe_by_order_id(table);
        let out_ids = ids(&out);

        let unique: HashSet<_> = out_ids.iter().collect();
        assert_eq!(unique.len(), out_ids.len());

        let mut cursor = input.iter();
        assert!(out_ids.iter().all(|id| cursor.any(|x| x == id)));
    }

    #[test]
    fn dedupes_on_other_column() {
        let mut a = record(1);
        a.supplier = "North".to_string();
        let mut b = record(2);
        b.supplier = "North".to_string();
        let mut c = record(3);
        c.supplier = "South".to_string();
        let table: Table = vec![a, b, c].into_iter().collect();

        let (out, removed) = dedupe_by_column(table, Column::Supplier);
        assert_eq!(ids(&out), vec![1, 3]);
        assert_eq!(removed, 1);
    }

    #[test]
    fn empty_table_stays_empty() {
        let (out, removed) = dedupe_by_order_id(Table::new());
        assert!(out.is_empty());
        assert_eq!(removed, 0);
    }
}
