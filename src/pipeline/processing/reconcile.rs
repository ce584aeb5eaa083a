use metrics::counter;
use tracing::{debug, info, instrument};

use crate::domain::{Column, Table};
use crate::pipeline::processing::validator::{Finding, FindingKind};

/// Put order and delivery dates back in chronological order.
///
/// When both dates are known and the order date is later than the delivery
/// date the two values are swapped; the earlier one becomes the order date.
/// Rows with an unknown date are kept as they are and reported.
#[instrument(skip(table), fields(rows = table.len()))]
pub fn reconcile_dates(mut table: Table) -> (Table, Vec<Finding>) {
    let mut findings = Vec::new();
    let mut swapped = 0usize;

    for row in table.rows_mut() {
        let record = &mut row.record;
        match (record.order_date.known(), record.delivery_date.known()) {
            (Some(ordered), Some(delivered)) => {
                if ordered > delivered {
                    std::mem::swap(&mut record.order_date, &mut record.delivery_date);
                    debug!(row = row.source_row, "swapped order and delivery dates");
                    findings.push(Finding::new(
                        row.source_row,
                        Column::OrderDate,
                        FindingKind::DatesSwapped,
                    ));
                    swapped += 1;
                }
            }
            (None, _) => findings.push(Finding::new(
                row.source_row,
                Column::OrderDate,
                FindingKind::UnreconciledDate,
            )),
            (Some(_), None) => findings.push(Finding::new(
                row.source_row,
                Column::DeliveryDate,
                FindingKind::UnreconciledDate,
            )),
        }
    }

    counter!("order_cleaner_dates_swapped_total").increment(swapped as u64);
    info!(
        "Swapped {} date pairs, {} left unreconciled",
        swapped,
        findings.len() - swapped
    );
    (table, findings)
}
