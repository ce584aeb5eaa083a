use metrics::counter;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::constants::UNKNOWN_PRODUCT;
use crate::domain::Table;
use crate::pipeline::processing::validator::median_quantity;

#[derive(Debug, Clone)]
pub struct RepairOptions {
    /// Written into empty ProductName cells
    pub unknown_product: String,
    /// Overwrite TotalCost with Quantity * UnitPrice after the other repairs
    pub recompute_total_cost: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            unknown_product: UNKNOWN_PRODUCT.to_string(),
            recompute_total_cost: false,
        }
    }
}

/// Counts of the repairs applied to a table
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RepairSummary {
    pub products_filled: usize,
    pub quantities_filled: usize,
    pub prices_negated: usize,
    pub totals_recomputed: usize,
    /// Median of the valid quantities before repair
    pub median_quantity: Option<f64>,
}

/// Fill the gaps the validator reports.
///
/// Missing product names get the unknown label. Missing or negative
/// quantities get the median of the valid quantities, rounded half away from
/// zero (0 when the table has no valid quantity). Negative prices are taken
/// as sign errors and replaced by their absolute value.
#[instrument(skip(table, options), fields(rows = table.len()))]
pub fn repair(mut table: Table, options: &RepairOptions) -> (Table, RepairSummary) {
    let median = median_quantity(&table);
    let fill = match median {
        Some(m) => m.round() as i64,
        None => {
            warn!("No valid quantities in table, filling with 0");
            0
        }
    };

    let mut summary = RepairSummary {
        median_quantity: median,
        ..RepairSummary::default()
    };

    for row in table.rows_mut() {
        let record = &mut row.record;

        if record.product_name.is_none() {
            record.product_name = Some(options.unknown_product.clone());
            summary.products_filled += 1;
        }

        if record.quantity.map_or(true, |q| q < 0) {
            record.quantity = Some(fill);
            summary.quantities_filled += 1;
        }

        for price in [&mut record.unit_price, &mut record.total_cost] {
            if *price < 0.0 {
                *price = price.abs();
                summary.prices_negated += 1;
            }
        }

        if options.recompute_total_cost {
            let quantity = record.quantity.unwrap_or(0) as f64;
            let total = quantity * record.unit_price;
            if total != record.total_cost {
                record.total_cost = total;
                summary.totals_recomputed += 1;
            }
        }
    }

    counter!("order_cleaner_cells_repaired_total").increment(
        (summary.products_filled
            + summary.quantities_filled
            + summary.prices_negated
            + summary.totals_recomputed) as u64,
    );
    info!(
        "Repaired {} product names, {} quantities, {} prices",
        summary.products_filled, summary.quantities_filled, summary.prices_negated
    );

    (table, summary)
}
