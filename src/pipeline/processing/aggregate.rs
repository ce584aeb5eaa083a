use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

use crate::constants::UNKNOWN_PRODUCT;
use crate::domain::Table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductTotal {
    pub product_name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderDelay {
    pub order_id: i64,
    pub delay_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRevenue {
    pub category: String,
    pub revenue: f64,
}

/// All three reports over one cleaned table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateReport {
    pub top_selling_products: Vec<ProductTotal>,
    pub most_delayed_orders: Vec<OrderDelay>,
    pub revenue_by_category: Vec<CategoryRevenue>,
}

pub fn summarize(table: &Table, top_n: usize) -> AggregateReport {
    AggregateReport {
        top_selling_products: top_selling_products(table, top_n),
        most_delayed_orders: most_delayed_orders(table, top_n),
        revenue_by_category: revenue_by_category(table),
    }
}

/// Total quantity per product, largest first, ties by name. At most `n` rows.
pub fn top_selling_products(table: &Table, n: usize) -> Vec<ProductTotal> {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for record in table.records() {
        let name = record.product_name.as_deref().unwrap_or(UNKNOWN_PRODUCT);
        *totals.entry(name).or_insert(0) += record.quantity.unwrap_or(0);
    }

    let mut out: Vec<ProductTotal> = totals
        .into_iter()
        .map(|(name, quantity)| ProductTotal {
            product_name: name.to_string(),
            quantity,
        })
        .collect();
    out.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });
    out.truncate(n);
    out
}

/// Orders with the longest delivery delay in days, ties by order id. Rows with
/// an unknown date are left out.
pub fn most_delayed_orders(table: &Table, n: usize) -> Vec<OrderDelay> {
    let mut out: Vec<OrderDelay> = table
        .records()
        .filter_map(|r| {
            r.delay_days().map(|delay_days| OrderDelay {
                order_id: r.order_id,
                delay_days,
            })
        })
        .collect();
    out.sort_by(|a, b| {
        b.delay_days
            .cmp(&a.delay_days)
            .then_with(|| a.order_id.cmp(&b.order_id))
    });
    out.truncate(n);
    out
}

/// Sum of total cost per category, largest first, ties by category name
pub fn revenue_by_category(table: &Table) -> Vec<CategoryRevenue> {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for record in table.records() {
        *sums.entry(record.category.as_str()).or_insert(0.0) += record.total_cost;
    }

    let mut out: Vec<CategoryRevenue> = sums
        .into_iter()
        .map(|(category, revenue)| CategoryRevenue {
            category: category.to_string(),
            revenue,
        })
        .collect();
    out.sort_by(|a, b| match b.revenue.total_cmp(&a.revenue) {
        Ordering::Equal => a.category.cmp(&b.category),
        other => other,
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{date, record};
    use crate::domain::Record;

    fn sale(id: i64, product: &str, quantity: i64) -> Record {
        let mut r = record(id);
        r.product_name = Some(product.to_string());
        r.quantity = Some(quantity);
        r
    }

    #[test]
    fn top_products_break_ties_alphabetically_and_stop_at_available_groups() {
        let table: Table = vec![
            sale(1, "C", 10),
            sale(2, "B", 20),
            sale(3, "A", 30),
            sale(4, "B", 10),
        ]
        .into_iter()
        .collect();

        let names: Vec<String> = top_selling_products(&table, 5)
            .into_iter()
            .map(|p| p.product_name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn top_products_truncates_to_n() {
        let table: Table = vec![sale(1, "A", 1), sale(2, "B", 2), sale(3, "C", 3)]
            .into_iter()
            .collect();
        let top = top_selling_products(&table, 2);
        assert_eq!(
            top,
            vec![
                ProductTotal { product_name: "C".into(), quantity: 3 },
                ProductTotal { product_name: "B".into(), quantity: 2 },
            ]
        );
    }

    #[test]
    fn delays_sorted_desc_ties_by_id_unknown_excluded() {
        let mut a = record(7);
        a.order_date = date("2023-01-01");
        a.delivery_date = date("2023-01-11");
        let mut b = record(3);
        b.order_date = date("2023-02-01");
        b.delivery_date = date("2023-02-11");
        let mut c = record(5);
        c.order_date = date("2023-03-01");
        c.delivery_date = date("2023-03-02");
        let mut d = record(1);
        d.delivery_date = date("unknown");
        let table: Table = vec![a, b, c, d].into_iter().collect();

        let delays = most_delayed_orders(&table, 10);
        assert_eq!(
            delays,
            vec![
                OrderDelay { order_id: 3, delay_days: 10 },
                OrderDelay { order_id: 7, delay_days: 10 },
                OrderDelay { order_id: 5, delay_days: 1 },
            ]
        );
    }

    #[test]
    fn revenue_sums_exactly_per_category() {
        let costs = [("Tools", 10.5), ("Toys", 4.0), ("Tools", 2.25), ("Food", 20.0), ("Toys", 8.75)];
        let table: Table = costs
            .iter()
            .enumerate()
            .map(|(i, (category, cost))| {
                let mut r = record(i as i64);
                r.category = category.to_string();
                r.total_cost = *cost;
                r
            })
            .collect();

        let revenue = revenue_by_category(&table);
        assert_eq!(
            revenue,
            vec![
                CategoryRevenue { category: "Food".into(), revenue: 20.0 },
                CategoryRevenue { category: "Tools".into(), revenue: 12.75 },
                CategoryRevenue { category: "Toys".into(), revenue: 12.75 },
            ]
        );
    }

    #[test]
    fn reports_on_empty_table_are_empty() {
        let report = summarize(&Table::new(), 5);
        assert!(report.top_selling_products.is_empty());
        assert!(report.most_delayed_orders.is_empty());
        assert!(report.revenue_by_category.is_empty());
    }
}
