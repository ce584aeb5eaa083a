// Pipeline processing: loading, validation, repair, and reporting stages

pub mod loader;
pub mod validator;
pub mod repair;
pub mod dedupe;
pub mod reconcile;
pub mod aggregate;
pub mod export;

// Re-export the stage entry points
pub use aggregate::{
    most_delayed_orders, revenue_by_category, summarize, top_selling_products, AggregateReport,
};
pub use dedupe::{dedupe, dedupe_by_column, dedupe_by_order_id};
pub use export::{export, write_atomically};
pub use loader::{load, load_path, LoadOptions, Loaded, SkippedRow};
pub use reconcile::reconcile_dates;
pub use repair::{repair, RepairOptions, RepairSummary};
pub use validator::{median_quantity, validate, Finding, FindingKind};
