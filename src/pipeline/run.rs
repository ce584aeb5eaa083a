use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::constants::DEFAULT_TOP_N;
use crate::domain::{Column, Table};
use crate::error::{Stage, StageContext, StageError};
use crate::pipeline::processing::export::sha256_hex;
use crate::pipeline::processing::{
    dedupe_by_column, export, load_path, reconcile_dates, repair, summarize, validate,
    write_atomically, AggregateReport, Finding, FindingKind, LoadOptions, RepairOptions,
    RepairSummary, SkippedRow,
};

/// Everything a single `clean` run needs
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub load: LoadOptions,
    pub repair: RepairOptions,
    pub dedupe_key: Column,
    pub top_n: usize,
    /// Where to save the JSON run report, if anywhere
    pub report: Option<PathBuf>,
}

impl PipelineOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            ..Self::default()
        }
    }
}

/// In-memory result of the cleaning stages, before anything is written
#[derive(Debug)]
pub struct CleanOutcome {
    pub table: Table,
    pub findings: Vec<Finding>,
    pub repairs: RepairSummary,
    pub duplicates_removed: usize,
    pub dates_swapped: usize,
}

/// Summary of a complete run, printed by the CLI and optionally saved as JSON
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub input: String,
    pub output: String,
    pub rows_loaded: usize,
    pub rows_skipped: Vec<SkippedRow>,
    pub duplicates_removed: usize,
    pub dates_swapped: usize,
    pub rows_written: usize,
    pub repairs: RepairSummary,
    pub findings: Vec<Finding>,
    pub output_sha256: String,
    pub aggregates: AggregateReport,
}

impl RunReport {
    /// Number of findings per kind
    pub fn finding_counts(&self) -> BTreeMap<FindingKind, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn to_json(&self) -> crate::error::Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Validate, dedupe, repair and reconcile a loaded table. Pure in-memory;
    /// nothing here can fail.
    ///
    /// Repair runs on the deduplicated table, so the fill median counts each
    /// key once.
    pub fn clean(&self, table: Table) -> CleanOutcome {
        let mut findings = validate(&table);
        let (table, duplicates_removed) = dedupe_by_column(table, self.options.dedupe_key);
        let (table, repairs) = repair(table, &self.options.repair);
        let (table, date_findings) = reconcile_dates(table);

        let dates_swapped = date_findings
            .iter()
            .filter(|f| f.kind == FindingKind::DatesSwapped)
            .count();
        findings.extend(date_findings);
        findings.sort_by_key(|f| (f.row_index, f.field));

        CleanOutcome {
            table,
            findings,
            repairs,
            duplicates_removed,
            dates_swapped,
        }
    }

    /// Run every stage and write the cleaned file. Nothing is written until
    /// all in-memory stages have succeeded. When a report path is set the
    /// report is written first and the output renamed into place last; if the
    /// output write fails the report is removed again.
    #[instrument(skip(self), fields(input = %self.options.input.display()))]
    pub fn run(&self) -> Result<RunReport, StageError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let t_run = Instant::now();
        info!("🚀 Starting cleaning run {}", run_id);
        counter!("order_cleaner_runs_total").increment(1);

        let loaded = load_path(&self.options.input, &self.options.load).at_stage(Stage::Loader)?;
        let rows_loaded = loaded.table.len();
        if !loaded.skipped.is_empty() {
            warn!("{} malformed rows skipped", loaded.skipped.len());
        }

        let outcome = self.clean(loaded.table);
        let aggregates = summarize(&outcome.table, self.options.top_n);

        let bytes = export(&outcome.table, self.options.load.delimiter).at_stage(Stage::Exporter)?;
        let duration = t_run.elapsed();

        let report = RunReport {
            run_id,
            started_at,
            duration_ms: duration.as_millis() as u64,
            input: self.options.input.display().to_string(),
            output: self.options.output.display().to_string(),
            rows_loaded,
            rows_skipped: loaded.skipped,
            duplicates_removed: outcome.duplicates_removed,
            dates_swapped: outcome.dates_swapped,
            rows_written: outcome.table.len(),
            repairs: outcome.repairs,
            findings: outcome.findings,
            output_sha256: sha256_hex(&bytes),
            aggregates,
        };

        if let Some(path) = &self.options.report {
            let json = report.to_json().at_stage(Stage::Report)?;
            write_atomically(path, &json).at_stage(Stage::Report)?;
            info!("Run report written to {}", path.display());
        }

        if let Err(e) = write_atomically(&self.options.output, &bytes) {
            if let Some(path) = &self.options.report {
                let _ = fs::remove_file(path);
            }
            return Err(StageError::new(Stage::Exporter, e));
        }

        histogram!("order_cleaner_run_duration_seconds").record(duration.as_secs_f64());
        info!(
            "✅ Wrote {} rows to {} in {:?}",
            report.rows_written,
            self.options.output.display(),
            duration
        );

        Ok(report)
    }
}

/// Load an already-clean file and compute the aggregate reports only
#[instrument(skip(load))]
pub fn report_only(
    input: &Path,
    load: &LoadOptions,
    top_n: usize,
) -> Result<AggregateReport, StageError> {
    let loaded = load_path(input, load).at_stage(Stage::Loader)?;
    Ok(summarize(&loaded.table, top_n))
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            load: LoadOptions::default(),
            repair: RepairOptions::default(),
            dedupe_key: Column::OrderId,
            top_n: DEFAULT_TOP_N,
            report: None,
        }
    }
}
