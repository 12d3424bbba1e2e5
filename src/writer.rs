use anyhow::{Context, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::extract::ExtractionOutcome;
use crate::record::{FailedRecord, FinancialRecord};
use crate::snippet::ReportSnippet;
use crate::utils::dirs::ensure_dir;

/// Ticker-to-company mapping for the covered symbols. A record whose symbol
/// is listed here lands in that company's folder regardless of where the PDF
/// was dropped.
static COMPANY_MAP: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("DIPD.N0000", "Dipped Products"),
        ("REXP.N0000", "Richard Pieris"),
    ])
});

/// One row of the per-company P&L history. Column order is part of the file
/// format and must not change.
#[derive(Debug, Serialize)]
struct PnlRow<'a> {
    company: Option<&'a str>,
    symbol: Option<&'a str>,
    fiscal_year: Option<&'a str>,
    quarter: Option<&'a str>,
    period_end_date: Option<NaiveDate>,
    currency: Option<&'a str>,
    unit_multiplier: Option<f64>,
    revenue: Option<f64>,
    cogs: Option<f64>,
    gross_profit: Option<f64>,
    operating_expenses: Option<f64>,
    operating_income: Option<f64>,
    net_income: Option<f64>,
    ytd_qtr_fixed: bool,
}

impl<'a> From<&'a FinancialRecord> for PnlRow<'a> {
    fn from(rec: &'a FinancialRecord) -> Self {
        PnlRow {
            company: rec.company.as_deref(),
            symbol: rec.symbol.as_deref(),
            fiscal_year: rec.fiscal_year.as_deref(),
            quarter: rec.quarter.as_deref(),
            period_end_date: rec.period_end_date,
            currency: rec.currency.as_deref(),
            unit_multiplier: rec.unit_multiplier,
            revenue: rec.revenue,
            cogs: rec.cogs,
            gross_profit: rec.gross_profit,
            operating_expenses: rec.operating_expenses,
            operating_income: rec.operating_income,
            net_income: rec.net_income,
            ytd_qtr_fixed: rec.ytd_qtr_fixed,
        }
    }
}

/// Pick the destination company folder for a record.
///
/// Priority: ticker mapping, then the PDF's parent directory name, then the
/// model's self-reported company name, then a literal "Unknown" bucket.
pub fn resolve_company(
    symbol: Option<&str>,
    reported_company: Option<&str>,
    pdf_path: &Path,
) -> String {
    if let Some(mapped) = symbol
        .map(str::trim)
        .and_then(|s| COMPANY_MAP.get(s))
    {
        return (*mapped).to_string();
    }

    let folder = pdf_path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().trim().to_string())
        .unwrap_or_default();
    if !folder.is_empty() {
        return folder;
    }

    if let Some(company) = reported_company.map(str::trim).filter(|c| !c.is_empty()) {
        return company.to_string();
    }

    "Unknown".to_string()
}

/// Persist one document's artifacts under the company folder: the audit
/// snippet text, the structured record (or its failure sentinel), and a row
/// in the append-only P&L history for valid records.
///
/// The JSON file is named after the PDF stem and overwritten on re-runs;
/// the CSV append is intentional history, not deduplicated.
pub fn write_outputs(
    outcome: &ExtractionOutcome,
    snippet: &ReportSnippet,
    company_dir: &Path,
) -> Result<()> {
    let json_dir = company_dir.join("json");
    let csv_dir = company_dir.join("csv");
    let txt_dir = company_dir.join("txt");
    ensure_dir(&json_dir)?;
    ensure_dir(&csv_dir)?;
    ensure_dir(&txt_dir)?;

    let txt_path = txt_dir.join(format!("{}.txt", snippet.source));
    fs::write(&txt_path, &snippet.text)
        .with_context(|| format!("failed to write {}", txt_path.display()))?;
    log::info!("raw text saved -> {}", txt_path.display());

    let json_path = json_dir.join(format!("{}.json", snippet.source));
    let json_body = match outcome {
        ExtractionOutcome::Valid(rec) => serde_json::to_string_pretty(rec)?,
        ExtractionOutcome::Failed { raw_output, error } => {
            let sentinel = FailedRecord {
                company: company_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                symbol: String::new(),
                raw_output: raw_output.clone(),
                parse_error: error.to_string(),
            };
            serde_json::to_string_pretty(&sentinel)?
        }
    };
    fs::write(&json_path, json_body)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    log::info!("JSON saved -> {}", json_path.display());

    if let ExtractionOutcome::Valid(rec) = outcome {
        let csv_path = csv_dir.join("pnl.csv");
        append_history_row(rec, &csv_path)?;
        log::info!("row appended -> {}", csv_path.display());
    }

    Ok(())
}

fn append_history_row(rec: &FinancialRecord, csv_path: &Path) -> Result<()> {
    let write_header = !csv_path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    writer.serialize(PnlRow::from(rec))?;
    writer.flush()?;
    Ok(())
}
