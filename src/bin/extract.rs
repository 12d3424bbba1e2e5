use anyhow::{Context, Result};
use langchain_rust::llm::{openai::OpenAI, OpenAIConfig};
use pnlchat::{
    core::{config::PnlConfig, init},
    extract::{self, ExtractionOutcome},
    pdf,
    snippet::ReportSnippet,
    validate, writer,
};
use std::path::{Path, PathBuf};

/// Batch extractor: walks the raw-reports tree, cuts the quarterly P&L
/// snippet out of each PDF, asks the model for a structured record, repairs
/// YTD-vs-quarter mixups against the company's history, and persists
/// JSON + CSV + audit text per document. One bad document never stops the
/// batch; PDFs are processed in sorted path order so each quarter is written
/// before the next one validates against it.
#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = PnlConfig::from_env()?;
    let llm = init::initialize_openai(&config);

    let raw_dir = config.raw_dir();
    let mut pdfs = Vec::new();
    collect_pdfs(&raw_dir, &mut pdfs)
        .with_context(|| format!("failed to scan {}", raw_dir.display()))?;
    pdfs.sort();

    let total = pdfs.len();
    let mut written = 0usize;
    for pdf_path in &pdfs {
        log::info!("--- processing {} ---", pdf_path.display());
        match process_pdf(&llm, &config, pdf_path).await {
            Ok(()) => written += 1,
            Err(e) => log::error!("skipping {}: {:#}", pdf_path.display(), e),
        }
    }

    log::info!(
        "done: wrote {}/{} PDFs under {}",
        written,
        total,
        config.interim_dir().display()
    );
    Ok(())
}

fn collect_pdfs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_pdfs(&path, out)?;
        } else if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        {
            out.push(path);
        }
    }
    Ok(())
}

async fn process_pdf(
    llm: &OpenAI<OpenAIConfig>,
    config: &PnlConfig,
    pdf_path: &Path,
) -> Result<()> {
    let stem = pdf_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = pdf::select_pnl_text(pdf_path)?;
    let snippet = ReportSnippet::from_text(&stem, &text);
    let mut outcome = extract::extract_record(llm, &snippet).await;

    if let Some(rec) = outcome.record() {
        if let Some(gap) = rec.gross_profit_gap() {
            if gap.abs() > 1.0 {
                log::warn!(
                    "gross profit inconsistency in {}: rev - cogs differs from gp by {:.0}",
                    stem,
                    gap
                );
            }
        }
        let missing = rec.missing_fields();
        if !missing.is_empty() {
            log::error!(
                "missing fields {:?} in {} -- inspect the record for manual correction",
                missing,
                stem
            );
        }
    }

    let company = writer::resolve_company(outcome.symbol(), outcome.company(), pdf_path);
    let company_dir = config.interim_dir().join(&company);

    if let ExtractionOutcome::Valid(rec) = &mut outcome {
        validate::post_validate(rec, &company_dir.join("json"), &stem, config.max_qtr_revenue);
    }

    writer::write_outputs(&outcome, &snippet, &company_dir)
}
