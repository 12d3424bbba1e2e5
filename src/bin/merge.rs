use anyhow::{Context, Result};
use pnlchat::utils::{dirs::ensure_dir, slugify};
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

/// Merge each company's per-PDF record files into one `all.json` array under
/// `export/<slug>/`, for the dashboard to serve statically.
fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let data_dir =
        PathBuf::from(std::env::var("PNL_DATA_DIR").unwrap_or_else(|_| "data".to_string()));
    let interim_dir = data_dir.join("interim");
    let export_dir = data_dir.join("export");

    let mut company_dirs: Vec<_> = fs::read_dir(&interim_dir)
        .with_context(|| format!("failed to read {}", interim_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    company_dirs.sort();

    for company_dir in &company_dirs {
        let company = company_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let json_dir = company_dir.join("json");
        if !json_dir.is_dir() {
            log::warn!("no records for {}; skipping", company);
            continue;
        }

        let mut files: Vec<_> = fs::read_dir(&json_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut merged: Vec<Value> = Vec::new();
        for file in &files {
            match fs::read_to_string(file)
                .map_err(anyhow::Error::from)
                .and_then(|s| serde_json::from_str::<Value>(&s).map_err(Into::into))
            {
                Ok(value) => merged.push(value),
                Err(e) => log::warn!("skipping {}: {:#}", file.display(), e),
            }
        }

        let out_dir = export_dir.join(slugify(&company));
        ensure_dir(&out_dir)?;
        let out_file = out_dir.join("all.json");
        fs::write(&out_file, serde_json::to_string_pretty(&merged)?)?;
        log::info!("wrote {} records -> {}", merged.len(), out_file.display());
    }

    Ok(())
}
