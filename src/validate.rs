use std::fs;
use std::path::Path;

use crate::record::FinancialRecord;

/// Revenue above this (in the report's minor-adjusted unit) is assumed to be
/// a year-to-date figure rather than a single quarter.
pub const MAX_QTR_REVENUE: f64 = 50_000_000.0;

/// Load the chronologically preceding record for the same company.
///
/// Siblings of `current_stem` in the company's `json/` directory are ordered
/// by file stem; the predecessor is the greatest stem strictly below the
/// current one. Stem order is assumed to track fiscal chronology, which holds
/// for the date-stamped filenames the reports are published under. Records
/// that cannot be read or parsed count as absent.
pub fn load_previous_quarter(json_dir: &Path, current_stem: &str) -> Option<FinancialRecord> {
    let entries = fs::read_dir(json_dir).ok()?;

    let mut stems: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .filter(|stem| stem.as_str() < current_stem)
        .collect();
    stems.sort();
    let prev_stem = stems.pop()?;

    let prev_path = json_dir.join(format!("{}.json", prev_stem));
    let contents = fs::read_to_string(&prev_path)
        .map_err(|e| log::warn!("could not read {}: {}", prev_path.display(), e))
        .ok()?;
    serde_json::from_str(&contents)
        .map_err(|e| log::warn!("could not parse {}: {}", prev_path.display(), e))
        .ok()
}

/// Detect a cumulative (YTD) extraction and repair it by differencing
/// against the previous quarter.
///
/// No-ops when revenue is absent or within `max_qtr_rev`, when no predecessor
/// record exists, or when the record already carries the correction flag
/// (the correction is one-shot; re-running must not double-subtract).
pub fn post_validate(
    rec: &mut FinancialRecord,
    json_dir: &Path,
    current_stem: &str,
    max_qtr_rev: f64,
) {
    if rec.ytd_qtr_fixed {
        return;
    }
    let Some(revenue) = rec.revenue else {
        return;
    };
    if revenue <= max_qtr_rev {
        return;
    }

    let Some(prev) = load_previous_quarter(json_dir, current_stem) else {
        log::info!(
            "{}: revenue {:.0} exceeds quarterly threshold but no prior quarter found; leaving as-is",
            current_stem,
            revenue
        );
        return;
    };

    rec.subtract_prior(&prev);
    rec.ytd_qtr_fixed = true;
    log::info!(
        "{}: revenue {:.0} looked cumulative; subtracted prior quarter",
        current_stem,
        revenue
    );
}
