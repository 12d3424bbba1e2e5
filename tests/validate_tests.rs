use pnlchat::record::FinancialRecord;
use pnlchat::validate::post_validate;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn company_json_dir(root: &Path) -> PathBuf {
    let dir = root.join("company").join("json");
    fs::create_dir_all(&dir).unwrap();
    dir
}

const PREV: &str = r#"{
    "revenue": 1000,
    "cogs": 400,
    "gross_profit": 600,
    "operating_expenses": 200,
    "operating_income": 400,
    "net_income": 300
}"#;

const CURR: &str = r#"{
    "revenue": 150000000,
    "cogs": -60000000,
    "gross_profit": 90000000,
    "operating_expenses": -30000000,
    "operating_income": 60000000,
    "net_income": 40000000
}"#;

#[test]
fn subtracts_previous_quarter_when_revenue_looks_cumulative() {
    let tmp = tempdir().unwrap();
    let json_dir = company_json_dir(tmp.path());
    fs::write(json_dir.join("q1.json"), PREV).unwrap();
    fs::write(json_dir.join("q2.json"), CURR).unwrap();

    let mut rec: FinancialRecord = serde_json::from_str(CURR).unwrap();
    post_validate(&mut rec, &json_dir, "q2", 1_000_000.0);

    assert_eq!(rec.revenue, Some(149_999_000.0));
    assert_eq!(rec.cogs, Some(-60_000_400.0));
    assert_eq!(rec.gross_profit, Some(89_999_400.0));
    assert_eq!(rec.operating_expenses, Some(-30_000_200.0));
    assert_eq!(rec.operating_income, Some(59_999_600.0));
    assert_eq!(rec.net_income, Some(39_999_700.0));
    assert!(rec.ytd_qtr_fixed);
}

#[test]
fn leaves_record_alone_without_a_predecessor() {
    let tmp = tempdir().unwrap();
    let json_dir = company_json_dir(tmp.path());
    fs::write(json_dir.join("only.json"), r#"{"revenue": 2000000}"#).unwrap();

    let mut rec = FinancialRecord {
        revenue: Some(2_000_000.0),
        ..Default::default()
    };
    post_validate(&mut rec, &json_dir, "only", 1_000_000.0);

    assert_eq!(rec.revenue, Some(2_000_000.0));
    assert!(!rec.ytd_qtr_fixed);
}

#[test]
fn revenue_below_threshold_is_untouched() {
    let tmp = tempdir().unwrap();
    let json_dir = company_json_dir(tmp.path());
    fs::write(json_dir.join("q1.json"), PREV).unwrap();

    let mut rec = FinancialRecord {
        revenue: Some(900_000.0),
        cogs: Some(-300_000.0),
        ..Default::default()
    };
    post_validate(&mut rec, &json_dir, "q2", 1_000_000.0);

    assert_eq!(rec.revenue, Some(900_000.0));
    assert_eq!(rec.cogs, Some(-300_000.0));
    assert!(!rec.ytd_qtr_fixed);
}

#[test]
fn correction_is_one_shot() {
    let tmp = tempdir().unwrap();
    let json_dir = company_json_dir(tmp.path());
    fs::write(json_dir.join("q1.json"), PREV).unwrap();
    fs::write(json_dir.join("q2.json"), CURR).unwrap();

    let mut rec: FinancialRecord = serde_json::from_str(CURR).unwrap();
    post_validate(&mut rec, &json_dir, "q2", 1_000_000.0);
    let corrected = rec.clone();

    // A second pass must not subtract again.
    post_validate(&mut rec, &json_dir, "q2", 1_000_000.0);
    assert_eq!(rec, corrected);
}

#[test]
fn missing_revenue_is_a_silent_no_op() {
    let tmp = tempdir().unwrap();
    let json_dir = company_json_dir(tmp.path());
    fs::write(json_dir.join("q1.json"), PREV).unwrap();

    let mut rec = FinancialRecord {
        cogs: Some(-300_000.0),
        ..Default::default()
    };
    post_validate(&mut rec, &json_dir, "q2", 1_000_000.0);
    assert_eq!(rec.cogs, Some(-300_000.0));
    assert!(!rec.ytd_qtr_fixed);
}
