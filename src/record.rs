use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One quarter's profit-and-loss figures as extracted from an interim report.
///
/// Every field is optional until the model fills it in; `missing_fields`
/// reports which of the required figures are still absent. The record is
/// mutated in place by `validate::post_validate` and then persisted once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub company: Option<String>,
    pub symbol: Option<String>,
    pub fiscal_year: Option<String>,
    pub quarter: Option<String>,
    #[serde(default, with = "lenient_date")]
    pub period_end_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub unit_multiplier: Option<f64>,
    pub revenue: Option<f64>,
    pub cogs: Option<f64>,
    pub gross_profit: Option<f64>,
    pub operating_expenses: Option<f64>,
    pub operating_income: Option<f64>,
    pub net_income: Option<f64>,
    /// Set once by the validator when a YTD figure was converted back to a
    /// single quarter. Absent from the JSON until then.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ytd_qtr_fixed: bool,
}

impl FinancialRecord {
    /// Required numeric fields that are still unset.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("revenue", self.revenue),
            ("cogs", self.cogs),
            ("gross_profit", self.gross_profit),
            ("operating_expenses", self.operating_expenses),
            ("operating_income", self.operating_income),
            ("net_income", self.net_income),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.is_none().then_some(name))
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// revenue - cogs - gross_profit, when all three are present. Anything
    /// beyond one reporting unit indicates the model misread the table.
    pub fn gross_profit_gap(&self) -> Option<f64> {
        match (self.revenue, self.cogs, self.gross_profit) {
            (Some(rev), Some(cogs), Some(gp)) => Some(rev - cogs - gp),
            _ => None,
        }
    }

    /// Replace each numeric field with (self - prev) wherever both sides are
    /// numeric. Fields missing on either side are left untouched.
    pub fn subtract_prior(&mut self, prev: &Self) {
        fn diff(curr: &mut Option<f64>, prev: Option<f64>) {
            if let (Some(c), Some(p)) = (*curr, prev) {
                *curr = Some(c - p);
            }
        }
        diff(&mut self.revenue, prev.revenue);
        diff(&mut self.cogs, prev.cogs);
        diff(&mut self.gross_profit, prev.gross_profit);
        diff(&mut self.operating_expenses, prev.operating_expenses);
        diff(&mut self.operating_income, prev.operating_income);
        diff(&mut self.net_income, prev.net_income);
    }
}

/// Sentinel persisted in place of a record when extraction fails, keeping the
/// raw model output around for manual repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub company: String,
    pub symbol: String,
    pub raw_output: String,
    pub parse_error: String,
}

/// Serde helper for `period_end_date`: serialized as YYYY-MM-DD, and a
/// malformed date in model output deserializes to `None` instead of failing
/// the whole record.
pub mod lenient_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format(FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), FORMAT).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_unset_figures() {
        let rec = FinancialRecord {
            revenue: Some(100.0),
            cogs: Some(40.0),
            ..Default::default()
        };
        assert_eq!(
            rec.missing_fields(),
            vec![
                "gross_profit",
                "operating_expenses",
                "operating_income",
                "net_income"
            ]
        );
        assert!(!rec.is_complete());
    }

    #[test]
    fn subtract_prior_skips_missing_sides() {
        let mut curr = FinancialRecord {
            revenue: Some(1000.0),
            cogs: Some(400.0),
            net_income: None,
            ..Default::default()
        };
        let prev = FinancialRecord {
            revenue: Some(100.0),
            cogs: None,
            net_income: Some(50.0),
            ..Default::default()
        };
        curr.subtract_prior(&prev);
        assert_eq!(curr.revenue, Some(900.0));
        assert_eq!(curr.cogs, Some(400.0));
        assert_eq!(curr.net_income, None);
    }

    #[test]
    fn correction_flag_absent_until_set() {
        let rec = FinancialRecord::default();
        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("ytd_qtr_fixed"));

        let fixed = FinancialRecord {
            ytd_qtr_fixed: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&fixed).unwrap();
        assert!(json.contains("\"ytd_qtr_fixed\":true"));
    }

    #[test]
    fn malformed_period_end_date_parses_to_none() {
        let rec: FinancialRecord =
            serde_json::from_str(r#"{"period_end_date": "Q3 FY21"}"#).unwrap();
        assert_eq!(rec.period_end_date, None);

        let rec: FinancialRecord =
            serde_json::from_str(r#"{"period_end_date": "2021-12-31"}"#).unwrap();
        assert_eq!(
            rec.period_end_date,
            NaiveDate::from_ymd_opt(2021, 12, 31)
        );
    }
}
