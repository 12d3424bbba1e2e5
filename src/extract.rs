use langchain_rust::{
    language_models::llm::LLM,
    llm::{openai::OpenAI, OpenAIConfig},
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use crate::record::FinancialRecord;
use crate::snippet::ReportSnippet;

/// Per-call timeout for the extraction model.
pub const LLM_TIMEOUT_SECS: u64 = 60;

const EXTRACTION_TEMPLATE: &str = r#"You are a financial data extraction assistant. The text below was taken
from one quarterly interim report and contains a consolidated profit-and-loss
table. The column of interest is the single-quarter column under this header:

{header}

Extract the figures for that column only. Ignore any cumulative or
year-to-date columns. Report figures exactly as printed, in the report's own
units, keeping the sign convention used in the table.

Respond with a single JSON object and nothing else, in exactly this shape:

{example}

Use null for any value that cannot be read from the text.

Report text:
{content}"#;

/// Neutral worked example embedded in the prompt; placeholder values avoid
/// biasing the model toward any one company.
fn example_record() -> serde_json::Value {
    json!({
        "company":            "<COMPANY NAME>",
        "symbol":             "<TICKER>",
        "fiscal_year":        "YYYY/YY",
        "quarter":            "Q1",
        "period_end_date":    "YYYY-MM-DD",
        "currency":           "LKR",
        "unit_multiplier":    1000,
        "revenue":            0,
        "cogs":               0,
        "gross_profit":       0,
        "operating_expenses": 0,
        "operating_income":   0,
        "net_income":         0
    })
}

/// Why an extraction produced no usable record. Always carried as data inside
/// `ExtractionOutcome::Failed`; nothing past the extraction boundary raises.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("language model call timed out after {0}s")]
    Timeout(u64),
    #[error("language model call failed: {0}")]
    NetworkFailure(String),
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

/// Result of one extraction attempt. Downstream code pattern-matches instead
/// of probing a record for error keys.
#[derive(Debug)]
pub enum ExtractionOutcome {
    Valid(FinancialRecord),
    Failed {
        raw_output: String,
        error: ExtractionError,
    },
}

impl ExtractionOutcome {
    pub fn record(&self) -> Option<&FinancialRecord> {
        match self {
            ExtractionOutcome::Valid(rec) => Some(rec),
            ExtractionOutcome::Failed { .. } => None,
        }
    }

    pub fn symbol(&self) -> Option<&str> {
        self.record().and_then(|r| r.symbol.as_deref())
    }

    pub fn company(&self) -> Option<&str> {
        self.record().and_then(|r| r.company.as_deref())
    }
}

pub fn render_prompt(snippet: &ReportSnippet) -> String {
    EXTRACTION_TEMPLATE
        .replace(
            "{example}",
            &serde_json::to_string_pretty(&example_record()).unwrap_or_default(),
        )
        .replace("{header}", &snippet.header)
        .replace("{content}", &snippet.text)
}

/// Ask the model for a structured record. Never returns an error: timeouts,
/// transport failures and unparseable responses all come back as
/// `ExtractionOutcome::Failed` so the batch can keep going.
pub async fn extract_record(
    llm: &OpenAI<OpenAIConfig>,
    snippet: &ReportSnippet,
) -> ExtractionOutcome {
    let prompt = render_prompt(snippet);
    log::info!("sending extraction prompt for {}", snippet.source);

    let raw = match timeout(Duration::from_secs(LLM_TIMEOUT_SECS), llm.invoke(&prompt)).await {
        Err(_) => {
            log::error!("LLM call timed out for {}", snippet.source);
            return ExtractionOutcome::Failed {
                raw_output: String::new(),
                error: ExtractionError::Timeout(LLM_TIMEOUT_SECS),
            };
        }
        Ok(Err(e)) => {
            log::error!("LLM call failed for {}: {}", snippet.source, e);
            return ExtractionOutcome::Failed {
                raw_output: String::new(),
                error: ExtractionError::NetworkFailure(e.to_string()),
            };
        }
        Ok(Ok(raw)) => raw.trim().to_string(),
    };
    log::info!("received LLM response for {}", snippet.source);

    match parse_response(&raw) {
        Ok(record) => ExtractionOutcome::Valid(record),
        Err(error) => {
            log::error!("failed to parse response for {}: {}", snippet.source, error);
            ExtractionOutcome::Failed {
                raw_output: raw,
                error,
            }
        }
    }
}

/// Parse the model's raw text into a record.
///
/// Takes the substring from the first `{` to the last `}` and tries a strict
/// JSON parse. On failure, retries once with foreign null/bool literals
/// substituted, since models occasionally emit Python-style dicts.
pub fn parse_response(raw: &str) -> Result<FinancialRecord, ExtractionError> {
    let body = match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start <= end => &raw[start..=end],
        _ => raw,
    };

    serde_json::from_str(body).or_else(|first_err| {
        let relaxed = body
            .replace("None", "null")
            .replace("True", "true")
            .replace("False", "false");
        serde_json::from_str(&relaxed)
            .map_err(|_| ExtractionError::MalformedResponse(first_err.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snippet::ReportSnippet;

    #[test]
    fn parses_json_wrapped_in_prose() {
        let raw = "Sure, here is the data:\n```json\n{\"company\": \"Acme\", \"revenue\": 1200}\n```\nLet me know if you need more.";
        let rec = parse_response(raw).unwrap();
        assert_eq!(rec.company.as_deref(), Some("Acme"));
        assert_eq!(rec.revenue, Some(1200.0));
    }

    #[test]
    fn falls_back_on_python_literals() {
        let raw = "{\"company\": \"Acme\", \"revenue\": 1200, \"net_income\": None}";
        let rec = parse_response(raw).unwrap();
        assert_eq!(rec.revenue, Some(1200.0));
        assert_eq!(rec.net_income, None);
    }

    #[test]
    fn garbage_reports_malformed_response() {
        let err = parse_response("the table was unreadable").unwrap_err();
        assert!(matches!(err, ExtractionError::MalformedResponse(_)));
    }

    #[test]
    fn prompt_embeds_header_example_and_content() {
        let snippet = ReportSnippet {
            source: "q1".to_string(),
            header: "03 months to 31/12/2021".to_string(),
            text: "Revenue 1 2".to_string(),
        };
        let prompt = render_prompt(&snippet);
        assert!(prompt.contains("03 months to 31/12/2021"));
        assert!(prompt.contains("Revenue 1 2"));
        assert!(prompt.contains("\"unit_multiplier\": 1000"));
    }
}
