// 📄 Output Formats
// Rendering of bulk card results for the presentation layer

use crate::error::{ForgeError, Result};
use crate::generator::CardRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Numbers only, one per line
    #[default]
    Plain,
    /// `number|MM|YYYY|cvv`
    Pipe,
    /// Headered CSV
    Csv,
    /// Pretty-printed JSON array
    Json,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Pipe => "pipe",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    pub fn render(&self, cards: &[CardRecord]) -> Result<String> {
        match self {
            OutputFormat::Plain => Ok(cards
                .iter()
                .map(|c| c.number.as_str())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Pipe => Ok(cards
                .iter()
                .map(|c| format!("{}|{:02}|{}|{}", c.number, c.exp_month, c.exp_year, c.cvv))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Csv => render_csv(cards),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(cards)?),
        }
    }
}

fn render_csv(cards: &[CardRecord]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let io_err = |e: csv::Error| ForgeError::Persistence(format!("csv rendering failed: {}", e));

    writer
        .write_record(["number", "exp_month", "exp_year", "cvv", "card_type"])
        .map_err(io_err)?;

    for card in cards {
        writer
            .write_record([
                card.number.clone(),
                format!("{:02}", card.exp_month),
                card.exp_year.to_string(),
                card.cvv.clone(),
                card.card_type.as_str().to_string(),
            ])
            .map_err(io_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ForgeError::Persistence(format!("csv rendering failed: {}", e)))?;

    String::from_utf8(bytes)
        .map_err(|e| ForgeError::Persistence(format!("csv rendering failed: {}", e)))
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(OutputFormat::Plain),
            "pipe" => Ok(OutputFormat::Pipe),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(ForgeError::Config(format!(
                "unknown output format '{}' (expected plain, pipe, csv or json)",
                other
            ))),
        }
    }
}
