//! Settlement calculator.

use dealroom_db::TermSnapshot;
use serde::Serialize;
use thiserror::Error;

use crate::sheet::{TermSheet, TermValues};

/// The formula could not produce a number. Shown in the settlement view;
/// negotiation state is unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ComputationError {
    #[error("Term '{0}' has no value")]
    MissingValue(String),

    #[error("Settlement undefined: division by zero from term '{term}'")]
    UndefinedDivision { term: String },

    #[error("Settlement is not a finite number")]
    NonFinite,
}

/// Result of a settlement attempt over one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Settlement {
    /// Not every term is approved yet.
    Pending { approved: usize, total: usize },
    Settled { value: f64 },
}

impl Settlement {
    pub fn is_settled(&self) -> bool {
        matches!(self, Settlement::Settled { .. })
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Settlement::Settled { value } => Some(*value),
            Settlement::Pending { .. } => None,
        }
    }
}

/// Compute the settlement for `snapshot`.
///
/// Returns `Pending` unless every term in the snapshot is approved; the
/// formula only runs on a fully approved set.
pub fn calculate_settlement(
    snapshot: &TermSnapshot,
    sheet: &TermSheet,
) -> Result<Settlement, ComputationError> {
    let total = snapshot.len();
    let approved = snapshot.approved_count();
    if total == 0 || approved < total {
        return Ok(Settlement::Pending { approved, total });
    }

    let values = TermValues::from_snapshot(snapshot);
    let value = sheet.evaluate(&values)?;
    Ok(Settlement::Settled { value })
}

/// Everything needed to show the outcome of a negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementView {
    pub game: String,
    pub output_unit: String,
    pub snapshot: TermSnapshot,
    pub result: Result<Settlement, ComputationError>,
}

impl SettlementView {
    pub fn compute(sheet: &TermSheet, snapshot: TermSnapshot) -> Self {
        let result = calculate_settlement(&snapshot, sheet);
        Self {
            game: sheet.name().to_string(),
            output_unit: sheet.output_unit().to_string(),
            snapshot,
            result,
        }
    }

    /// Human-readable outcome: amount, pending count, or the error.
    pub fn display_value(&self) -> String {
        match &self.result {
            Ok(Settlement::Settled { value }) => format_with_unit(*value, &self.output_unit),
            Ok(Settlement::Pending { approved, total }) => {
                format!("Pending ({approved}/{total} approved)")
            }
            Err(e) => format!("Error: {e}"),
        }
    }
}

/// Two decimals, no grouping: `454.55`.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Two decimals with thousands separators: `1,234.57`.
pub fn format_grouped(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// `$1,234.57` for currency, `12.50 x` for other units, plain when empty.
pub fn format_with_unit(value: f64, unit: &str) -> String {
    match unit {
        "" => format_grouped(value),
        "$" => {
            let grouped = format_grouped(value);
            match grouped.strip_prefix('-') {
                Some(rest) => format!("-${rest}"),
                None => format!("${grouped}"),
            }
        }
        other => format!("{} {}", format_grouped(value), other),
    }
}
