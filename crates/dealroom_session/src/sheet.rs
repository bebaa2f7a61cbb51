//! Term sheets: the fixed set of terms a game negotiates and the formula
//! that turns them into a settlement.

use std::collections::HashMap;
use std::fmt;

use dealroom_db::{TermSnapshot, TermSpec};

use crate::settlement::ComputationError;

/// Settlement formula over the approved term values.
pub type SettlementFormula = fn(&TermValues) -> Result<f64, ComputationError>;

pub const VALUATION: &str = "valuation";

const EBITDA: &str = "EBITDA";
const INTEREST_RATE: &str = "Interest Rate";
const MULTIPLE: &str = "Multiple";
const FACTOR_SCORE: &str = "Factor Score";

/// Values of a snapshot keyed by term name.
#[derive(Debug, Clone, Default)]
pub struct TermValues {
    values: HashMap<String, f64>,
}

impl TermValues {
    pub fn from_snapshot(snapshot: &TermSnapshot) -> Self {
        let values = snapshot
            .iter()
            .filter_map(|t| t.value.map(|v| (t.name.clone(), v)))
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Result<f64, ComputationError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| ComputationError::MissingValue(name.to_string()))
    }

    /// `numerator / denominator`, where `denominator` was derived from the
    /// term `term`. A zero or non-finite denominator is an error.
    pub fn checked_div(
        numerator: f64,
        denominator: f64,
        term: &str,
    ) -> Result<f64, ComputationError> {
        if denominator == 0.0 || !denominator.is_finite() {
            return Err(ComputationError::UndefinedDivision {
                term: term.to_string(),
            });
        }
        Ok(numerator / denominator)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for TermValues {
    fn from(pairs: [(&str, f64); N]) -> Self {
        Self {
            values: pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        }
    }
}

/// A negotiable game.
#[derive(Clone)]
pub struct TermSheet {
    name: String,
    terms: Vec<TermSpec>,
    output_unit: String,
    formula: SettlementFormula,
}

impl TermSheet {
    pub fn new(
        name: impl Into<String>,
        terms: Vec<TermSpec>,
        output_unit: impl Into<String>,
        formula: SettlementFormula,
    ) -> Self {
        Self {
            name: name.into(),
            terms,
            output_unit: output_unit.into(),
            formula,
        }
    }

    /// Company valuation: `EBITDA * Multiple * Factor Score / (1 + Interest Rate)`.
    pub fn valuation() -> Self {
        Self::new(
            VALUATION,
            vec![
                TermSpec::new(EBITDA, "$"),
                TermSpec::new(INTEREST_RATE, "%"),
                TermSpec::new(MULTIPLE, "x"),
                TermSpec::new(FACTOR_SCORE, "x"),
            ],
            "$",
            valuation_formula,
        )
    }

    /// Look up a built-in sheet.
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            VALUATION => Some(Self::valuation()),
            _ => None,
        }
    }

    /// Built-in sheets. Only games negotiated as a fixed set of approvable
    /// terms fit this flow; share bidding has no term set and is not listed.
    pub fn available() -> &'static [&'static str] {
        &[VALUATION]
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[TermSpec] {
        &self.terms
    }

    pub fn output_unit(&self) -> &str {
        &self.output_unit
    }

    pub fn evaluate(&self, values: &TermValues) -> Result<f64, ComputationError> {
        let value = (self.formula)(values)?;
        if !value.is_finite() {
            return Err(ComputationError::NonFinite);
        }
        Ok(value)
    }
}

impl fmt::Debug for TermSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermSheet")
            .field("name", &self.name)
            .field("terms", &self.terms)
            .field("output_unit", &self.output_unit)
            .finish_non_exhaustive()
    }
}

fn valuation_formula(v: &TermValues) -> Result<f64, ComputationError> {
    let ebitda = v.get(EBITDA)?;
    let rate = v.get(INTEREST_RATE)?;
    let multiple = v.get(MULTIPLE)?;
    let factor = v.get(FACTOR_SCORE)?;
    TermValues::checked_div(ebitda * multiple * factor, 1.0 + rate, INTEREST_RATE)
}
