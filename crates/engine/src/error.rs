//! Error types.
//!
//! Two layers, deliberately kept apart:
//! - [`FormulaError`] is a *value*: it flows through evaluation, gets cached
//!   like a number, and prints as a fixed token (`#REF!`, `#VALUE!`,
//!   `#DIV/0!`).
//! - [`SheetError`] is an *operation failure*: invalid position, formula
//!   syntax error, or a rejected circular reference. These surface from the
//!   sheet API before any state is mutated.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Evaluation failure carried inside a cell value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    /// Reference to a position outside the addressable grid.
    Ref,
    /// A non-numeric, non-empty string used as an arithmetic operand.
    Value,
    /// Division by zero, or any arithmetic step producing a non-finite result.
    Div0,
}

impl FormulaError {
    /// The fixed display token for this error kind.
    pub fn as_token(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#DIV/0!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Formula syntax error from the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "formula is syntactically incorrect: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Report produced when a candidate assignment would close a cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Cells participating in the would-be cycle. May be a subset for large
    /// cycles.
    pub cells: Vec<Position>,
    /// Human-readable description.
    pub message: String,
}

impl CycleReport {
    /// Report for a cell whose formula references its own position.
    pub fn self_reference(cell: Position) -> Self {
        Self {
            cells: vec![cell],
            message: format!("Cell {} references itself", cell),
        }
    }

    /// Report for a multi-cell cycle.
    pub fn cycle(cells: Vec<Position>) -> Self {
        let names: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let message = format!("Circular reference: {}", names.join(" -> "));
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CycleReport {}

/// Failure of a sheet operation.
#[derive(Clone, Debug, PartialEq)]
pub enum SheetError {
    /// The position is outside the addressable grid.
    InvalidPosition(Position),
    /// The text looked like a formula but failed to parse.
    Formula(ParseError),
    /// The assignment would introduce a circular reference. Nothing was
    /// mutated.
    CircularDependency(CycleReport),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "invalid cell position {}", pos)
            }
            SheetError::Formula(err) => err.fmt(f),
            SheetError::CircularDependency(report) => report.fmt(f),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::InvalidPosition(_) => None,
            SheetError::Formula(err) => Some(err),
            SheetError::CircularDependency(report) => Some(report),
        }
    }
}

impl From<ParseError> for SheetError {
    fn from(err: ParseError) -> Self {
        SheetError::Formula(err)
    }
}

impl From<CycleReport> for SheetError {
    fn from(report: CycleReport) -> Self {
        SheetError::CircularDependency(report)
    }
}
