// Formula parsing and evaluation

pub mod eval;
pub mod parser;

use crate::cell::CellValue;
use crate::error::{FormulaError, ParseError};
use crate::position::Position;

use self::parser::Expr;

/// What a formula needs from its host: the current value of a cell, or
/// `None` where no cell has been materialized.
pub trait SheetView {
    fn cell_value(&self, pos: Position) -> Option<CellValue>;
}

/// A parsed formula: one expression tree plus reference bookkeeping.
///
/// Constructed from the text after the leading `=`.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    expr: Expr,
}

impl Formula {
    /// Parse a formula expression (source text without the `=` prefix).
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        Ok(Self {
            expr: parser::parse(expression)?,
        })
    }

    /// Evaluate against the current sheet state.
    ///
    /// Referenced cells resolve as: invalid position -> `#REF!`; missing
    /// cell or empty value -> `0.0`; number -> itself; text parseable in
    /// full as a number -> that number; any other text -> `#VALUE!`; a
    /// stored error -> that same error. Errors come back as the result
    /// value, never as a panic or an API error.
    pub fn evaluate<S: SheetView>(&self, sheet: &S) -> CellValue {
        let lookup = |pos: Position| -> Result<f64, FormulaError> {
            if !pos.is_valid() {
                return Err(FormulaError::Ref);
            }
            let Some(value) = sheet.cell_value(pos) else {
                return Ok(0.0);
            };
            match value {
                CellValue::Empty => Ok(0.0),
                CellValue::Number(n) => Ok(n),
                CellValue::Text(s) => {
                    if s.is_empty() {
                        Ok(0.0)
                    } else {
                        s.parse::<f64>().map_err(|_| FormulaError::Value)
                    }
                }
                CellValue::Error(e) => Err(e),
            }
        };
        match eval::evaluate(&self.expr, &lookup) {
            Ok(n) => CellValue::Number(n),
            Err(e) => CellValue::Error(e),
        }
    }

    /// Canonical printed form of the expression (no leading `=`).
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Valid referenced positions, deduplicated, sorted ascending.
    ///
    /// Out-of-range references are dropped here; they still raise `#REF!`
    /// when the formula is evaluated.
    pub fn referenced_cells(&self) -> Vec<Position> {
        let mut cells: Vec<Position> = self
            .expr
            .positions()
            .into_iter()
            .filter(Position::is_valid)
            .collect();
        cells.sort();
        cells.dedup();
        cells
    }
}
