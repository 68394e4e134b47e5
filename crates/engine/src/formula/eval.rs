// Formula evaluator - walks the expression tree against a position lookup

use crate::error::FormulaError;
use crate::position::Position;

use super::parser::{Expr, Op, UnaryOp};

/// Evaluate an expression.
///
/// `lookup` resolves a referenced position to a number and may raise
/// `#REF!` or `#VALUE!`; those propagate out unchanged. Every arithmetic
/// step checks its result for finiteness: `±inf` or `NaN` raises `#DIV/0!`.
pub fn evaluate<F>(expr: &Expr, lookup: &F) -> Result<f64, FormulaError>
where
    F: Fn(Position) -> Result<f64, FormulaError>,
{
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::CellRef(pos) => lookup(*pos),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, lookup)?;
            Ok(match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            })
        }
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, lookup)?;
            let rhs = evaluate(right, lookup)?;
            let result = match op {
                Op::Add => lhs + rhs,
                Op::Sub => lhs - rhs,
                Op::Mul => lhs * rhs,
                Op::Div => lhs / rhs,
            };
            if result.is_finite() {
                Ok(result)
            } else {
                Err(FormulaError::Div0)
            }
        }
    }
}
