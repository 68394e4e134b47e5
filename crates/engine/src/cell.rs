//! Cell contents and values.
//!
//! A cell holds one of three content variants: nothing, literal text, or a
//! formula. Formula cells memoize their last computed value; the cache is
//! dropped by the sheet whenever anything upstream changes.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::{FormulaError, ParseError};
use crate::formula::{Formula, SheetView};
use crate::position::Position;

/// Marks the remainder of a cell's text as a formula expression.
pub const FORMULA_SIGN: char = '=';
/// A leading apostrophe hides the rest of a text cell from numeric coercion
/// and formula interpretation.
pub const ESCAPE_SIGN: char = '\'';

/// A computed cell value: what `GetValue` produces and what printing shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Renders as the empty string.
    Empty,
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Error(e) => e.fmt(f),
        }
    }
}

/// Content variant of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum CellContent {
    #[default]
    Empty,
    /// Literal text, stored verbatim including any leading escape quote.
    Text(String),
    #[serde(skip)]
    Formula(Formula),
}

impl CellContent {
    /// Classify raw input text into a content variant.
    ///
    /// Empty -> `Empty`; leading `=` with at least one character after it ->
    /// `Formula` (parse failures surface here); everything else -> `Text`.
    /// A lone `"="` is text, not a formula.
    pub fn classify(text: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            Ok(CellContent::Empty)
        } else if text.len() >= 2 && text.starts_with(FORMULA_SIGN) {
            Ok(CellContent::Formula(Formula::parse(&text[1..])?))
        } else {
            Ok(CellContent::Text(text.to_string()))
        }
    }
}

/// One grid slot: content plus the memoized value of a formula.
///
/// Dependency edges are not stored here; the sheet's `DepGraph` keys them by
/// position so that edges survive content swaps and cells stay free of
/// back-pointers.
#[derive(Debug, Default)]
pub struct Cell {
    content: CellContent,
    /// Memoized evaluation result. Only ever filled for formula content.
    cache: RefCell<Option<CellValue>>,
}

impl Cell {
    pub fn new(content: CellContent) -> Self {
        Self {
            content,
            cache: RefCell::new(None),
        }
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    /// Swap in new content, dropping any memoized value.
    pub fn replace_content(&mut self, content: CellContent) {
        self.content = content;
        *self.cache.borrow_mut() = None;
    }

    /// The cell's computed value.
    ///
    /// Empty -> `Empty`; text -> the string minus a leading escape quote;
    /// formula -> the cached value if present, else evaluated against the
    /// sheet and memoized.
    pub fn value<S: SheetView>(&self, sheet: &S) -> CellValue {
        match &self.content {
            CellContent::Empty => CellValue::Empty,
            CellContent::Text(s) => {
                if let Some(rest) = s.strip_prefix(ESCAPE_SIGN) {
                    CellValue::Text(rest.to_string())
                } else {
                    CellValue::Text(s.clone())
                }
            }
            CellContent::Formula(formula) => {
                if let Some(cached) = self.cache.borrow().as_ref() {
                    return cached.clone();
                }
                let value = formula.evaluate(sheet);
                *self.cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The cell's source text.
    ///
    /// Empty -> `""`; text -> stored verbatim (escape quote included);
    /// formula -> `=` plus the canonical expression.
    pub fn text(&self) -> String {
        match &self.content {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(formula) => format!("{}{}", FORMULA_SIGN, formula.expression()),
        }
    }

    /// Valid positions this cell's formula reads; empty for non-formulas.
    pub fn referenced_cells(&self) -> Vec<Position> {
        match &self.content {
            CellContent::Formula(formula) => formula.referenced_cells(),
            _ => Vec::new(),
        }
    }

    pub fn has_cache(&self) -> bool {
        self.cache.borrow().is_some()
    }

    /// Drop the memoized value so the next read re-evaluates.
    pub fn clear_cache(&self) {
        *self.cache.borrow_mut() = None;
    }
}
