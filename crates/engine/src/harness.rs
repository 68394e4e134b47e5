//! Test harness for sheet operations with invariant checking.
//!
//! This module provides `SheetHarness`, a wrapper around `Sheet` that applies
//! scripted operations and re-verifies the engine's structural invariants
//! after every single op:
//!
//! - bidirectional graph consistency (preds/succs mirror each other)
//! - acyclicity of the stored graph
//! - every position the graph knows about is materialized in the grid
//! - text and empty cells carry no outgoing edges and no cache
//! - a cached formula cell never sits above an uncached formula precedent

use rustc_hash::FxHashSet;

use crate::cell::CellContent;
use crate::error::SheetError;
use crate::position::Position;
use crate::sheet::Sheet;

/// Operation to apply to a sheet.
#[derive(Debug, Clone)]
pub enum Op {
    /// Set a cell from raw text (auto-detects formulas).
    Set { pos: &'static str, text: &'static str },
    /// Clear a cell.
    Clear { pos: &'static str },
    /// Read a cell's value (exercises caching paths).
    Read { pos: &'static str },
}

/// Test harness wrapping a Sheet with invariant verification.
pub struct SheetHarness {
    sheet: Sheet,
}

impl SheetHarness {
    pub fn new() -> Self {
        Self {
            sheet: Sheet::new(),
        }
    }

    pub fn sheet(&self) -> &Sheet {
        &self.sheet
    }

    /// Apply one op, then check every invariant.
    pub fn apply(&mut self, op: &Op) -> Result<(), SheetError> {
        let result = match op {
            Op::Set { pos, text } => self.sheet.set_cell(parse(pos), text),
            Op::Clear { pos } => self.sheet.clear_cell(parse(pos)),
            Op::Read { pos } => {
                if let Some(cell) = self.sheet.cell(parse(pos))? {
                    let _ = cell.value(&self.sheet);
                }
                Ok(())
            }
        };
        self.assert_invariants();
        result
    }

    /// Apply a script of ops, ignoring individual rejections (rejections must
    /// still leave the sheet consistent).
    pub fn apply_all(&mut self, ops: &[Op]) -> usize {
        let mut applied = 0;
        for op in ops {
            if self.apply(op).is_ok() {
                applied += 1;
            }
        }
        applied
    }

    /// Panics if any structural invariant is violated.
    pub fn assert_invariants(&self) {
        let graph = self.sheet.graph();
        graph.assert_consistent();

        assert!(
            graph.topo_order().is_ok(),
            "stored dependency graph must stay acyclic"
        );

        // Everything the graph references must be materialized.
        for formula_cell in graph.formula_cells() {
            assert!(
                self.sheet.cell(formula_cell).unwrap().is_some(),
                "graph formula cell {} missing from grid",
                formula_cell
            );
            for pred in graph.precedents(formula_cell) {
                assert!(
                    self.sheet.cell(pred).unwrap().is_some(),
                    "referenced cell {} missing from grid",
                    pred
                );
            }
        }

        let formula_cells: FxHashSet<Position> = graph.formula_cells().collect();
        for (pos, cell) in self.sheet.cells_iter() {
            match cell.content() {
                CellContent::Formula(_) => {
                    // A cached formula never sits above an uncached formula
                    // precedent (the invalidation discipline depends on it).
                    if cell.has_cache() {
                        for pred in graph.precedents(pos) {
                            if formula_cells.contains(&pred) {
                                let pred_cell =
                                    self.sheet.cell(pred).unwrap().expect("checked above");
                                assert!(
                                    pred_cell.has_cache(),
                                    "cached {} has uncached precedent {}",
                                    pos,
                                    pred
                                );
                            }
                        }
                    }
                }
                CellContent::Empty | CellContent::Text(_) => {
                    assert_eq!(
                        graph.precedents(pos).count(),
                        0,
                        "non-formula cell {} has outgoing edges",
                        pos
                    );
                    assert!(!cell.has_cache(), "non-formula cell {} has a cache", pos);
                }
            }
        }
    }
}

fn parse(name: &str) -> Position {
    Position::parse(name).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pos: &'static str, text: &'static str) -> Op {
        Op::Set { pos, text }
    }

    fn clear(pos: &'static str) -> Op {
        Op::Clear { pos }
    }

    fn read(pos: &'static str) -> Op {
        Op::Read { pos }
    }

    #[test]
    fn test_build_and_read_chain() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "1"),
            set("B1", "=A1+1"),
            set("C1", "=B1+1"),
            read("C1"),
            set("A1", "5"),
            read("C1"),
        ]);
        assert_eq!(applied, 6);
    }

    #[test]
    fn test_rejected_cycle_leaves_consistent_state() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "=B1"),
            set("B1", "=A1"), // rejected
            read("A1"),
            set("B1", "7"),
            read("A1"),
        ]);
        assert_eq!(applied, 4);
    }

    #[test]
    fn test_self_reference_rejected_consistently() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[set("A1", "=A1"), set("A1", "=2*3"), read("A1")]);
        assert_eq!(applied, 2);
    }

    #[test]
    fn test_clear_and_rebuild() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "10"),
            set("B1", "=A1"),
            read("B1"),
            clear("B1"),
            clear("A1"),
            set("B1", "=A1*2"),
            read("B1"),
        ]);
        assert_eq!(applied, 7);
    }

    #[test]
    fn test_content_transitions_keep_invariants() {
        // Every variant transition: empty -> formula -> text -> formula -> empty
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "=B1+C1"),
            read("A1"),
            set("A1", "'quoted"),
            set("A1", "=D1"),
            read("A1"),
            set("A1", ""),
        ]);
        assert_eq!(applied, 6);
    }

    #[test]
    fn test_diamond_with_updates() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "1"),
            set("B1", "=A1"),
            set("C1", "=A1"),
            set("D1", "=B1+C1"),
            read("D1"),
            set("A1", "2"),
            read("D1"),
            clear("A1"),
            read("D1"),
        ]);
        assert_eq!(applied, 9);
    }

    #[test]
    fn test_parse_failures_do_not_corrupt() {
        let mut h = SheetHarness::new();
        let applied = h.apply_all(&[
            set("A1", "=1+"),   // rejected
            set("A1", "=1+1"),
            set("B1", "=A1)"),  // rejected
            set("B1", "=A1"),
            read("B1"),
        ]);
        assert_eq!(applied, 3);
    }
}
