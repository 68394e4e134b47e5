//! Dependency graph for formula cells.
//!
//! Tracks precedents (cells a formula reads) and dependents (cells whose
//! formulas read a given cell) for cycle rejection and cache invalidation.
//!
//! # Edge Direction
//!
//! ```text
//! A -> B  means  "B depends on A"  (A is a precedent of B)
//! ```
//!
//! This makes "what goes stale if I change X?" trivial: follow dependents.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CycleReport;
use crate::position::Position;

/// Persistent dependency graph for formula cells.
///
/// Maintains bidirectional adjacency for O(1) lookups:
/// - `preds[B]` = cells that B depends on (precedents)
/// - `succs[A]` = cells that depend on A (dependents)
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** If A ∈ preds[B] then B ∈ succs[A], and vice versa.
/// 2. **No dangling entries:** Empty sets are removed, not stored.
/// 3. **No duplicate edges:** Set semantics enforced by FxHashSet.
/// 4. **Atomic updates:** `replace_edges` is the only mutator that touches both maps.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// Precedents: for each formula cell B, the cells A it reads.
    preds: FxHashMap<Position, FxHashSet<Position>>,

    /// Dependents: for each referenced cell A, the formula cells B reading it.
    succs: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cells this formula cell depends on (precedents).
    pub fn precedents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.preds
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// Returns the cells that depend on this cell (dependents).
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.succs
            .get(&cell)
            .into_iter()
            .flat_map(|s| s.iter().copied())
    }

    /// True if at least one formula references this cell.
    pub fn is_referenced(&self, cell: Position) -> bool {
        self.succs.get(&cell).is_some_and(|s| !s.is_empty())
    }

    /// Returns the number of formula cells (cells with precedents) in the graph.
    pub fn formula_cell_count(&self) -> usize {
        self.preds.len()
    }

    /// Returns the number of cells that are referenced by at least one formula.
    pub fn referenced_cell_count(&self) -> usize {
        self.succs.len()
    }

    /// All formula cells (cells with a stored precedent set).
    pub fn formula_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.preds.keys().copied()
    }

    /// Replace all edges for a formula cell atomically.
    ///
    /// This is the primary mutation API. It:
    /// 1. Removes the cell from all its old precedents' dependent sets
    /// 2. Clears the cell's precedent set
    /// 3. Adds the cell to all new precedents' dependent sets
    /// 4. Stores the cell's new precedent set
    ///
    /// Pass an empty set to clear all edges for this cell.
    pub fn replace_edges(&mut self, formula_cell: Position, new_preds: FxHashSet<Position>) {
        if let Some(old_preds) = self.preds.remove(&formula_cell) {
            for pred in old_preds {
                if let Some(deps) = self.succs.get_mut(&pred) {
                    deps.remove(&formula_cell);
                    // Clean up empty entries (invariant: no dangling)
                    if deps.is_empty() {
                        self.succs.remove(&pred);
                    }
                }
            }
        }

        if new_preds.is_empty() {
            return;
        }

        for pred in &new_preds {
            self.succs.entry(*pred).or_default().insert(formula_cell);
        }

        self.preds.insert(formula_cell, new_preds);
    }

    /// Clear all edges for a cell (formula replaced by text, or cell cleared).
    pub fn clear_cell(&mut self, cell: Position) {
        self.replace_edges(cell, FxHashSet::default());
    }

    /// Check if giving `cell` the precedent set `new_preds` would create a
    /// cycle.
    ///
    /// Does not modify the graph. Returns `Some(CycleReport)` if a cycle
    /// would be introduced, `None` otherwise.
    ///
    /// A cycle forms exactly when some new precedent is reachable from
    /// `cell` along existing dependent edges: then
    /// `new_pred -> ... -> cell -> new_pred` closes the loop. Positions with
    /// no stored edges (value cells, unmaterialized placeholders) contribute
    /// nothing to the walk. Terminates because the stored graph is acyclic;
    /// cost is O(V + E) of the reachable subgraph.
    pub fn would_create_cycle(&self, cell: Position, new_preds: &[Position]) -> Option<CycleReport> {
        if new_preds.contains(&cell) {
            return Some(CycleReport::self_reference(cell));
        }

        let new_preds_set: FxHashSet<Position> = new_preds.iter().copied().collect();
        let mut visited = FxHashSet::default();
        let mut stack = vec![cell];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            if let Some(deps) = self.succs.get(&current) {
                for &dep in deps {
                    if new_preds_set.contains(&dep) {
                        return Some(CycleReport::cycle(vec![dep, cell]));
                    }
                    stack.push(dep);
                }
            }
        }

        None
    }

    /// Compute a topological order of all formula cells.
    ///
    /// Returns cells in dependency order: precedents before dependents.
    /// Uses Kahn's algorithm with sorted tie-breaking for determinism.
    /// Only edges between formula cells count; value cells need no
    /// recomputation and are not included.
    pub fn topo_order(&self) -> Result<Vec<Position>, CycleReport> {
        let formula_cells: FxHashSet<Position> = self.preds.keys().copied().collect();

        if formula_cells.is_empty() {
            return Ok(Vec::new());
        }

        let mut in_degree: FxHashMap<Position, usize> = FxHashMap::default();
        for &cell in &formula_cells {
            let count = self
                .preds
                .get(&cell)
                .map(|preds| preds.iter().filter(|p| formula_cells.contains(p)).count())
                .unwrap_or(0);
            in_degree.insert(cell, count);
        }

        // Seed with zero in-degree cells; keep the smallest at the end so it
        // pops first.
        let mut queue: Vec<Position> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&cell, _)| cell)
            .collect();
        queue.sort_by(|a, b| b.cmp(a));

        let mut result = Vec::with_capacity(formula_cells.len());

        while let Some(cell) = queue.pop() {
            result.push(cell);

            if let Some(deps) = self.succs.get(&cell) {
                let mut new_zero_degree = Vec::new();

                for &dep in deps {
                    if formula_cells.contains(&dep) {
                        if let Some(deg) = in_degree.get_mut(&dep) {
                            *deg = deg.saturating_sub(1);
                            if *deg == 0 {
                                new_zero_degree.push(dep);
                            }
                        }
                    }
                }

                new_zero_degree.sort();
                for cell in new_zero_degree.into_iter().rev() {
                    queue.push(cell);
                }
            }
        }

        if result.len() < formula_cells.len() {
            let mut cycle_cells: Vec<Position> = formula_cells
                .iter()
                .filter(|c| !result.contains(c))
                .copied()
                .collect();
            cycle_cells.sort();
            return Err(CycleReport::cycle(cycle_cells));
        }

        Ok(result)
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (formula_cell, preds) in &self.preds {
            for pred in preds {
                assert!(
                    self.succs.get(pred).is_some_and(|s| s.contains(formula_cell)),
                    "Missing succ edge: {} should have {} in dependents",
                    pred,
                    formula_cell
                );
            }
        }

        for (cell, dependents) in &self.succs {
            for dep in dependents {
                assert!(
                    self.preds.get(dep).is_some_and(|s| s.contains(cell)),
                    "Missing pred edge: {} should have {} in precedents",
                    dep,
                    cell
                );
            }
        }

        for (cell, preds) in &self.preds {
            assert!(!preds.is_empty(), "Empty preds set stored for {}", cell);
        }
        for (cell, succs) in &self.succs {
            assert!(!succs.is_empty(), "Empty succs set stored for {}", cell);
        }
    }
}
